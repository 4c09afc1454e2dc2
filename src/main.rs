use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rental_checkout::config::Config;
use rental_checkout::format::{format_clp, format_transaction_date};
use rental_checkout::{
    Checkout, CheckoutOptions, Destination, FileStorage, Navigator, PropertyContext,
    ReturnState, TransactionResult, TransactionType,
};

#[derive(Parser, Debug)]
#[command(name = "rental-checkout")]
#[command(about = "WebPay checkout for the property rental marketplace")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Top up the wallet
    Deposit {
        /// Amount in CLP (minimum 10000)
        #[arg(long)]
        amount: i64,

        #[arg(long)]
        description: Option<String>,
    },

    /// Pay the reservation for a property visit (10% of the price)
    Reserve {
        /// Property URL
        #[arg(long)]
        url: String,

        /// Property price in CLP
        #[arg(long)]
        price: i64,

        #[arg(long)]
        id: Option<String>,

        #[arg(long, default_value = "")]
        title: String,

        #[arg(long, default_value = "")]
        location: String,

        #[arg(long)]
        bedrooms: Option<u32>,

        #[arg(long)]
        bathrooms: Option<u32>,
    },

    /// Settle a payment after the gateway redirected back
    Return {
        /// Full return URL, as received from the gateway
        #[arg(long, conflicts_with = "token_ws")]
        url: Option<String>,

        /// The `token_ws` value alone
        #[arg(long)]
        token_ws: Option<String>,
    },

    /// Show the gateway status of a transaction
    Status {
        #[arg(long)]
        token: String,
    },
}

/// Prints navigations instead of performing them.
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn redirect(&self, url: &str) {
        println!("Continue the payment at:");
        println!("  {}", url);
    }

    fn navigate(&self, destination: Destination) {
        println!("-> {}", destination.path());
    }
}

fn print_transaction(result: &TransactionResult, transaction_type: Option<TransactionType>) {
    match transaction_type {
        Some(TransactionType::WalletDeposit) => println!("Payment successful, wallet topped up"),
        _ => println!("Reservation confirmed"),
    }
    if let Some(amount) = result.amount {
        println!("  Amount:        {}", format_clp(amount));
    }
    println!(
        "  Description:   {}",
        result.description.as_deref().unwrap_or("Carga de saldo a wallet")
    );
    if let Some(code) = &result.authorization_code {
        println!("  Authorization: {}", code);
    }
    if let Some(date) = &result.transaction_date {
        println!("  Date:          {}", format_transaction_date(date));
    }
}

async fn run(cli: Cli, config: Config) -> rental_checkout::Result<bool> {
    let storage = FileStorage::new(&config.session_dir).ok_or_else(|| {
        rental_checkout::CheckoutError::validation(format!(
            "Session directory {} does not exist",
            config.session_dir.display()
        ))
    })?;

    let checkout = Checkout::new(CheckoutOptions {
        base_url: Some(config.api_url.clone()),
        access_token: config.access_token.clone(),
        timeout: Some(config.timeout),
        storage: Some(Arc::new(storage)),
        navigator: Some(Arc::new(ConsoleNavigator)),
        countdown_secs: Some(config.countdown_secs),
    })?;

    match cli.command {
        Command::Deposit {
            amount,
            description,
        } => {
            checkout
                .initiator()
                .deposit(amount, description.as_deref())
                .await?;
            Ok(true)
        }
        Command::Reserve {
            url,
            price,
            id,
            title,
            location,
            bedrooms,
            bathrooms,
        } => {
            let property = PropertyContext {
                id,
                url: Some(url),
                price: Some(price),
                bedrooms,
                bathrooms,
                location,
                title,
            };
            checkout.initiator().reserve_visit(property).await?;
            Ok(true)
        }
        Command::Return { url, token_ws } => {
            let mut handler = match url {
                Some(url) => checkout.return_handler_from_url(&url)?,
                None => checkout.return_handler(token_ws),
            };

            match handler.process().await.clone() {
                ReturnState::Success(result) => {
                    print_transaction(&result, handler.transaction_type());
                    if let Some(secs) = handler.countdown_remaining() {
                        println!("Redirecting in {} seconds...", secs);
                    }
                    handler.wait_for_redirect().await;
                    Ok(true)
                }
                ReturnState::Error(reason) => {
                    eprintln!("Payment error: {}", reason);
                    if let Some(token) = handler.token() {
                        eprintln!("  Token: {}", token);
                    }
                    Ok(false)
                }
                ReturnState::Processing => Ok(false),
            }
        }
        Command::Status { token } => {
            let status = checkout.transaction_status(&token).await?;
            println!("Status: {}", status.status.as_deref().unwrap_or("unknown"));
            if let Some(amount) = status.amount {
                println!("Amount: {}", format_clp(amount));
            }
            if let Some(code) = &status.authorization_code {
                println!("Authorization: {}", code);
            }
            if let Some(date) = &status.transaction_date {
                println!("Date: {}", format_transaction_date(date));
            }
            for (key, value) in &status.extra {
                println!("{}: {}", key, value);
            }
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rental_checkout=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();
    tracing::debug!("Using backend {}", config.api_url);

    match run(cli, config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
