//! Client entry point wiring the backend client, the session store and the
//! navigator together

use std::sync::Arc;
use std::time::Duration;

use crate::api::{ApiClient, DEFAULT_API_URL};
use crate::error::Result;
use crate::initiator::TransactionInitiator;
use crate::navigation::{LogNavigator, Navigator};
use crate::return_handler::{DEFAULT_COUNTDOWN_SECS, ReturnHandler};
use crate::session::PaymentSession;
use crate::storage::{MemoryStorage, SessionStore};
use crate::types::TransactionStatus;

/// Configuration options for the checkout client
#[derive(Clone, Default)]
pub struct CheckoutOptions {
    /// Backend URL (default: "http://localhost:8001")
    pub base_url: Option<String>,
    /// Bearer token attached to every request
    pub access_token: Option<String>,
    /// Per-request timeout (default: 10 seconds)
    pub timeout: Option<Duration>,
    /// Session store (default: MemoryStorage)
    pub storage: Option<Arc<dyn SessionStore>>,
    /// Navigator (default: LogNavigator)
    pub navigator: Option<Arc<dyn Navigator>>,
    /// Seconds before the post-payment redirect (default: 3)
    pub countdown_secs: Option<u32>,
}

impl std::fmt::Debug for CheckoutOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutOptions")
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("storage", &"<storage>")
            .field("navigator", &"<navigator>")
            .field("countdown_secs", &self.countdown_secs)
            .finish()
    }
}

/// Checkout client.
///
/// # Example
/// ```rust,no_run
/// use rental_checkout::{Checkout, CheckoutOptions};
///
/// # async fn example() -> rental_checkout::Result<()> {
/// let checkout = Checkout::new(CheckoutOptions {
///     base_url: Some("https://api.example.com".into()),
///     ..Default::default()
/// })?;
///
/// // Before the gateway: redirects away on success
/// checkout.initiator().deposit(20_000, None).await?;
///
/// // After the gateway redirected back
/// let mut handler = checkout.return_handler_from_url("https://app.example.com/webpay/return?token_ws=T1")?;
/// handler.process().await;
/// # Ok(())
/// # }
/// ```
pub struct Checkout {
    api: Arc<ApiClient>,
    session: PaymentSession,
    navigator: Arc<dyn Navigator>,
    countdown_secs: u32,
}

impl Checkout {
    pub fn new(options: CheckoutOptions) -> Result<Self> {
        let base_url = options
            .base_url
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let api = ApiClient::new(&base_url, options.access_token, options.timeout)?;

        let storage: Arc<dyn SessionStore> = options
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));

        let navigator: Arc<dyn Navigator> =
            options.navigator.unwrap_or_else(|| Arc::new(LogNavigator));

        Ok(Self {
            api: Arc::new(api),
            session: PaymentSession::new(storage),
            navigator,
            countdown_secs: options.countdown_secs.unwrap_or(DEFAULT_COUNTDOWN_SECS),
        })
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn session(&self) -> &PaymentSession {
        &self.session
    }

    pub fn initiator(&self) -> TransactionInitiator {
        TransactionInitiator::new(self.api.clone(), self.session.clone(), self.navigator.clone())
    }

    /// Handler for a gateway return carrying `token` (`None` when the
    /// redirect had no `token_ws`).
    pub fn return_handler(&self, token: Option<String>) -> ReturnHandler {
        ReturnHandler::new(
            self.api.clone(),
            self.session.clone(),
            self.navigator.clone(),
            token,
        )
        .with_countdown_secs(self.countdown_secs)
    }

    /// Handler for the full return URL.
    pub fn return_handler_from_url(&self, url: &str) -> Result<ReturnHandler> {
        Ok(ReturnHandler::from_return_url(
            self.api.clone(),
            self.session.clone(),
            self.navigator.clone(),
            url,
        )?
        .with_countdown_secs(self.countdown_secs))
    }

    pub async fn transaction_status(&self, token: &str) -> Result<TransactionStatus> {
        self.api.transaction_status(token).await
    }
}

impl std::fmt::Debug for Checkout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkout")
            .field("api", &self.api)
            .field("countdown_secs", &self.countdown_secs)
            .finish()
    }
}
