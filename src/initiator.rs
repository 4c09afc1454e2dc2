//! Transaction initiation: persist context, create the gateway transaction,
//! hand off to the gateway.

use std::sync::Arc;

use url::Url;

use crate::api::ApiClient;
use crate::error::{CheckoutError, Result};
use crate::format::format_clp;
use crate::navigation::Navigator;
use crate::session::PaymentSession;
use crate::types::*;

/// Query parameter carrying the gateway token
pub const TOKEN_PARAM: &str = "token_ws";

/// Default description for wallet deposits
pub const WALLET_DEPOSIT_DESCRIPTION: &str = "Carga de saldo a wallet";

/// Share of the property price charged to reserve a visit, in percent
pub const RESERVATION_PERCENT: i64 = 10;

/// Check that `amount` can be charged through the gateway.
pub fn validate_amount(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(CheckoutError::validation(
            "Amount must be a valid number greater than 0",
        ));
    }

    if amount < MINIMUM_AMOUNT {
        return Err(CheckoutError::validation(format!(
            "Minimum amount is {} CLP",
            format_clp(MINIMUM_AMOUNT)
        )));
    }

    Ok(())
}

/// Reservation charge for a property listed at `price`, floored.
///
/// Splits the price on hundreds so the multiplication can't overflow.
pub fn reservation_amount(price: i64) -> i64 {
    price / 100 * RESERVATION_PERCENT + price % 100 * RESERVATION_PERCENT / 100
}

/// Synthetic subject reference for a wallet deposit started at `millis`.
pub fn wallet_deposit_reference(millis: i64) -> String {
    format!("wallet://deposit/{}", millis)
}

/// Append `token_ws=<token>` to the gateway URL unless its query already
/// carries one.
pub fn redirect_url(gateway_url: &str, token: &str) -> Result<String> {
    let parsed = Url::parse(gateway_url)
        .map_err(|_| CheckoutError::protocol("Invalid redirect URL from WebPay service"))?;

    if parsed.query_pairs().any(|(key, _)| key == TOKEN_PARAM) {
        return Ok(gateway_url.to_string());
    }

    let (base, fragment) = match gateway_url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (gateway_url, None),
    };

    let separator = match parsed.query() {
        None => "?",
        Some("") => "",
        Some(_) if base.ends_with('&') => "",
        Some(_) => "&",
    };

    let mut url = format!(
        "{}{}{}={}",
        base,
        separator,
        TOKEN_PARAM,
        urlencoding::encode(token)
    );
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }

    Ok(url)
}

/// Starts payments.
///
/// A successful [`initiate`](Self::initiate) ends with a redirect to the
/// gateway; the caller should not expect to do anything afterwards.
pub struct TransactionInitiator {
    api: Arc<ApiClient>,
    session: PaymentSession,
    navigator: Arc<dyn Navigator>,
}

impl TransactionInitiator {
    pub fn new(api: Arc<ApiClient>, session: PaymentSession, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            api,
            session,
            navigator,
        }
    }

    /// Start a payment.
    ///
    /// Validates the amount without touching the network, stores the pending
    /// transaction, creates the gateway transaction and redirects to it.
    /// Every failure after the store write clears the pending transaction.
    pub async fn initiate(&self, request: PaymentRequest) -> Result<RedirectTarget> {
        validate_amount(request.amount)?;

        let pending = PendingTransaction {
            transaction_type: request.transaction_type,
            description: request.description.unwrap_or_default(),
            subject_reference: request.subject_reference,
            amount: request.amount,
            property_context: request.property_context,
        };
        self.session.save(&pending);

        let target = match self.create(&pending).await {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!("WebPay transaction could not be started: {}", e);
                self.session.clear();
                return Err(e);
            }
        };

        tracing::info!("WebPay transaction created, redirecting to {}", target.url);
        self.navigator.redirect(&target.url);

        Ok(target)
    }

    /// Top up the wallet with `amount`.
    pub async fn deposit(&self, amount: i64, description: Option<&str>) -> Result<RedirectTarget> {
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(WALLET_DEPOSIT_DESCRIPTION);

        let reference = wallet_deposit_reference(chrono::Utc::now().timestamp_millis());

        self.initiate(PaymentRequest {
            amount,
            subject_reference: reference,
            transaction_type: TransactionType::WalletDeposit,
            description: Some(description.to_string()),
            property_context: None,
        })
        .await
    }

    /// Pay the reservation for a visit to `property`.
    pub async fn reserve_visit(&self, property: PropertyContext) -> Result<RedirectTarget> {
        let url = property
            .url
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| CheckoutError::validation("Property URL is required"))?;
        let price = property
            .price
            .ok_or_else(|| CheckoutError::validation("Property price is required"))?;

        let amount = reservation_amount(price);
        if amount < MINIMUM_AMOUNT {
            return Err(CheckoutError::validation(format!(
                "Reservation amount ({} CLP) is below the minimum allowed ({} CLP)",
                format_clp(amount),
                format_clp(MINIMUM_AMOUNT)
            )));
        }

        let description = if property.title.is_empty() {
            "Reserva de visita".to_string()
        } else {
            format!("Reserva visita - {}", property.title)
        };

        self.initiate(PaymentRequest {
            amount,
            subject_reference: url,
            transaction_type: TransactionType::VisitReservation,
            description: Some(description),
            property_context: Some(property),
        })
        .await
    }

    async fn create(&self, pending: &PendingTransaction) -> Result<RedirectTarget> {
        let created = self
            .api
            .create_transaction(pending.amount, &pending.subject_reference)
            .await?;

        let url = redirect_url(&created.url, &created.token)?;
        Ok(RedirectTarget {
            token: created.token,
            url,
        })
    }
}

impl std::fmt::Debug for TransactionInitiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionInitiator")
            .field("api", &self.api)
            .finish()
    }
}
