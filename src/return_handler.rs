//! Gateway return handling
//!
//! Entered when the gateway redirects back with `token_ws`. Resolves the
//! pending transaction, settles it with the backend and ends in either
//! [`ReturnState::Success`] or [`ReturnState::Error`].
//!
//! The pending transaction is cleared once the settlement call gets any
//! answer from the backend, accepted or not. A settlement call that never
//! completed leaves it in place, so [`ReturnHandler::retry`] can settle the
//! same token again.

use std::sync::Arc;

use url::Url;

use crate::api::ApiClient;
use crate::countdown::Countdown;
use crate::error::{CheckoutError, Result};
use crate::initiator::TOKEN_PARAM;
use crate::navigation::Navigator;
use crate::recommendations;
use crate::session::PaymentSession;
use crate::types::*;

/// Seconds before the automatic redirect after a successful payment
pub const DEFAULT_COUNTDOWN_SECS: u32 = 3;

/// Return handler state
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnState {
    Processing,
    Success(TransactionResult),
    Error(String),
}

impl ReturnState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

/// Extract `token_ws` from the URL the gateway redirected to.
///
/// An empty value counts as absent.
pub fn token_from_return_url(url: &str) -> Result<Option<String>> {
    let parsed = Url::parse(url).map_err(|_| CheckoutError::validation("Invalid return URL"))?;

    Ok(parsed
        .query_pairs()
        .find(|(key, _)| key == TOKEN_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|v| !v.is_empty()))
}

pub struct ReturnHandler {
    api: Arc<ApiClient>,
    session: PaymentSession,
    navigator: Arc<dyn Navigator>,
    token: Option<String>,
    state: ReturnState,
    transaction_type: Option<TransactionType>,
    countdown_secs: u32,
    countdown: Option<Countdown>,
}

impl ReturnHandler {
    pub fn new(
        api: Arc<ApiClient>,
        session: PaymentSession,
        navigator: Arc<dyn Navigator>,
        token: Option<String>,
    ) -> Self {
        // Shown while processing, before the store is read
        let transaction_type = session.load().map(|p| p.transaction_type);

        Self {
            api,
            session,
            navigator,
            token: token.filter(|t| !t.is_empty()),
            state: ReturnState::Processing,
            transaction_type,
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            countdown: None,
        }
    }

    /// Build a handler from the full return URL.
    pub fn from_return_url(
        api: Arc<ApiClient>,
        session: PaymentSession,
        navigator: Arc<dyn Navigator>,
        url: &str,
    ) -> Result<Self> {
        let token = token_from_return_url(url)?;
        Ok(Self::new(api, session, navigator, token))
    }

    pub fn with_countdown_secs(mut self, seconds: u32) -> Self {
        self.countdown_secs = seconds;
        self
    }

    pub fn state(&self) -> &ReturnState {
        &self.state
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Type of the transaction being settled, once known.
    pub fn transaction_type(&self) -> Option<TransactionType> {
        self.transaction_type
    }

    /// Seconds left before the automatic redirect, while in `Success`.
    pub fn countdown_remaining(&self) -> Option<u32> {
        self.countdown.as_ref().map(Countdown::remaining)
    }

    /// Settle the returned transaction.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn process(&mut self) -> &ReturnState {
        self.countdown = None;
        self.state = ReturnState::Processing;

        match self.settle().await {
            Ok(result) => {
                let destination = self
                    .transaction_type
                    .unwrap_or(TransactionType::VisitReservation)
                    .destination();
                self.countdown = Some(Countdown::start(
                    self.countdown_secs,
                    destination,
                    self.navigator.clone(),
                ));
                self.state = ReturnState::Success(result);
            }
            Err(e) => {
                tracing::error!("Error processing WebPay return: {}", e);
                self.state = ReturnState::Error(e.message);
            }
        }

        &self.state
    }

    /// Run the settlement again. Only meaningful from `Error`; in any other
    /// state this returns the current state unchanged.
    pub async fn retry(&mut self) -> &ReturnState {
        if !matches!(self.state, ReturnState::Error(_)) {
            return &self.state;
        }
        self.process().await
    }

    /// Leave for the wallet view.
    pub fn go_to_wallet(&self) {
        self.navigator.navigate(Destination::Wallet);
    }

    /// Wait for the success countdown to navigate away. Returns immediately
    /// when there is no countdown running.
    pub async fn wait_for_redirect(&mut self) {
        if let Some(countdown) = self.countdown.as_mut() {
            countdown.finished().await;
        }
    }

    async fn settle(&mut self) -> Result<TransactionResult> {
        let token = self.token.clone().ok_or_else(CheckoutError::missing_token)?;

        let pending = self.session.load().ok_or_else(CheckoutError::missing_context)?;
        self.transaction_type = Some(pending.transaction_type);

        let response = match self
            .api
            .commit_transaction(&token, &pending.subject_reference)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                if e.reached_backend() {
                    self.session.clear();
                } else {
                    tracing::warn!("Settlement did not complete, keeping pending transaction");
                }
                return Err(e);
            }
        };

        if !response.success {
            let message = response
                .failure_message()
                .unwrap_or("The transaction was rejected")
                .to_string();
            self.session.clear();
            return Err(CheckoutError::rejected(message));
        }

        if pending.transaction_type == TransactionType::VisitReservation {
            let ctx = pending.property_context.clone().unwrap_or_else(|| PropertyContext {
                url: Some(pending.subject_reference.clone()),
                ..Default::default()
            });
            recommendations::spawn_generate(self.api.clone(), ctx);
        }

        self.session.clear();

        let result = response.into_result();
        tracing::info!(
            "WebPay transaction committed for {} ({:?})",
            pending.subject_reference,
            result.authorization_code
        );
        Ok(result)
    }
}

impl std::fmt::Debug for ReturnHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReturnHandler")
            .field("token", &self.token)
            .field("state", &self.state)
            .field("transaction_type", &self.transaction_type)
            .field("countdown", &self.countdown)
            .finish()
    }
}
