//! Error types for the checkout client

use thiserror::Error;

/// Error codes surfaced by the checkout handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutErrorCode {
    /// Local input was rejected before any network call
    ValidationError,
    /// The request never completed (connection refused, timeout, reset)
    NetworkError,
    /// The request completed but the response shape is unusable
    ProtocolError,
    /// The backend or gateway explicitly reported a failure
    GatewayRejection,
    /// No pending transaction was found in the session store
    MissingContext,
    /// The return redirect carried no `token_ws` parameter
    MissingToken,
}

impl std::fmt::Display for CheckoutErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ValidationError => "validation_error",
            Self::NetworkError => "network_error",
            Self::ProtocolError => "protocol_error",
            Self::GatewayRejection => "gateway_rejection",
            Self::MissingContext => "missing_context",
            Self::MissingToken => "missing_token",
        };
        f.write_str(name)
    }
}

/// Checkout client error
///
/// `message` is the human-readable text shown to the user. When the backend
/// supplied a message it is carried verbatim.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CheckoutError {
    pub code: CheckoutErrorCode,
    pub message: String,
    /// HTTP status of the response, when the backend answered at all
    pub status_code: Option<u16>,
}

impl CheckoutError {
    pub fn new(code: CheckoutErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status_code: None,
        }
    }

    pub fn with_status(code: CheckoutErrorCode, message: impl Into<String>, status: u16) -> Self {
        Self {
            code,
            message: message.into(),
            status_code: Some(status),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(CheckoutErrorCode::ValidationError, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(CheckoutErrorCode::NetworkError, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(CheckoutErrorCode::ProtocolError, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(CheckoutErrorCode::GatewayRejection, message)
    }

    pub fn missing_context() -> Self {
        Self::new(
            CheckoutErrorCode::MissingContext,
            "missing transaction context",
        )
    }

    pub fn missing_token() -> Self {
        Self::new(CheckoutErrorCode::MissingToken, "missing token")
    }

    /// Whether the backend produced a response for the failed call.
    ///
    /// Rejections and malformed bodies count as completed calls. Network
    /// errors never do, including 502-504 answers from a proxy in front of
    /// the backend. Purely local errors don't either.
    pub fn reached_backend(&self) -> bool {
        match self.code {
            CheckoutErrorCode::NetworkError => false,
            CheckoutErrorCode::ProtocolError | CheckoutErrorCode::GatewayRejection => true,
            _ => self.status_code.is_some(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Map an HTTP error status to an error code.
pub fn map_status_to_error_code(status: u16) -> CheckoutErrorCode {
    match status {
        400 | 422 => CheckoutErrorCode::ValidationError,
        502..=504 => CheckoutErrorCode::NetworkError,
        _ => CheckoutErrorCode::GatewayRejection,
    }
}

/// Fallback message for an error response whose body carried none.
pub(crate) fn default_status_message(status: u16) -> String {
    match status {
        401 => "Authentication error, please sign in again".to_string(),
        403 => "You are not allowed to perform this operation".to_string(),
        _ => format!("Request failed: {}", status),
    }
}
