//! Type definitions for the checkout handshake

use serde::{Deserialize, Serialize};

/// Smallest amount the gateway accepts, in CLP
pub const MINIMUM_AMOUNT: i64 = 10_000;

/// Kind of payment being made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Paid visit reservation for a property
    VisitReservation,
    /// Balance top-up for the user's wallet
    WalletDeposit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VisitReservation => "visit_reservation",
            Self::WalletDeposit => "wallet_deposit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "visit_reservation" => Some(Self::VisitReservation),
            "wallet_deposit" => Some(Self::WalletDeposit),
            _ => None,
        }
    }

    /// Where the user lands after a successful payment.
    pub fn destination(&self) -> Destination {
        match self {
            Self::WalletDeposit => Destination::Wallet,
            Self::VisitReservation => Destination::VisitHistory,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-app views the handshake can navigate to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Wallet,
    VisitHistory,
}

impl Destination {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Wallet => "/wallet",
            Self::VisitHistory => "/visit-history",
        }
    }
}

/// Snapshot of the reserved property, kept to seed recommendations after
/// the payment settles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyContext {
    #[serde(default, deserialize_with = "id_from_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub title: String,
}

/// Listing ids arrive as numbers from some backends and strings from others.
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// What a caller asks the initiator to pay for
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// Amount in CLP
    pub amount: i64,
    /// Property URL, or the synthetic wallet deposit reference
    pub subject_reference: String,
    pub transaction_type: TransactionType,
    pub description: Option<String>,
    pub property_context: Option<PropertyContext>,
}

/// The single in-flight payment attempt, as held by the session store
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTransaction {
    pub transaction_type: TransactionType,
    pub description: String,
    pub subject_reference: String,
    pub amount: i64,
    pub property_context: Option<PropertyContext>,
}

/// Final gateway redirect produced by the initiator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    /// Gateway token returned by the backend
    pub token: String,
    /// URL to navigate to, carrying exactly one `token_ws` parameter
    pub url: String,
}

/// Settled transaction details
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransactionResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub authorization_code: Option<String>,
    #[serde(default)]
    pub transaction_date: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

/// Gateway-side status of a transaction
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub authorization_code: Option<String>,
    #[serde(default)]
    pub transaction_date: Option<String>,
    /// Anything else the backend reports
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Accepted recommendation job
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationJob {
    #[serde(default)]
    pub job_id: Option<serde_json::Value>,
}

/// API response for `/webpay/create`
#[derive(Debug, Deserialize)]
pub(crate) struct CreateTransactionResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// API response for `/webpay/commit`
#[derive(Debug, Deserialize)]
pub(crate) struct CommitResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub transaction: Option<TransactionResult>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl CommitResponse {
    /// Backend-supplied failure text, if any.
    pub fn failure_message(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .or_else(|| {
                self.transaction
                    .as_ref()
                    .and_then(|t| t.rejection_reason.as_deref())
            })
            .filter(|m| !m.trim().is_empty())
    }

    /// Transaction details for a successful settlement. A response without a
    /// `transaction` object still counts as settled.
    pub fn into_result(self) -> TransactionResult {
        let mut result = self.transaction.unwrap_or_default();
        result.success = true;
        result
    }
}
