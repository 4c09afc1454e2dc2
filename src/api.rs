//! HTTP client for the marketplace backend

use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::error::{
    CheckoutError, CheckoutErrorCode, Result, default_status_message, map_status_to_error_code,
};
use crate::recommendations::RecommendationRequest;
use crate::types::*;

/// Default backend URL
pub const DEFAULT_API_URL: &str = "http://localhost:8001";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Backend client.
///
/// Each call either completes once or returns an error; nothing is retried
/// here.
pub struct ApiClient {
    base_url: String,
    access_token: Option<String>,
    http: HttpClient,
}

/// Backend transaction as returned by `/webpay/create`, already checked for
/// a usable token and URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTransaction {
    pub token: String,
    pub url: String,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        access_token: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(CheckoutError::validation("API base URL is required"));
        }

        let http = HttpClient::builder()
            .user_agent(concat!("rental-checkout/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|e| CheckoutError::network(e.to_string()))?;

        Ok(Self {
            base_url,
            access_token: access_token.filter(|t| !t.is_empty()),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ==================== WebPay ====================

    /// Create a gateway transaction for `amount` routed to `subject_reference`.
    pub async fn create_transaction(
        &self,
        amount: i64,
        subject_reference: &str,
    ) -> Result<CreatedTransaction> {
        #[derive(Serialize)]
        struct CreateRequest<'a> {
            amount: i64,
            url: &'a str,
        }

        if subject_reference.is_empty() {
            return Err(CheckoutError::validation("Property URL is required"));
        }

        tracing::info!("Creating WebPay transaction for {} ({})", subject_reference, amount);

        let body = CreateRequest {
            amount,
            url: subject_reference,
        };
        let response: CreateTransactionResponse = self
            .post(
                "/webpay/create",
                &body,
                "Network error: unable to connect to WebPay service",
            )
            .await?;

        let token = response.token.filter(|t| !t.is_empty());
        let url = response.url.filter(|u| !u.is_empty());

        match (token, url) {
            (Some(token), Some(url)) => Ok(CreatedTransaction { token, url }),
            _ => Err(CheckoutError::protocol(
                "Invalid response from WebPay service",
            )),
        }
    }

    /// Commit (settle) the gateway transaction identified by `token`.
    pub(crate) async fn commit_transaction(
        &self,
        token: &str,
        subject_reference: &str,
    ) -> Result<CommitResponse> {
        #[derive(Serialize)]
        struct CommitRequest<'a> {
            token: &'a str,
            url: &'a str,
        }

        tracing::info!("Committing WebPay transaction for {}", subject_reference);

        let body = CommitRequest {
            token,
            url: subject_reference,
        };
        self.post(
            "/webpay/commit",
            &body,
            "Network error: unable to confirm transaction",
        )
        .await
    }

    /// Look up the gateway status of a transaction.
    pub async fn transaction_status(&self, token: &str) -> Result<TransactionStatus> {
        if token.is_empty() {
            return Err(CheckoutError::validation("Invalid WebPay token"));
        }

        let path = format!("/webpay/status/{}", urlencoding::encode(token));
        self.get(&path, "Network error: unable to get transaction status")
            .await
    }

    // ==================== Recommendations ====================

    /// Ask the backend to start a recommendation job.
    pub async fn generate_recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationJob> {
        self.post(
            "/recommendations/generate",
            request,
            "Network error: unable to reach recommendations service",
        )
        .await
    }

    // ==================== Internal Helpers ====================

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str, unreachable: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(|e| transport_error(path, e, unreachable))?;

        handle_response(response).await
    }

    async fn post<T: for<'de> Deserialize<'de>, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        unreachable: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .authorize(self.http.post(&url))
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(path, e, unreachable))?;

        handle_response(response).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn transport_error(path: &str, err: reqwest::Error, message: &str) -> CheckoutError {
    tracing::warn!("Request to {} did not complete: {}", path, err);
    CheckoutError::network(message)
}

async fn handle_response<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
    let status = response.status().as_u16();

    if !response.status().is_success() {
        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<String>,
            message: Option<String>,
            detail: Option<String>,
        }

        let error_body: Option<ErrorResponse> = response.json().await.ok();

        let message = error_body
            .and_then(|b| b.error.or(b.message).or(b.detail))
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_status_message(status));
        let code = map_status_to_error_code(status);

        tracing::warn!("Backend answered {}: {}", status, message);
        return Err(CheckoutError::with_status(code, message, status));
    }

    response.json().await.map_err(|e| {
        tracing::warn!("Unusable response body: {}", e);
        CheckoutError::with_status(
            CheckoutErrorCode::ProtocolError,
            "Invalid response from WebPay service",
            status,
        )
    })
}
