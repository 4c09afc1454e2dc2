//! Test utilities and fixtures for checkout integration tests
//!
//! The backend is an in-process axum router bound to an ephemeral port. Each
//! endpoint answers from a queue of canned replies; the last reply in a
//! queue keeps being served.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

pub use rental_checkout::storage::keys;
pub use rental_checkout::*;

pub const CREATE: &str = "/webpay/create";
pub const COMMIT: &str = "/webpay/commit";
pub const RECOMMEND: &str = "/recommendations/generate";

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
    pub delay: Option<Duration>,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body,
            delay: None,
        }
    }

    pub fn status(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub body: Value,
    pub authorization: Option<String>,
}

#[derive(Default)]
struct Inner {
    create: VecDeque<Reply>,
    commit: VecDeque<Reply>,
    recommend: VecDeque<Reply>,
    status: VecDeque<Reply>,
    requests: Vec<RecordedRequest>,
}

#[derive(Clone, Copy)]
enum Endpoint {
    Create,
    Commit,
    Recommend,
    Status,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_create(&self, reply: Reply) -> &Self {
        self.inner.lock().unwrap().create.push_back(reply);
        self
    }

    pub fn on_commit(&self, reply: Reply) -> &Self {
        self.inner.lock().unwrap().commit.push_back(reply);
        self
    }

    pub fn on_recommend(&self, reply: Reply) -> &Self {
        self.inner.lock().unwrap().recommend.push_back(reply);
        self
    }

    pub fn on_status(&self, reply: Reply) -> &Self {
        self.inner.lock().unwrap().status.push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Start serving. Returns the base URL.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route(CREATE, post(create))
            .route(COMMIT, post(commit))
            .route(RECOMMEND, post(recommend))
            .route("/webpay/status/{token}", get(status))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }

    async fn respond(
        &self,
        endpoint: Endpoint,
        path: String,
        headers: &HeaderMap,
        body: Value,
    ) -> (StatusCode, Json<Value>) {
        let reply = {
            let mut inner = self.inner.lock().unwrap();
            inner.requests.push(RecordedRequest {
                path,
                body,
                authorization: headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from),
            });

            let queue = match endpoint {
                Endpoint::Create => &mut inner.create,
                Endpoint::Commit => &mut inner.commit,
                Endpoint::Recommend => &mut inner.recommend,
                Endpoint::Status => &mut inner.status,
            };
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        };

        let reply = reply.unwrap_or_else(|| {
            Reply::status(500, json!({ "error": "no reply configured" }))
        });

        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }

        (
            StatusCode::from_u16(reply.status).unwrap(),
            Json(reply.body),
        )
    }
}

async fn create(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    backend
        .respond(Endpoint::Create, CREATE.to_string(), &headers, body)
        .await
}

async fn commit(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    backend
        .respond(Endpoint::Commit, COMMIT.to_string(), &headers, body)
        .await
}

async fn recommend(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    backend
        .respond(Endpoint::Recommend, RECOMMEND.to_string(), &headers, body)
        .await
}

async fn status(
    State(backend): State<MockBackend>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    backend
        .respond(
            Endpoint::Status,
            format!("/webpay/status/{}", token),
            &headers,
            Value::Null,
        )
        .await
}

/// Base URL nothing listens on
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

#[derive(Debug, Clone, PartialEq)]
pub enum NavEvent {
    Redirect(String),
    Navigate(Destination),
}

#[derive(Default)]
pub struct RecordingNavigator {
    events: Mutex<Vec<NavEvent>>,
}

impl RecordingNavigator {
    pub fn events(&self) -> Vec<NavEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, url: &str) {
        self.events
            .lock()
            .unwrap()
            .push(NavEvent::Redirect(url.to_string()));
    }

    fn navigate(&self, destination: Destination) {
        self.events
            .lock()
            .unwrap()
            .push(NavEvent::Navigate(destination));
    }
}

pub struct Harness {
    pub backend: MockBackend,
    pub store: Arc<MemoryStorage>,
    pub navigator: Arc<RecordingNavigator>,
    pub checkout: Checkout,
}

/// Checkout wired to `backend` with a fresh memory store.
pub async fn harness(backend: MockBackend) -> Harness {
    harness_with(backend, CheckoutOptions::default()).await
}

/// Like [`harness`], with extra options. Storage, navigator and base URL are
/// always overridden.
pub async fn harness_with(backend: MockBackend, options: CheckoutOptions) -> Harness {
    let base_url = backend.spawn().await;
    let store = Arc::new(MemoryStorage::new());
    let navigator = Arc::new(RecordingNavigator::default());

    let checkout = Checkout::new(CheckoutOptions {
        base_url: Some(base_url),
        storage: Some(store.clone()),
        navigator: Some(navigator.clone()),
        ..options
    })
    .expect("Failed to build checkout client");

    Harness {
        backend,
        store,
        navigator,
        checkout,
    }
}

pub fn store_is_empty(store: &MemoryStorage) -> bool {
    keys::ALL.iter().all(|k| store.get(k).is_none())
}

pub fn wallet_deposit(reference: &str, amount: i64) -> PendingTransaction {
    PendingTransaction {
        transaction_type: TransactionType::WalletDeposit,
        description: "Carga de saldo a wallet".to_string(),
        subject_reference: reference.to_string(),
        amount,
        property_context: None,
    }
}

pub fn test_property() -> PropertyContext {
    PropertyContext {
        id: Some("101".to_string()),
        url: Some("https://portal.example.com/propiedad/101".to_string()),
        price: Some(450_000),
        bedrooms: Some(2),
        bathrooms: Some(1),
        location: "Providencia, Santiago".to_string(),
        title: "Depto 2D1B Providencia".to_string(),
    }
}

pub fn visit_reservation(property: PropertyContext) -> PendingTransaction {
    PendingTransaction {
        transaction_type: TransactionType::VisitReservation,
        description: format!("Reserva visita - {}", property.title),
        subject_reference: property.url.clone().unwrap_or_default(),
        amount: property.price.unwrap_or_default() / 10,
        property_context: Some(property),
    }
}

/// Wait until `count` requests to `path` were recorded, up to two seconds.
pub async fn wait_for_requests(backend: &MockBackend, path: &str, count: usize) -> Vec<RecordedRequest> {
    for _ in 0..100 {
        let requests = backend.requests_to(path);
        if requests.len() >= count {
            return requests;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    backend.requests_to(path)
}
