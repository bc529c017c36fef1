#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use momo_gateway::application::ledger_poster::LedgerPoster;
use momo_gateway::application::orchestrator::PaymentOrchestrator;
use momo_gateway::application::token_manager::TokenManager;
use momo_gateway::domain::money::Amount;
use momo_gateway::domain::payment::{PaymentRequest, StatusRequest};
use momo_gateway::domain::ports::PaymentAdapterArc;
use momo_gateway::domain::provider::{Provider, ProviderConfig};
use momo_gateway::infrastructure::btc::{BtcAdapter, BtcClient};
use momo_gateway::infrastructure::clock::SystemClock;
use momo_gateway::infrastructure::in_memory::{
    InMemoryLedgerStore, InMemoryProviderConfigStore, InMemoryTokenStore,
    InMemoryTransactionStore,
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const GSMA: &str = "/mfs-ocpdev/gsma";

/// Scripted answers of the mock provider.
pub struct Behaviour {
    pub auth_status: StatusCode,
    pub expires_in: Option<i64>,
    pub transfer_status: StatusCode,
    pub transfer_description: String,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            auth_status: StatusCode::OK,
            expires_in: None,
            transfer_status: StatusCode::OK,
            transfer_description: "Accepted".to_string(),
        }
    }
}

#[derive(Default)]
pub struct MockState {
    pub auth_calls: AtomicUsize,
    pub merchantpay_calls: AtomicUsize,
    pub disbursement_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    transfers: AtomicUsize,
    pub behaviour: Mutex<Behaviour>,
    pub payloads: Mutex<Vec<Value>>,
    /// `(kind, reference) -> (amount, description)`, kind being `internal` or `external`.
    statuses: Mutex<HashMap<(String, String), (Decimal, String)>>,
}

impl MockState {
    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub fn merchantpay_calls(&self) -> usize {
        self.merchantpay_calls.load(Ordering::SeqCst)
    }

    pub fn disbursement_calls(&self) -> usize {
        self.disbursement_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn set_behaviour(&self, update: impl FnOnce(&mut Behaviour)) {
        update(&mut self.behaviour.lock().unwrap());
    }

    /// Answer lookups of `reference` on the `internal` (provider reference) path.
    pub fn set_status(&self, reference: &str, amount: Decimal, description: &str) {
        self.set_status_on("internal", reference, amount, description);
    }

    pub fn set_status_on(&self, kind: &str, reference: &str, amount: Decimal, description: &str) {
        self.statuses.lock().unwrap().insert(
            (kind.to_string(), reference.to_string()),
            (amount, description.to_string()),
        );
    }

    pub fn last_payload(&self) -> Option<Value> {
        self.payloads.lock().unwrap().last().cloned()
    }
}

pub struct MockProvider {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockProvider {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

fn authorised(headers: &HeaderMap) -> bool {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer tok-"));
    let institution = headers
        .get("x-account-holding-institution-identifier")
        .and_then(|v| v.to_str().ok())
        == Some("smega");
    let institution_type = headers
        .get("x-account-holding-institution-identifier-type")
        .and_then(|v| v.to_str().ok())
        == Some("organisationid");
    bearer && institution && institution_type
}

async fn security_services(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let n = state.auth_calls.fetch_add(1, Ordering::SeqCst) + 1;
    let (status, expires_in) = {
        let behaviour = state.behaviour.lock().unwrap();
        (behaviour.auth_status, behaviour.expires_in)
    };
    if status != StatusCode::OK || body["username"] != "dealer" || body["password"] != "secret" {
        let code = if status == StatusCode::OK { StatusCode::UNAUTHORIZED } else { status };
        return (code, Json(json!({"error": "invalid_client"}))).into_response();
    }
    let mut reply = json!({"access_token": format!("tok-{}", n), "token_type": "Bearer"});
    if let Some(expires_in) = expires_in {
        reply["expires_in"] = json!(expires_in);
    }
    Json(reply).into_response()
}

async fn transfer(state: &MockState, headers: &HeaderMap, body: Value) -> Response {
    if !authorised(headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorised"}))).into_response();
    }
    state.payloads.lock().unwrap().push(body);

    let (status, description) = {
        let behaviour = state.behaviour.lock().unwrap();
        (behaviour.transfer_status, behaviour.transfer_description.clone())
    };
    if status != StatusCode::OK {
        return (
            status,
            Json(json!({"errorCategory": "validation", "errorDescription": "Invalid msisdn"})),
        )
            .into_response();
    }

    let n = state.transfers.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "transactionReference": format!("PRV{}", n),
        "descriptionText": description,
    }))
    .into_response()
}

async fn merchantpay(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.merchantpay_calls.fetch_add(1, Ordering::SeqCst);
    transfer(&state, &headers, body).await
}

async fn disbursement(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.disbursement_calls.fetch_add(1, Ordering::SeqCst);
    transfer(&state, &headers, body).await
}

async fn internal_status(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(reference): Path<String>,
) -> Response {
    transaction_status(&state, &headers, "internal", reference)
}

async fn external_status(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(reference): Path<String>,
) -> Response {
    transaction_status(&state, &headers, "external", reference)
}

fn transaction_status(state: &MockState, headers: &HeaderMap, kind: &str, reference: String) -> Response {
    state.status_calls.fetch_add(1, Ordering::SeqCst);
    if !authorised(headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorised"}))).into_response();
    }
    let known = state
        .statuses
        .lock()
        .unwrap()
        .get(&(kind.to_string(), reference.clone()))
        .cloned();
    match known {
        Some((amount, description)) => Json(json!({
            "amount": amount.to_string(),
            "descriptionText": description,
            "transactionReference": reference,
        }))
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"errorDescription": "Transaction not found"})),
        )
            .into_response(),
    }
}

/// Starts the mock provider on an ephemeral local port.
pub async fn start_mock_provider() -> MockProvider {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/security-services", post(security_services))
        .route(
            &format!("{}/transactions/type/merchantpay", GSMA),
            post(merchantpay),
        )
        .route(
            &format!("{}/transactions/type/disbursement", GSMA),
            post(disbursement),
        )
        .route(
            &format!("{}/transactions/internal/:reference", GSMA),
            get(internal_status),
        )
        .route(
            &format!("{}/transactions/external/:reference", GSMA),
            get(external_status),
        )
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockProvider { addr, state }
}

/// A local address nothing listens on.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn provider_config(base_url: &str) -> ProviderConfig {
    ProviderConfig {
        provider: Provider::Btc,
        username: "dealer".to_string(),
        password: "secret".to_string(),
        merchant_number: "70000000".to_string(),
        merchant_pin: "4827".to_string(),
        base_url: base_url.to_string(),
        is_active: true,
    }
}

/// A fully wired gateway over in-memory stores.
pub struct Gateway {
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub transactions: InMemoryTransactionStore,
    pub tokens: InMemoryTokenStore,
    pub ledger: InMemoryLedgerStore,
    pub configs: InMemoryProviderConfigStore,
}

pub fn gateway(configs: Vec<ProviderConfig>) -> Gateway {
    let transactions = InMemoryTransactionStore::new();
    let tokens = InMemoryTokenStore::new();
    let ledger = InMemoryLedgerStore::new();
    let configs = InMemoryProviderConfigStore::new(configs);
    let clock = Arc::new(SystemClock);

    let token_manager = TokenManager::new(Arc::new(tokens.clone()), clock.clone());
    let btc: PaymentAdapterArc = Arc::new(BtcAdapter::new(
        Arc::new(configs.clone()),
        Arc::new(token_manager),
        Arc::new(transactions.clone()),
        BtcClient::new(None).unwrap(),
        clock.clone(),
    ));
    let poster = LedgerPoster::new(Arc::new(ledger.clone()), clock);
    let orchestrator = PaymentOrchestrator::new([btc], Arc::new(transactions.clone()), poster);

    Gateway {
        orchestrator: Arc::new(orchestrator),
        transactions,
        tokens,
        ledger,
        configs,
    }
}

pub fn gateway_for(provider: &MockProvider) -> Gateway {
    gateway(vec![provider_config(&provider.base_url())])
}

pub fn payment(provider: &str, amount: Decimal, msisdn: &str) -> PaymentRequest {
    PaymentRequest {
        provider: provider.to_string(),
        client_id: "CDS-1001".to_string(),
        amount: Amount::new(amount).unwrap(),
        subscriber_msisdn: msisdn.to_string(),
    }
}

pub fn status_by_provider_reference(reference: &str) -> StatusRequest {
    StatusRequest {
        provider: "BTC".to_string(),
        transaction_reference: reference.to_string(),
        use_original_reference: false,
    }
}

pub fn status_by_original_reference(reference: &str) -> StatusRequest {
    StatusRequest {
        provider: "BTC".to_string(),
        transaction_reference: reference.to_string(),
        use_original_reference: true,
    }
}
