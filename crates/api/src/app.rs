use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde_json::{Value as JsonValue, json};
use thiserror::Error;
use tower::ServiceBuilder;

use guestbook_infra::{
    CallContext, Contract, ContractError, GuestbookConfig,
    event_store::{EventStore, EventStoreError},
};

use crate::context::CallerContext;
use crate::errors::{contract_error_to_response, json_error};
use crate::middleware::caller_middleware;

/// The contract as hosted here: bound to whichever store the config picks.
pub type HostContract = Contract<Arc<dyn EventStore>>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to open event store: {0}")]
    Store(#[from] EventStoreError),

    #[error("failed to load contract: {0}")]
    Contract(#[from] ContractError),
}

#[derive(Clone)]
pub struct AppState {
    contract: Arc<Mutex<HostContract>>,
}

/// Open the configured store, load the contract and build the router.
pub fn build_app(config: &GuestbookConfig) -> Result<Router, AppError> {
    let store = config.open_store()?;
    let contract = Contract::load(store, config.ledger_id, config.list_window)?;
    Ok(router(contract))
}

pub fn router(contract: HostContract) -> Router {
    let state = AppState {
        contract: Arc::new(Mutex::new(contract)),
    };

    let calls = Router::new()
        .route("/call/:method", post(call_method))
        .route_layer(ServiceBuilder::new().layer(axum::middleware::from_fn(caller_middleware)));

    Router::new()
        .route("/health", get(health))
        .merge(calls)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn call_method(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Path(method): Path<String>,
    body: Bytes,
) -> Response {
    let args: JsonValue = if body.is_empty() {
        JsonValue::Null
    } else {
        match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => return json_error(StatusCode::BAD_REQUEST, "invalid_json", e.to_string()),
        }
    };

    // The host, not the caller, stamps the time.
    let ctx = CallContext::new(caller.account_id().clone(), Utc::now());

    // Store IO is blocking; keep it off the async workers.
    let outcome = tokio::task::spawn_blocking(move || {
        let mut contract = state
            .contract
            .lock()
            .map_err(|_| json_error(StatusCode::INTERNAL_SERVER_ERROR, "poisoned", "lock poisoned"))?;
        contract
            .call(&ctx, &method, args)
            .map_err(contract_error_to_response)
    })
    .await;

    match outcome {
        Ok(Ok(result)) => (StatusCode::OK, Json(json!({ "result": result }))).into_response(),
        Ok(Err(response)) => response,
        Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "join_error", e.to_string()),
    }
}
