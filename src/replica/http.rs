//! Replica RPC surface (HTTP/JSON)
//!
//! | Route | Operation |
//! |---|---|
//! | `GET /accounts/:email` | read |
//! | `PUT /accounts/:email` | write |
//! | `POST /accounts/:email` | activate |
//! | `POST /accounts/:email/credit` | credit |
//! | `POST /accounts/:email/debit` | debit |
//! | `POST /ctrl/ping` | ping |
//! | `POST /ctrl/clear` | clear |
//! | `POST /ctrl/init` | init |
//!
//! Faults are returned as [`FaultBody`](crate::common::FaultBody) JSON.

use crate::common::{Ack, Error, Result, Value};
use crate::replica::store::AccountStore;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Body of credit/debit requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsRequest {
    pub points: i64,
}

/// Balance after a credit/debit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PingRequest {
    #[serde(default)]
    pub message: String,
}

/// `message` is `None` when a replica has nothing to say
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitRequest {
    pub initial_balance: i64,
}

/// Shared replica state for HTTP handlers.
#[derive(Clone)]
pub struct ReplicaState {
    pub store: Arc<AccountStore>,
    pub name: String,
}

/// Liveness answer for `ctrl_ping`
pub fn ping_reply(name: &str, message: &str) -> String {
    let who = if message.trim().is_empty() {
        "friend"
    } else {
        message
    };
    format!("Hello {} from {}", who, name)
}

/// Activation as seen over RPC: re-activating an account is a fault.
pub fn activate_user(store: &AccountStore, email: &str) -> Result<Ack> {
    if !store.activate(email)? {
        return Err(Error::EmailAlreadyExists(format!(
            "account '{}' is already active",
            email
        )));
    }
    Ok(Ack::ok())
}

async fn read_account(
    State(state): State<ReplicaState>,
    Path(email): Path<String>,
) -> Result<Json<Value>> {
    let value = state.store.get_balance(&email)?;
    tracing::debug!("read {} -> {} {}", email, value.balance, value.tag);
    Ok(Json(value))
}

async fn write_account(
    State(state): State<ReplicaState>,
    Path(email): Path<String>,
    Json(value): Json<Value>,
) -> Result<Json<Ack>> {
    state.store.write(&email, value)?;
    tracing::debug!("write {} <- {} {}", email, value.balance, value.tag);
    Ok(Json(Ack::ok()))
}

async fn activate_account(
    State(state): State<ReplicaState>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse> {
    let ack = activate_user(&state.store, &email)?;
    Ok((StatusCode::CREATED, Json(ack)))
}

async fn credit_account(
    State(state): State<ReplicaState>,
    Path(email): Path<String>,
    Json(req): Json<PointsRequest>,
) -> Result<Json<BalanceResponse>> {
    let balance = state.store.credit(&email, req.points)?;
    Ok(Json(BalanceResponse { balance }))
}

async fn debit_account(
    State(state): State<ReplicaState>,
    Path(email): Path<String>,
    Json(req): Json<PointsRequest>,
) -> Result<Json<BalanceResponse>> {
    let balance = state.store.debit(&email, req.points)?;
    Ok(Json(BalanceResponse { balance }))
}

async fn ctrl_ping(
    State(state): State<ReplicaState>,
    Json(req): Json<PingRequest>,
) -> Json<PingResponse> {
    Json(PingResponse {
        message: Some(ping_reply(&state.name, &req.message)),
    })
}

async fn ctrl_clear(State(state): State<ReplicaState>) -> StatusCode {
    state.store.reset();
    tracing::info!("Replica {} cleared", state.name);
    StatusCode::NO_CONTENT
}

async fn ctrl_init(
    State(state): State<ReplicaState>,
    Json(req): Json<InitRequest>,
) -> Result<StatusCode> {
    state.store.set_initial_balance(req.initial_balance)?;
    tracing::info!(
        "Replica {} initial balance set to {}",
        state.name,
        req.initial_balance
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn health(State(state): State<ReplicaState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "replica": state.name,
        "accounts": state.store.len(),
        "initial_balance": state.store.initial_balance(),
    }))
}

/// Creates the replica router.
pub fn create_router(state: ReplicaState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/accounts/:email",
            get(read_account).put(write_account).post(activate_account),
        )
        .route("/accounts/:email/credit", post(credit_account))
        .route("/accounts/:email/debit", post(debit_account))
        .route("/ctrl/ping", post(ctrl_ping))
        .route("/ctrl/clear", post(ctrl_clear))
        .route("/ctrl/init", post(ctrl_init))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_reply() {
        assert_eq!(ping_reply("Points2", "test"), "Hello test from Points2");
        assert_eq!(ping_reply("Points2", "  "), "Hello friend from Points2");
    }
}
