//! Public HTTP API of the front-end
//!
//! Incomplete writes answer 503 with `"balance": -1` plus the number of
//! replicas that acknowledged.

use crate::common::{Result, Tag};
use crate::frontend::client::ReplicaConnector;
use crate::frontend::naming::NameResolver;
use crate::frontend::quorum::{QuorumCoordinator, WriteOutcome};
use crate::replica::http::{InitRequest, PingRequest, PointsRequest};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared front-end state for HTTP handlers.
pub struct FrontState<R, C> {
    pub coordinator: Arc<QuorumCoordinator<R, C>>,
}

impl<R, C> Clone for FrontState<R, C> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
        }
    }
}

/// Answer to balance queries and updates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceReply {
    pub email: String,
    pub balance: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingReply {
    pub message: String,
}

fn outcome_response(email: String, outcome: WriteOutcome) -> Response {
    match outcome {
        WriteOutcome::Committed(value) => Json(BalanceReply {
            email,
            balance: value.balance,
            tag: Some(value.tag),
            acknowledged: None,
            replicas: None,
        })
        .into_response(),
        WriteOutcome::Incomplete {
            acknowledged,
            replicas,
            ..
        } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(BalanceReply {
                email,
                balance: outcome.balance_or_failed(),
                tag: None,
                acknowledged: Some(acknowledged),
                replicas: Some(replicas),
            }),
        )
            .into_response(),
    }
}

async fn activate_user<R, C>(
    State(state): State<FrontState<R, C>>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse>
where
    R: NameResolver + 'static,
    C: ReplicaConnector + 'static,
{
    state.coordinator.activate_user(&email).await?;
    Ok((StatusCode::CREATED, Json(json!({ "email": email }))))
}

async fn points_balance<R, C>(
    State(state): State<FrontState<R, C>>,
    Path(email): Path<String>,
) -> Result<Json<BalanceReply>>
where
    R: NameResolver + 'static,
    C: ReplicaConnector + 'static,
{
    let value = state.coordinator.read_latest(&email).await?;
    Ok(Json(BalanceReply {
        email,
        balance: value.balance,
        tag: Some(value.tag),
        acknowledged: None,
        replicas: None,
    }))
}

async fn add_points<R, C>(
    State(state): State<FrontState<R, C>>,
    Path(email): Path<String>,
    Json(req): Json<PointsRequest>,
) -> Result<Response>
where
    R: NameResolver + 'static,
    C: ReplicaConnector + 'static,
{
    let outcome = state.coordinator.add_points(&email, req.points).await?;
    Ok(outcome_response(email, outcome))
}

async fn spend_points<R, C>(
    State(state): State<FrontState<R, C>>,
    Path(email): Path<String>,
    Json(req): Json<PointsRequest>,
) -> Result<Response>
where
    R: NameResolver + 'static,
    C: ReplicaConnector + 'static,
{
    let outcome = state.coordinator.spend_points(&email, req.points).await?;
    Ok(outcome_response(email, outcome))
}

async fn ctrl_ping<R, C>(
    State(state): State<FrontState<R, C>>,
    Json(req): Json<PingRequest>,
) -> Result<Json<PingReply>>
where
    R: NameResolver + 'static,
    C: ReplicaConnector + 'static,
{
    let message = state.coordinator.ctrl_ping(&req.message).await?;
    Ok(Json(PingReply { message }))
}

async fn ctrl_clear<R, C>(State(state): State<FrontState<R, C>>) -> Result<StatusCode>
where
    R: NameResolver + 'static,
    C: ReplicaConnector + 'static,
{
    state.coordinator.ctrl_clear().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn ctrl_init<R, C>(
    State(state): State<FrontState<R, C>>,
    Json(req): Json<InitRequest>,
) -> Result<StatusCode>
where
    R: NameResolver + 'static,
    C: ReplicaConnector + 'static,
{
    state.coordinator.ctrl_init(req.initial_balance).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn health<R, C>(State(state): State<FrontState<R, C>>) -> impl IntoResponse
where
    R: NameResolver + 'static,
    C: ReplicaConnector + 'static,
{
    Json(json!({
        "status": "ok",
        "replicas": state.coordinator.replica_names(),
        "fan_out": state.coordinator.fan_out_mode(),
    }))
}

/// Creates the public router.
pub fn create_router<R, C>(state: FrontState<R, C>) -> Router
where
    R: NameResolver + 'static,
    C: ReplicaConnector + 'static,
{
    Router::new()
        .route("/health", get(health::<R, C>))
        .route(
            "/users/:email",
            get(points_balance::<R, C>).post(activate_user::<R, C>),
        )
        .route("/users/:email/add", post(add_points::<R, C>))
        .route("/users/:email/spend", post(spend_points::<R, C>))
        .route("/ctrl/ping", post(ctrl_ping::<R, C>))
        .route("/ctrl/clear", post(ctrl_clear::<R, C>))
        .route("/ctrl/init", post(ctrl_init::<R, C>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
