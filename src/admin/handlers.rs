use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::admin::error::{ActionResponse, AdminError};
use crate::admin::AdminState;
use crate::failover::TransitionOutcome;
use crate::redundancy::HealthSnapshot;
use crate::store::StoreConnector;

/// Body of the operator actions.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorRequest {
    #[serde(alias = "walletAddress")]
    pub operator_id: Option<String>,
}

/// Operator id from the request body; absent or blank is unauthorized.
fn operator(body: &Bytes) -> Result<String, AdminError> {
    let request: OperatorRequest = if body.iter().all(u8::is_ascii_whitespace) {
        OperatorRequest::default()
    } else {
        serde_json::from_slice(body).map_err(|e| AdminError::InvalidBody(e.to_string()))?
    };
    request
        .operator_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(AdminError::MissingOperator)
}

pub async fn get_health<C: StoreConnector>(State(state): State<AdminState<C>>) -> Json<HealthSnapshot> {
    Json(state.manager.health())
}

pub async fn post_db_sync<C: StoreConnector>(
    State(state): State<AdminState<C>>,
    body: Bytes,
) -> Result<Json<ActionResponse>, AdminError> {
    let operator = operator(&body)?;
    tracing::info!(operator = %operator, "Manual database sync requested");

    let report = state.manager.force_sync().await?;
    let response = if report.is_clean() {
        ActionResponse::new(
            true,
            format!("Database sync completed: {} rows synced", report.rows_synced),
        )
    } else {
        ActionResponse::new(
            false,
            format!(
                "Database sync completed with errors: {} rows synced, {} rows failed",
                report.rows_synced, report.rows_failed
            ),
        )
    };
    Ok(Json(response))
}

pub async fn post_db_failover<C: StoreConnector>(
    State(state): State<AdminState<C>>,
    body: Bytes,
) -> Result<Json<ActionResponse>, AdminError> {
    let operator = operator(&body)?;
    tracing::warn!(operator = %operator, "Manual failover requested");

    let message = match state.manager.force_failover().await? {
        TransitionOutcome::Switched => "Failed over to secondary database",
        TransitionOutcome::AlreadyActive => "Secondary database is already active",
    };
    Ok(Json(ActionResponse::new(true, message)))
}

pub async fn post_db_failback<C: StoreConnector>(
    State(state): State<AdminState<C>>,
    body: Bytes,
) -> Result<Json<ActionResponse>, AdminError> {
    let operator = operator(&body)?;
    tracing::warn!(operator = %operator, "Manual failback requested");

    let message = match state.manager.force_failback().await? {
        TransitionOutcome::Switched => "Failed back to primary database",
        TransitionOutcome::AlreadyActive => "Primary database is already active",
    };
    Ok(Json(ActionResponse::new(true, message)))
}
