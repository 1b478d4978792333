//! Task route handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use promise_core::*;

use crate::{ApiError, ApiState};

/// Claim request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimTaskBody {
    pub id: TaskId,
    pub counter: u64,
    pub process_id: String,
    pub ttl: u64,
}

/// Claim response: the engine's task message, with its kind as `type`.
#[derive(Debug, Serialize)]
struct ClaimedTask {
    #[serde(rename = "type")]
    kind: TaskKind,
    promises: ClaimedPromises,
}

/// POST /tasks/claim
pub async fn claim_task(
    State(state): State<ApiState>,
    Json(body): Json<ClaimTaskBody>,
) -> Result<impl IntoResponse, ApiError> {
    let res = state
        .send(ClaimTaskRequest {
            id: body.id,
            counter: body.counter,
            process_id: body.process_id,
            ttl: body.ttl,
        })
        .await?;
    let claimed = ClaimedTask {
        kind: res.message.kind,
        promises: res.message.promises,
    };
    Ok((StatusCode::CREATED, Json(claimed)))
}

/// Complete task request body.
#[derive(Debug, Deserialize)]
pub struct CompleteTaskBody {
    pub id: TaskId,
    pub counter: u64,
}

/// POST /tasks/complete
pub async fn complete_task(
    State(state): State<ApiState>,
    Json(body): Json<CompleteTaskBody>,
) -> Result<impl IntoResponse, ApiError> {
    let res = state
        .send(CompleteTaskRequest {
            id: body.id,
            counter: body.counter,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(res.task)))
}

/// Heartbeat request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatBody {
    pub process_id: String,
}

/// POST /tasks/heartbeat
///
/// Responds with the bare number of leases extended.
pub async fn heartbeat_tasks(
    State(state): State<ApiState>,
    Json(body): Json<HeartbeatBody>,
) -> Result<impl IntoResponse, ApiError> {
    let res = state
        .send(HeartbeatTasksRequest {
            process_id: body.process_id,
        })
        .await?;
    Ok(Json(res.tasks_affected))
}
