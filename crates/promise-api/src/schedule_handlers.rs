//! Schedule route handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;

use promise_core::*;

use crate::handlers::SearchQuery;
use crate::{ApiError, ApiState, RequestOptions};

/// GET /schedules
pub async fn search_schedules(
    State(state): State<ApiState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let res = state.send(SearchSchedulesRequest { id: query.id }).await?;
    Ok(Json(json!({ "schedules": res.schedules })))
}

/// Create schedule request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleBody {
    pub id: ScheduleId,
    #[serde(default)]
    pub description: Option<String>,
    pub cron: String,
    #[serde(default)]
    pub tags: Tags,
    pub promise_id: String,
    pub promise_timeout: u64,
    #[serde(default)]
    pub promise_param: PromiseValue,
    #[serde(default)]
    pub promise_tags: Tags,
}

/// POST /schedules
///
/// Honors `idempotency-key`; schedules have no strict mode.
pub async fn create_schedule(
    State(state): State<ApiState>,
    opts: RequestOptions,
    Json(body): Json<CreateScheduleBody>,
) -> Result<impl IntoResponse, ApiError> {
    let res = state
        .send(CreateScheduleRequest {
            id: body.id,
            description: body.description,
            cron: body.cron,
            tags: body.tags,
            promise_id: body.promise_id,
            promise_timeout: body.promise_timeout,
            promise_param: body.promise_param,
            promise_tags: body.promise_tags,
            i_key: opts.idempotency_key,
        })
        .await?;
    Ok(Json(res.schedule))
}

/// GET /schedules/{id}
pub async fn read_schedule(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let res = state.send(ReadScheduleRequest { id }).await?;
    Ok(Json(res.schedule))
}

/// DELETE /schedules/{id}
pub async fn delete_schedule(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.send(DeleteScheduleRequest { id }).await?;
    Ok(StatusCode::NO_CONTENT)
}
