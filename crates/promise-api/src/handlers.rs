//! Promise route handlers.
//!
//! Each handler builds one engine request from the path, query, headers, and
//! body, dispatches it, and shapes the answer. Engine errors propagate as
//! [`ApiError`].

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;

use promise_core::*;

use crate::{ApiError, ApiState, RequestOptions};

/// Optional `?id=` filter shared by the search routes.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub id: Option<String>,
}

/// GET /promises
pub async fn search_promises(
    State(state): State<ApiState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let res = state.send(SearchPromisesRequest { id: query.id }).await?;
    Ok(Json(json!({ "promises": res.promises })))
}

/// Create promise request body.
#[derive(Debug, Deserialize)]
pub struct CreatePromiseBody {
    pub id: PromiseId,
    #[serde(default)]
    pub param: PromiseValue,
    #[serde(default)]
    pub tags: Tags,
    pub timeout: u64,
}

/// POST /promises
pub async fn create_promise(
    State(state): State<ApiState>,
    opts: RequestOptions,
    Json(body): Json<CreatePromiseBody>,
) -> Result<impl IntoResponse, ApiError> {
    let res = state
        .send(CreatePromiseRequest {
            id: body.id,
            param: body.param,
            tags: body.tags,
            timeout: body.timeout,
            i_key: opts.idempotency_key,
            strict: opts.strict,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(res.promise)))
}

/// Create promise-and-task request body.
#[derive(Debug, Deserialize)]
pub struct CreatePromiseAndTaskBody {
    pub promise: PromiseCreate,
    pub task: TaskCreate,
}

/// POST /promises/task
pub async fn create_promise_and_task(
    State(state): State<ApiState>,
    opts: RequestOptions,
    Json(body): Json<CreatePromiseAndTaskBody>,
) -> Result<impl IntoResponse, ApiError> {
    let res = state
        .send(CreatePromiseAndTaskRequest {
            promise: body.promise,
            task: body.task,
            i_key: opts.idempotency_key,
            strict: opts.strict,
        })
        .await?;
    let status = match res.task {
        Some(_) => StatusCode::CREATED,
        None => StatusCode::OK,
    };
    Ok((status, Json(res)))
}

/// GET /promises/{id}
pub async fn read_promise(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let res = state.send(ReadPromiseRequest { id }).await?;
    Ok(Json(res.promise))
}

/// Complete promise request body. `state` is matched case-insensitively.
#[derive(Debug, Deserialize)]
pub struct CompletePromiseBody {
    pub state: String,
    #[serde(default)]
    pub value: PromiseValue,
}

/// PATCH /promises/{id}
pub async fn complete_promise(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    opts: RequestOptions,
    Json(body): Json<CompletePromiseBody>,
) -> Result<impl IntoResponse, ApiError> {
    let completion: CompletionState = body.state.to_lowercase().parse()?;
    let res = state
        .send(CompletePromiseRequest {
            id,
            state: completion,
            value: body.value,
            i_key: opts.idempotency_key,
            strict: opts.strict,
        })
        .await?;
    Ok(Json(res.promise))
}

/// Create callback request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallbackBody {
    pub root_promise_id: PromiseId,
    pub timeout: u64,
    pub recv: Recv,
}

/// POST /promises/callback/{id}
pub async fn create_callback(
    State(state): State<ApiState>,
    Path(promise_id): Path<String>,
    Json(body): Json<CreateCallbackBody>,
) -> Result<impl IntoResponse, ApiError> {
    let res = state
        .send(CreateCallbackRequest {
            promise_id,
            root_promise_id: body.root_promise_id,
            timeout: body.timeout,
            recv: body.recv,
        })
        .await?;
    Ok(Json(res))
}

/// Create subscription request body.
#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionBody {
    pub id: String,
    pub timeout: u64,
    pub recv: Recv,
}

/// POST /promises/subscribe/{id}
pub async fn create_subscription(
    State(state): State<ApiState>,
    Path(promise_id): Path<String>,
    Json(body): Json<CreateSubscriptionBody>,
) -> Result<impl IntoResponse, ApiError> {
    let res = state
        .send(CreateSubscriptionRequest {
            id: body.id,
            promise_id,
            timeout: body.timeout,
            recv: body.recv,
        })
        .await?;
    let status = match res.callback {
        Some(_) => StatusCode::CREATED,
        None => StatusCode::OK,
    };
    Ok((status, Json(res)))
}
