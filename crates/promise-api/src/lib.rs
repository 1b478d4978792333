//! promise-api — HTTP adapter for the promise engine.
//!
//! Every route parses its input into one canonical engine request, awaits
//! the engine's single answer through [`promise_engine::dispatch::send`], and
//! formats the outcome. Engine failures become JSON errors via [`ApiError`].
//!
//! # API Routes
//!
//! | Method | Path | Success |
//! |---|---|---|
//! | GET | `/promises` | 200 `{promises}` |
//! | POST | `/promises` | 201 promise |
//! | POST | `/promises/task` | 201 `{promise, task}`, 200 when no task was created |
//! | GET | `/promises/{id}` | 200 promise |
//! | PATCH | `/promises/{id}` | 200 promise |
//! | POST | `/promises/callback/{id}` | 200 `{promise, callback}` |
//! | POST | `/promises/subscribe/{id}` | 201 `{promise, callback}`, 200 when already completed |
//! | GET | `/schedules` | 200 `{schedules}` |
//! | POST | `/schedules` | 200 schedule |
//! | GET | `/schedules/{id}` | 200 schedule |
//! | DELETE | `/schedules/{id}` | 204 |
//! | POST | `/tasks/claim` | 201 `{type, promises}` |
//! | POST | `/tasks/complete` | 201 task |
//! | POST | `/tasks/heartbeat` | 200 affected count |

pub mod error;
pub mod handlers;
pub mod headers;
pub mod schedule_handlers;
pub mod server;
pub mod task_handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use promise_core::EngineRequest;
use promise_engine::{Engine, dispatch};

pub use error::ApiError;
pub use headers::RequestOptions;
pub use server::{Gateway, GatewayError, GatewayStatus};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<dyn Engine>,
}

impl ApiState {
    /// Dispatch one request and await the engine's answer.
    pub async fn send<R: EngineRequest>(&self, request: R) -> Result<R::Response, ApiError> {
        Ok(dispatch::send(self.engine.as_ref(), request).await?)
    }
}

/// Build the complete API router over an engine handle.
pub fn build_router(engine: Arc<dyn Engine>) -> Router {
    let state = ApiState { engine };

    Router::new()
        .route(
            "/promises",
            get(handlers::search_promises).post(handlers::create_promise),
        )
        .route("/promises/task", post(handlers::create_promise_and_task))
        .route(
            "/promises/{id}",
            get(handlers::read_promise).patch(handlers::complete_promise),
        )
        .route("/promises/callback/{id}", post(handlers::create_callback))
        .route("/promises/subscribe/{id}", post(handlers::create_subscription))
        .route(
            "/schedules",
            get(schedule_handlers::search_schedules).post(schedule_handlers::create_schedule),
        )
        .route(
            "/schedules/{id}",
            get(schedule_handlers::read_schedule).delete(schedule_handlers::delete_schedule),
        )
        .route("/tasks/claim", post(task_handlers::claim_task))
        .route("/tasks/complete", post(task_handlers::complete_task))
        .route("/tasks/heartbeat", post(task_handlers::heartbeat_tasks))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
