//! Callback-to-future bridge.
//!
//! [`send`] turns one callback-style [`Engine::send`] into a future that
//! resolves with exactly one outcome. The callback owns the only sender of a
//! oneshot channel: the first invocation consumes it, and any later
//! invocation is an engine bug and panics.
//!
//! No state is shared between calls, so independent requests may be
//! dispatched concurrently from any number of tasks.

use tokio::sync::oneshot;
use tracing::debug;

use promise_core::{EngineError, EngineRequest, EngineResult, Response};

use crate::engine::Engine;

/// Send `request` to `engine` and await its single answer.
///
/// Resolves to the response type bound to the request. An engine that
/// answers with another kind yields [`EngineError::UnexpectedResponse`]; an
/// engine that drops the callback unanswered yields
/// [`EngineError::Abandoned`].
pub async fn send<E, R>(engine: &E, request: R) -> EngineResult<R::Response>
where
    E: Engine + ?Sized,
    R: EngineRequest,
{
    let kind = R::KIND;
    let (tx, rx) = oneshot::channel();
    let mut slot = Some(tx);

    debug!(%kind, "dispatching to engine");
    engine.send(
        request.into(),
        Box::new(move |outcome: EngineResult<Response>| {
            let Some(tx) = slot.take() else {
                panic!("engine invoked the {kind} callback more than once");
            };
            // The receiver only goes away if the awaiting handler was dropped.
            let _ = tx.send(outcome);
        }),
    );

    let response = rx.await.map_err(|_| EngineError::Abandoned(kind))??;
    R::Response::try_from(response).map_err(|other| EngineError::UnexpectedResponse {
        expected: kind,
        actual: other.kind(),
    })
}
