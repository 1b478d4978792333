//! The engine boundary.
//!
//! An engine accepts one canonical [`Request`] at a time and answers it by
//! invoking the supplied [`Callback`] exactly once. Whether it answers inline
//! or from its own scheduler is up to the engine.

use std::sync::Arc;

use promise_core::{EngineResult, Request, Response};

/// Completion callback handed to [`Engine::send`].
///
/// `FnMut` rather than `FnOnce` because the engine contract, not the type
/// system, is what limits it to one call; see [`crate::dispatch`].
pub type Callback = Box<dyn FnMut(EngineResult<Response>) + Send + 'static>;

/// A durable promise engine reachable through message passing.
pub trait Engine: Send + Sync + 'static {
    /// Submit a request. The callback receives either a response of the
    /// request's kind or an error, once.
    fn send(&self, request: Request, callback: Callback);

    /// Release engine resources. Idempotent.
    fn stop(&self);
}

impl<E: Engine + ?Sized> Engine for Arc<E> {
    fn send(&self, request: Request, callback: Callback) {
        (**self).send(request, callback)
    }

    fn stop(&self) {
        (**self).stop()
    }
}
