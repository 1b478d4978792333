//! LocalEngine — the default in-process engine.
//!
//! Answers every message inline, inside one redb write transaction, so the
//! HTTP adapter can run without an external engine process. It keeps the
//! promise, task, schedule, and callback bookkeeping a single node needs;
//! it does not evaluate cron expressions or deliver notifications.

mod promises;
mod schedules;
mod search;
mod store;
mod tables;
mod tasks;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use promise_core::config::EngineConfig;
use promise_core::{EngineError, EngineResult, Request, Response};

use crate::clock::{Clock, SystemClock};
use crate::engine::{Callback, Engine};

use store::{Store, Txn};

/// File name of the on-disk store inside the configured data directory.
pub const DB_FILE_NAME: &str = "promised.redb";

/// Default engine backed by an embedded redb database.
pub struct LocalEngine {
    store: Store,
    clock: Arc<dyn Clock>,
    stopped: AtomicBool,
}

impl LocalEngine {
    /// Engine with an ephemeral in-memory store.
    pub fn in_memory() -> EngineResult<Self> {
        Ok(Self::with_store(Store::open_in_memory()?))
    }

    /// Engine persisting to the redb file at `path`.
    pub fn open(path: &Path) -> EngineResult<Self> {
        Ok(Self::with_store(Store::open(path)?))
    }

    /// Engine as described by the `[engine]` config section.
    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        match &config.data_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)
                    .map_err(|e| EngineError::Storage(format!("create {}: {e}", dir.display())))?;
                Self::open(&dir.join(DB_FILE_NAME))
            }
            None => Self::in_memory(),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn with_store(store: Store) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            stopped: AtomicBool::new(false),
        }
    }

    /// Apply one request and return its outcome.
    pub fn handle(&self, request: Request) -> EngineResult<Response> {
        let now = self.clock.now_millis();
        self.store.write(|txn| {
            let ops = Ops { txn, now };
            match request {
                Request::SearchPromises(req) => ops.search_promises(req).map(Response::from),
                Request::CreatePromise(req) => ops.create_promise(req).map(Response::from),
                Request::CreatePromiseAndTask(req) => {
                    ops.create_promise_and_task(req).map(Response::from)
                }
                Request::ReadPromise(req) => ops.read_promise(req).map(Response::from),
                Request::CompletePromise(req) => ops.complete_promise(req).map(Response::from),
                Request::CreateCallback(req) => ops.create_callback(req).map(Response::from),
                Request::CreateSubscription(req) => {
                    ops.create_subscription(req).map(Response::from)
                }
                Request::SearchSchedules(req) => ops.search_schedules(req).map(Response::from),
                Request::CreateSchedule(req) => ops.create_schedule(req).map(Response::from),
                Request::ReadSchedule(req) => ops.read_schedule(req).map(Response::from),
                Request::DeleteSchedule(req) => ops.delete_schedule(req).map(Response::from),
                Request::ClaimTask(req) => ops.claim_task(req).map(Response::from),
                Request::CompleteTask(req) => ops.complete_task(req).map(Response::from),
                Request::HeartbeatTasks(req) => ops.heartbeat_tasks(req).map(Response::from),
            }
        })
    }
}

impl Engine for LocalEngine {
    fn send(&self, request: Request, mut callback: Callback) {
        if self.stopped.load(Ordering::SeqCst) {
            callback(Err(EngineError::Stopped));
            return;
        }
        let kind = request.kind();
        let outcome = self.handle(request);
        match &outcome {
            Ok(_) => debug!(%kind, "engine request handled"),
            Err(e) => debug!(%kind, error = %e, "engine request failed"),
        }
        callback(outcome);
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            info!("local engine stopped");
        }
    }
}

/// Operations over one transaction at one instant.
#[derive(Clone, Copy)]
struct Ops<'a> {
    txn: Txn<'a>,
    now: u64,
}
