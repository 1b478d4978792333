//! Promise lifecycle and callback registration.

use serde::{Deserialize, Serialize};
use tracing::debug;

use promise_core::*;

use super::Ops;
use super::search::IdPattern;
use super::tables::*;

/// A callback waiting for its promise, plus the kind of task it becomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCallback {
    kind: TaskKind,
    callback: CallbackRecord,
}

/// Error for an attempt to complete (or recreate) a terminal promise.
fn already_completed(promise: &PromiseRecord) -> EngineError {
    let id = promise.id.clone();
    match promise.state {
        PromiseState::Pending => EngineError::Invalid(format!("promise {id} is pending")),
        PromiseState::Resolved => EngineError::PromiseAlreadyResolved(id),
        PromiseState::Rejected => EngineError::PromiseAlreadyRejected(id),
        PromiseState::RejectedCanceled => EngineError::PromiseAlreadyCanceled(id),
        PromiseState::RejectedTimedout => EngineError::PromiseAlreadyTimedout(id),
    }
}

/// True when the request carries a key equal to the stored one.
fn same_key(stored: &Option<String>, requested: &Option<String>) -> bool {
    requested.is_some() && stored == requested
}

impl Ops<'_> {
    /// Move a pending promise past its deadline to `rejected_timedout`.
    fn expire(&self, promise: &mut PromiseRecord) -> EngineResult<()> {
        if promise.state.is_pending() && self.now >= promise.timeout {
            promise.state = PromiseState::RejectedTimedout;
            promise.completed_on = Some(promise.timeout);
            self.txn.put(PROMISES, &promise.id, &*promise)?;
            self.settle_callbacks(promise)?;
            debug!(promise_id = %promise.id, "promise timed out");
        }
        Ok(())
    }

    pub(super) fn load_promise(&self, id: &str) -> EngineResult<Option<PromiseRecord>> {
        match self.txn.get::<PromiseRecord>(PROMISES, id)? {
            Some(mut promise) => {
                self.expire(&mut promise)?;
                Ok(Some(promise))
            }
            None => Ok(None),
        }
    }

    fn require_promise(&self, id: &str) -> EngineResult<PromiseRecord> {
        self.load_promise(id)?
            .ok_or_else(|| EngineError::PromiseNotFound(id.to_string()))
    }

    /// Create a promise, or return the existing one for an idempotent retry.
    /// The flag is true when a new promise was stored.
    fn insert_promise(
        &self,
        create: PromiseCreate,
        i_key: Option<String>,
        strict: bool,
    ) -> EngineResult<(PromiseRecord, bool)> {
        if let Some(existing) = self.load_promise(&create.id)? {
            if same_key(&existing.idempotency_key_for_create, &i_key)
                && (!strict || existing.state.is_pending())
            {
                return Ok((existing, false));
            }
            return Err(EngineError::PromiseAlreadyExists(create.id));
        }

        let mut promise = PromiseRecord {
            id: create.id,
            state: PromiseState::Pending,
            param: create.param,
            value: PromiseValue::default(),
            timeout: create.timeout,
            tags: create.tags,
            idempotency_key_for_create: i_key,
            idempotency_key_for_complete: None,
            created_on: self.now,
            completed_on: None,
        };
        self.txn.put(PROMISES, &promise.id, &promise)?;
        self.expire(&mut promise)?;
        debug!(promise_id = %promise.id, "promise created");
        Ok((promise, true))
    }

    pub(super) fn search_promises(
        &self,
        req: SearchPromisesRequest,
    ) -> EngineResult<SearchPromisesResponse> {
        let pattern = IdPattern::new(req.id.as_deref())?;
        let mut promises = Vec::new();
        for mut promise in self.txn.scan::<PromiseRecord>(PROMISES, "")? {
            if pattern.matches(&promise.id) {
                self.expire(&mut promise)?;
                promises.push(promise);
            }
        }
        Ok(SearchPromisesResponse { promises })
    }

    pub(super) fn create_promise(
        &self,
        req: CreatePromiseRequest,
    ) -> EngineResult<CreatePromiseResponse> {
        let create = PromiseCreate {
            id: req.id,
            timeout: req.timeout,
            param: req.param,
            tags: req.tags,
        };
        let (promise, _) = self.insert_promise(create, req.i_key, req.strict)?;
        Ok(CreatePromiseResponse { promise })
    }

    pub(super) fn create_promise_and_task(
        &self,
        req: CreatePromiseAndTaskRequest,
    ) -> EngineResult<CreatePromiseAndTaskResponse> {
        let (promise, created) = self.insert_promise(req.promise, req.i_key, req.strict)?;
        let task = if created && promise.state.is_pending() {
            Some(self.create_invoke_task(&promise, &req.task)?)
        } else {
            None
        };
        Ok(CreatePromiseAndTaskResponse { promise, task })
    }

    pub(super) fn read_promise(&self, req: ReadPromiseRequest) -> EngineResult<ReadPromiseResponse> {
        Ok(ReadPromiseResponse {
            promise: self.require_promise(&req.id)?,
        })
    }

    pub(super) fn complete_promise(
        &self,
        req: CompletePromiseRequest,
    ) -> EngineResult<CompletePromiseResponse> {
        let mut promise = self.require_promise(&req.id)?;

        if promise.state.is_pending() {
            promise.state = req.state.into();
            promise.value = req.value;
            promise.idempotency_key_for_complete = req.i_key;
            promise.completed_on = Some(self.now);
            self.txn.put(PROMISES, &promise.id, &promise)?;
            self.settle_callbacks(&promise)?;
            debug!(promise_id = %promise.id, state = %req.state, "promise completed");
            return Ok(CompletePromiseResponse { promise });
        }

        if promise.state == PromiseState::RejectedTimedout && !req.strict {
            return Ok(CompletePromiseResponse { promise });
        }
        if same_key(&promise.idempotency_key_for_complete, &req.i_key)
            && (!req.strict || promise.state == PromiseState::from(req.state))
        {
            return Ok(CompletePromiseResponse { promise });
        }
        Err(already_completed(&promise))
    }

    pub(super) fn create_callback(
        &self,
        req: CreateCallbackRequest,
    ) -> EngineResult<CreateCallbackResponse> {
        let promise = self.require_promise(&req.promise_id)?;
        if !promise.state.is_pending() {
            return Ok(CreateCallbackResponse {
                promise,
                callback: None,
            });
        }
        let callback = CallbackRecord {
            id: format!("__resume:{}:{}", req.root_promise_id, req.promise_id),
            promise_id: req.promise_id,
            root_promise_id: req.root_promise_id,
            recv: req.recv,
            timeout: req.timeout,
            created_on: self.now,
        };
        let callback = self.register_callback(TaskKind::Resume, callback)?;
        Ok(CreateCallbackResponse {
            promise,
            callback: Some(callback),
        })
    }

    pub(super) fn create_subscription(
        &self,
        req: CreateSubscriptionRequest,
    ) -> EngineResult<CreateSubscriptionResponse> {
        let promise = self.require_promise(&req.promise_id)?;
        if !promise.state.is_pending() {
            return Ok(CreateSubscriptionResponse {
                promise,
                callback: None,
            });
        }
        let callback = CallbackRecord {
            id: format!("__notify:{}:{}", req.promise_id, req.id),
            root_promise_id: req.promise_id.clone(),
            promise_id: req.promise_id,
            recv: req.recv,
            timeout: req.timeout,
            created_on: self.now,
        };
        let callback = self.register_callback(TaskKind::Notify, callback)?;
        Ok(CreateSubscriptionResponse {
            promise,
            callback: Some(callback),
        })
    }

    /// Store a callback unless one with the same id is already waiting.
    fn register_callback(
        &self,
        kind: TaskKind,
        callback: CallbackRecord,
    ) -> EngineResult<CallbackRecord> {
        let key = callback_key(&callback.promise_id, &callback.id);
        if let Some(existing) = self.txn.get::<StoredCallback>(CALLBACKS, &key)? {
            return Ok(existing.callback);
        }
        self.txn.put(CALLBACKS, &key, &StoredCallback {
            kind,
            callback: callback.clone(),
        })?;
        debug!(callback_id = %callback.id, promise_id = %callback.promise_id, "callback registered");
        Ok(callback)
    }

    /// Turn every callback on a completed promise into a task.
    fn settle_callbacks(&self, promise: &PromiseRecord) -> EngineResult<()> {
        let prefix = callback_key(&promise.id, "");
        let waiting = self.txn.scan::<StoredCallback>(CALLBACKS, &prefix)?;
        for StoredCallback { kind, callback } in waiting {
            if callback.promise_id != promise.id {
                continue;
            }
            self.txn
                .remove(CALLBACKS, &callback_key(&callback.promise_id, &callback.id))?;
            self.enqueue_callback_task(kind, callback)?;
        }
        Ok(())
    }
}
