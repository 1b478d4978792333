//! Task leases: creation, claim, completion, heartbeat.

use tracing::debug;

use promise_core::*;

use super::Ops;
use super::tables::*;

impl Ops<'_> {
    /// Invoke task for a freshly created promise, already leased to the
    /// creating process.
    pub(super) fn create_invoke_task(
        &self,
        promise: &PromiseRecord,
        lease: &TaskCreate,
    ) -> EngineResult<TaskRecord> {
        let task = TaskRecord {
            id: format!("__invoke:{}", promise.id),
            counter: 1,
            state: TaskState::Claimed,
            kind: TaskKind::Invoke,
            root_promise_id: promise.id.clone(),
            leaf_promise_id: None,
            recv: None,
            process_id: Some(lease.process_id.clone()),
            ttl: lease.ttl,
            expiry: Some(self.now.saturating_add(lease.ttl)),
            timeout: promise.timeout,
            created_on: self.now,
            completed_on: None,
        };
        self.txn.put(TASKS, &task.id, &task)?;
        debug!(task_id = %task.id, process_id = %lease.process_id, "invoke task created");
        Ok(task)
    }

    /// Queue the task a settled callback turns into.
    pub(super) fn enqueue_callback_task(
        &self,
        kind: TaskKind,
        callback: CallbackRecord,
    ) -> EngineResult<()> {
        let (root, leaf) = match kind {
            TaskKind::Resume => (callback.root_promise_id, Some(callback.promise_id)),
            TaskKind::Invoke | TaskKind::Notify => (callback.promise_id, None),
        };
        let task = TaskRecord {
            id: callback.id,
            counter: 1,
            state: TaskState::Init,
            kind,
            root_promise_id: root,
            leaf_promise_id: leaf,
            recv: Some(callback.recv),
            process_id: None,
            ttl: 0,
            expiry: None,
            timeout: callback.timeout,
            created_on: self.now,
            completed_on: None,
        };
        self.txn.put(TASKS, &task.id, &task)?;
        debug!(task_id = %task.id, ?kind, "callback task queued");
        Ok(())
    }

    /// Load a task, releasing its lease if the lease ran out.
    fn load_task(&self, id: &str) -> EngineResult<TaskRecord> {
        let mut task: TaskRecord = self
            .txn
            .get(TASKS, id)?
            .ok_or_else(|| EngineError::TaskNotFound(id.to_string()))?;

        let lapsed = task.state == TaskState::Claimed
            && task.expiry.is_some_and(|expiry| self.now >= expiry);
        if lapsed {
            task.state = TaskState::Init;
            task.counter += 1;
            task.process_id = None;
            task.expiry = None;
            self.txn.put(TASKS, &task.id, &task)?;
            debug!(task_id = %task.id, counter = task.counter, "task lease expired");
        }
        Ok(task)
    }

    fn promise_ref(&self, id: &str) -> EngineResult<Option<PromiseRef>> {
        Ok(self.load_promise(id)?.map(|data| PromiseRef {
            id: data.id.clone(),
            data,
        }))
    }

    pub(super) fn claim_task(&self, req: ClaimTaskRequest) -> EngineResult<ClaimTaskResponse> {
        let mut task = self.load_task(&req.id)?;
        match task.state {
            TaskState::Completed => return Err(EngineError::TaskAlreadyCompleted(task.id)),
            TaskState::Claimed => return Err(EngineError::TaskAlreadyClaimed(task.id)),
            TaskState::Init => {}
        }
        if task.counter != req.counter {
            return Err(EngineError::TaskInvalidCounter {
                id: task.id,
                expected: task.counter,
                actual: req.counter,
            });
        }

        task.state = TaskState::Claimed;
        task.process_id = Some(req.process_id);
        task.ttl = req.ttl;
        task.expiry = Some(self.now.saturating_add(req.ttl));
        self.txn.put(TASKS, &task.id, &task)?;
        debug!(task_id = %task.id, counter = task.counter, "task claimed");

        let root = self.promise_ref(&task.root_promise_id)?;
        let leaf = match &task.leaf_promise_id {
            Some(id) => self.promise_ref(id)?,
            None => None,
        };
        Ok(ClaimTaskResponse {
            message: TaskMessage {
                kind: task.kind,
                promises: ClaimedPromises { root, leaf },
            },
        })
    }

    pub(super) fn complete_task(
        &self,
        req: CompleteTaskRequest,
    ) -> EngineResult<CompleteTaskResponse> {
        let mut task = self.load_task(&req.id)?;
        match task.state {
            TaskState::Completed if task.counter == req.counter => {
                return Ok(CompleteTaskResponse { task });
            }
            TaskState::Completed => return Err(EngineError::TaskAlreadyCompleted(task.id)),
            TaskState::Init => return Err(EngineError::TaskInvalidState(task.id)),
            TaskState::Claimed => {}
        }
        if task.counter != req.counter {
            return Err(EngineError::TaskInvalidCounter {
                id: task.id,
                expected: task.counter,
                actual: req.counter,
            });
        }

        task.state = TaskState::Completed;
        task.expiry = None;
        task.completed_on = Some(self.now);
        self.txn.put(TASKS, &task.id, &task)?;
        debug!(task_id = %task.id, "task completed");
        Ok(CompleteTaskResponse { task })
    }

    /// Extend every live lease held by a process.
    pub(super) fn heartbeat_tasks(
        &self,
        req: HeartbeatTasksRequest,
    ) -> EngineResult<HeartbeatTasksResponse> {
        let mut tasks_affected = 0;
        for mut task in self.txn.scan::<TaskRecord>(TASKS, "")? {
            let live = task.state == TaskState::Claimed
                && task.process_id.as_deref() == Some(req.process_id.as_str())
                && task.expiry.is_some_and(|expiry| self.now < expiry);
            if live {
                task.expiry = Some(self.now.saturating_add(task.ttl));
                self.txn.put(TASKS, &task.id, &task)?;
                tasks_affected += 1;
            }
        }
        debug!(process_id = %req.process_id, tasks_affected, "heartbeat");
        Ok(HeartbeatTasksResponse { tasks_affected })
    }
}
