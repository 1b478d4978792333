//! Records owned by the engine.
//!
//! These types describe promises, tasks, schedules, and callbacks as they
//! travel between the HTTP adapter and the engine. The adapter never stores
//! them; it only relays them per request. All types serialize to camelCase
//! JSON, which is also the wire format clients see.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a durable promise.
pub type PromiseId = String;

/// Unique identifier for a task.
pub type TaskId = String;

/// Unique identifier for a schedule.
pub type ScheduleId = String;

/// Free-form string tags attached to promises and schedules.
pub type Tags = HashMap<String, String>;

// ── Promise ───────────────────────────────────────────────────────

/// Payload of a promise parameter or settled value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromiseValue {
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Lifecycle state of a durable promise.
///
/// Transitions only ever leave `Pending`; every other state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromiseState {
    Pending,
    Resolved,
    Rejected,
    RejectedCanceled,
    RejectedTimedout,
}

impl PromiseState {
    pub fn is_pending(self) -> bool {
        self == PromiseState::Pending
    }
}

/// A terminal state a client may request when completing a promise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionState {
    Resolved,
    Rejected,
    RejectedCanceled,
}

impl CompletionState {
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionState::Resolved => "resolved",
            CompletionState::Rejected => "rejected",
            CompletionState::RejectedCanceled => "rejected_canceled",
        }
    }
}

impl From<CompletionState> for PromiseState {
    fn from(state: CompletionState) -> Self {
        match state {
            CompletionState::Resolved => PromiseState::Resolved,
            CompletionState::Rejected => PromiseState::Rejected,
            CompletionState::RejectedCanceled => PromiseState::RejectedCanceled,
        }
    }
}

impl fmt::Display for CompletionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a completion state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid completion state: {0:?}")]
pub struct InvalidCompletionState(pub String);

impl FromStr for CompletionState {
    type Err = InvalidCompletionState;

    /// Exact, case-sensitive match. Callers normalize case beforehand.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resolved" => Ok(CompletionState::Resolved),
            "rejected" => Ok(CompletionState::Rejected),
            "rejected_canceled" => Ok(CompletionState::RejectedCanceled),
            other => Err(InvalidCompletionState(other.to_string())),
        }
    }
}

/// A durable promise as tracked by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromiseRecord {
    pub id: PromiseId,
    pub state: PromiseState,
    pub param: PromiseValue,
    pub value: PromiseValue,
    /// Absolute deadline (unix milliseconds).
    pub timeout: u64,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key_for_create: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key_for_complete: Option<String>,
    pub created_on: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_on: Option<u64>,
}

// ── Callback ──────────────────────────────────────────────────────

/// Recipient of a task or notification.
///
/// Either a plain address (`"poll://default"`) or a typed descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Recv {
    Address(String),
    Descriptor {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        data: serde_json::Value,
    },
}

/// One-shot notification registration on a promise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallbackRecord {
    pub id: String,
    pub promise_id: PromiseId,
    pub root_promise_id: PromiseId,
    pub recv: Recv,
    pub timeout: u64,
    pub created_on: u64,
}

// ── Task ──────────────────────────────────────────────────────────

/// Lease state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Init,
    Claimed,
    Completed,
}

/// Why a task exists, surfaced to the claiming process as the message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Invoke,
    Resume,
    Notify,
}

/// A lease-based claim on one or more promises.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: TaskId,
    /// Optimistic concurrency token; bumped every time a lease is lost.
    pub counter: u64,
    pub state: TaskState,
    pub kind: TaskKind,
    pub root_promise_id: PromiseId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf_promise_id: Option<PromiseId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recv: Option<Recv>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<String>,
    /// Lease length in milliseconds.
    pub ttl: u64,
    /// Lease deadline (unix milliseconds) while claimed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
    pub timeout: u64,
    pub created_on: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_on: Option<u64>,
}

/// A promise attached to a claim message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromiseRef {
    pub id: PromiseId,
    pub data: PromiseRecord,
}

/// Promises handed to a process when it claims a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClaimedPromises {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PromiseRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf: Option<PromiseRef>,
}

/// Typed message produced by a successful claim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskMessage {
    pub kind: TaskKind,
    pub promises: ClaimedPromises,
}

// ── Schedule ──────────────────────────────────────────────────────

/// A recurring trigger that materializes promises from a template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    pub id: ScheduleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub cron: String,
    #[serde(default)]
    pub tags: Tags,
    /// Id pattern for materialized promises.
    pub promise_id: String,
    /// Relative timeout (milliseconds) applied to materialized promises.
    pub promise_timeout: u64,
    #[serde(default)]
    pub promise_param: PromiseValue,
    #[serde(default)]
    pub promise_tags: Tags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run_time: Option<u64>,
    pub created_on: u64,
}
