//! Canonical engine messages.
//!
//! Every operation the engine understands is one variant of [`Request`] with
//! a matching variant of [`Response`]. Both enums are internally tagged with
//! `kind`, so the JSON form of a request is `{"kind": "createPromise", ...}`.
//!
//! Each request struct implements [`EngineRequest`], which names the response
//! struct it must be answered with. Callers that hold a concrete request type
//! therefore get a concrete response type back, and an engine answering with
//! the wrong kind is caught at the boundary instead of at formatting time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::*;

/// A request type with a statically known response type.
pub trait EngineRequest: Into<Request> + Send + 'static {
    /// The response struct this request is answered with.
    type Response: TryFrom<Response, Error = Response> + Send + 'static;

    /// Kind tag shared by the request and its response.
    const KIND: MessageKind;
}

/// Declares the closed set of message kinds.
///
/// For each kind this produces a `Request` variant, a `Response` variant, a
/// `MessageKind` variant, the `From`/`TryFrom` conversions between them, and
/// the `EngineRequest` binding.
macro_rules! messages {
    ($( $variant:ident ( $req:ident => $res:ident ) = $tag:literal ),+ $(,)?) => {
        /// Name of a message kind.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub enum MessageKind {
            $( $variant, )+
        }

        impl MessageKind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [MessageKind] = &[$( MessageKind::$variant, )+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( MessageKind::$variant => $tag, )+
                }
            }
        }

        /// A canonical request sent to the engine.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "kind", rename_all = "camelCase")]
        pub enum Request {
            $( $variant($req), )+
        }

        impl Request {
            pub fn kind(&self) -> MessageKind {
                match self {
                    $( Request::$variant(_) => MessageKind::$variant, )+
                }
            }
        }

        /// A response matching the kind of the request it answers.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "kind", rename_all = "camelCase")]
        pub enum Response {
            $( $variant($res), )+
        }

        impl Response {
            pub fn kind(&self) -> MessageKind {
                match self {
                    $( Response::$variant(_) => MessageKind::$variant, )+
                }
            }
        }

        $(
            impl From<$req> for Request {
                fn from(req: $req) -> Self {
                    Request::$variant(req)
                }
            }

            impl From<$res> for Response {
                fn from(res: $res) -> Self {
                    Response::$variant(res)
                }
            }

            impl TryFrom<Response> for $res {
                type Error = Response;

                fn try_from(res: Response) -> Result<Self, Response> {
                    match res {
                        Response::$variant(inner) => Ok(inner),
                        #[allow(unreachable_patterns)]
                        other => Err(other),
                    }
                }
            }

            impl EngineRequest for $req {
                type Response = $res;
                const KIND: MessageKind = MessageKind::$variant;
            }
        )+
    };
}

messages! {
    SearchPromises(SearchPromisesRequest => SearchPromisesResponse) = "searchPromises",
    CreatePromise(CreatePromiseRequest => CreatePromiseResponse) = "createPromise",
    CreatePromiseAndTask(CreatePromiseAndTaskRequest => CreatePromiseAndTaskResponse) = "createPromiseAndTask",
    ReadPromise(ReadPromiseRequest => ReadPromiseResponse) = "readPromise",
    CompletePromise(CompletePromiseRequest => CompletePromiseResponse) = "completePromise",
    CreateCallback(CreateCallbackRequest => CreateCallbackResponse) = "createCallback",
    CreateSubscription(CreateSubscriptionRequest => CreateSubscriptionResponse) = "createSubscription",
    SearchSchedules(SearchSchedulesRequest => SearchSchedulesResponse) = "searchSchedules",
    CreateSchedule(CreateScheduleRequest => CreateScheduleResponse) = "createSchedule",
    ReadSchedule(ReadScheduleRequest => ReadScheduleResponse) = "readSchedule",
    DeleteSchedule(DeleteScheduleRequest => DeleteScheduleResponse) = "deleteSchedule",
    ClaimTask(ClaimTaskRequest => ClaimTaskResponse) = "claimTask",
    CompleteTask(CompleteTaskRequest => CompleteTaskResponse) = "completeTask",
    HeartbeatTasks(HeartbeatTasksRequest => HeartbeatTasksResponse) = "heartbeatTasks",
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Promises ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPromisesRequest {
    /// Glob pattern over promise ids; `None` matches everything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPromisesResponse {
    pub promises: Vec<PromiseRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromiseRequest {
    pub id: PromiseId,
    pub param: PromiseValue,
    pub tags: Tags,
    pub timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i_key: Option<String>,
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromiseResponse {
    pub promise: PromiseRecord,
}

/// Promise half of a `createPromiseAndTask` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromiseCreate {
    pub id: PromiseId,
    pub timeout: u64,
    #[serde(default)]
    pub param: PromiseValue,
    #[serde(default)]
    pub tags: Tags,
}

/// Task half of a `createPromiseAndTask` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreate {
    pub process_id: String,
    pub ttl: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromiseAndTaskRequest {
    pub promise: PromiseCreate,
    pub task: TaskCreate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i_key: Option<String>,
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromiseAndTaskResponse {
    pub promise: PromiseRecord,
    /// Present only when the engine created a task for a new promise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadPromiseRequest {
    pub id: PromiseId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadPromiseResponse {
    pub promise: PromiseRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePromiseRequest {
    pub id: PromiseId,
    pub state: CompletionState,
    pub value: PromiseValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i_key: Option<String>,
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePromiseResponse {
    pub promise: PromiseRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallbackRequest {
    pub promise_id: PromiseId,
    pub root_promise_id: PromiseId,
    pub timeout: u64,
    pub recv: Recv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallbackResponse {
    pub promise: PromiseRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<CallbackRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub id: String,
    pub promise_id: PromiseId,
    pub timeout: u64,
    pub recv: Recv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionResponse {
    pub promise: PromiseRecord,
    /// Absent when the promise was already completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<CallbackRecord>,
}

// ── Schedules ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSchedulesRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSchedulesResponse {
    pub schedules: Vec<ScheduleRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    pub id: ScheduleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleResponse {
    pub schedule: ScheduleRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadScheduleRequest {
    pub id: ScheduleId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadScheduleResponse {
    pub schedule: ScheduleRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteScheduleRequest {
    pub id: ScheduleId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteScheduleResponse {}

// ── Tasks ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimTaskRequest {
    pub id: TaskId,
    pub counter: u64,
    pub process_id: String,
    pub ttl: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimTaskResponse {
    pub message: TaskMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTaskRequest {
    pub id: TaskId,
    pub counter: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTaskResponse {
    pub task: TaskRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatTasksRequest {
    pub process_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatTasksResponse {
    pub tasks_affected: u64,
}
