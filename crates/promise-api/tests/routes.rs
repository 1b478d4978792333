//! Route table tests against a recording stub engine.
//!
//! Each test checks the status code and body shape a route produces for a
//! canned engine answer, and the canonical request the route sent.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::*;
use promise_core::*;

#[tokio::test]
async fn search_promises_wraps_list_and_forwards_filter() {
    let engine = StubEngine::answering(SearchPromisesResponse {
        promises: vec![promise("order-1")],
    });

    let (status, body) = call_json(router(&engine), empty_request("GET", "/promises?id=order-*")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["promises"][0]["id"], "order-1");
    assert_eq!(
        engine.last_request(),
        Request::from(SearchPromisesRequest {
            id: Some("order-*".to_string())
        })
    );

    let (status, _) = call_json(router(&engine), empty_request("GET", "/promises")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        engine.last_request(),
        Request::from(SearchPromisesRequest::default())
    );
}

#[tokio::test]
async fn create_promise_returns_201_with_promise() {
    let engine = StubEngine::answering(CreatePromiseResponse {
        promise: promise("p1"),
    });
    let mut req = json_request(
        "POST",
        "/promises",
        json!({ "id": "p1", "timeout": 60000, "param": { "data": "aGk=" }, "tags": { "a": "b" } }),
    );
    req.headers_mut()
        .insert("idempotency-key", "ik-1".parse().unwrap());
    req.headers_mut().insert("strict", "true".parse().unwrap());

    let (status, body) = call_json(router(&engine), req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], "p1");
    assert_eq!(body["state"], "pending");

    let promise_core::Request::CreatePromise(sent) = engine.last_request() else {
        panic!("expected createPromise");
    };
    assert_eq!(sent.id, "p1");
    assert_eq!(sent.timeout, 60000);
    assert_eq!(sent.param.data.as_deref(), Some("aGk="));
    assert_eq!(sent.tags.get("a").map(String::as_str), Some("b"));
    assert_eq!(sent.i_key.as_deref(), Some("ik-1"));
    assert!(sent.strict);
}

#[tokio::test]
async fn strict_header_must_be_exactly_true() {
    for value in ["false", "TRUE", "True", "1"] {
        let engine = StubEngine::answering(CreatePromiseResponse {
            promise: promise("p1"),
        });
        let mut req = json_request("POST", "/promises", json!({ "id": "p1", "timeout": 1 }));
        req.headers_mut().insert("strict", value.parse().unwrap());
        call(router(&engine), req).await;

        let promise_core::Request::CreatePromise(sent) = engine.last_request() else {
            panic!("expected createPromise");
        };
        assert!(!sent.strict, "strict header {value:?}");
        assert_eq!(sent.i_key, None);
    }
}

#[tokio::test]
async fn create_promise_and_task_status_follows_task_presence() {
    let body = json!({
        "promise": { "id": "p1", "timeout": 60000 },
        "task": { "processId": "proc-1", "ttl": 5000 },
    });

    let with_task = StubEngine::answering(CreatePromiseAndTaskResponse {
        promise: promise("p1"),
        task: Some(task("__invoke:p1")),
    });
    let (status, json) =
        call_json(router(&with_task), json_request("POST", "/promises/task", body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["promise"]["id"], "p1");
    assert_eq!(json["task"]["id"], "__invoke:p1");

    let promise_core::Request::CreatePromiseAndTask(sent) = with_task.last_request() else {
        panic!("expected createPromiseAndTask");
    };
    assert_eq!(sent.task.process_id, "proc-1");
    assert_eq!(sent.task.ttl, 5000);

    let without_task = StubEngine::answering(CreatePromiseAndTaskResponse {
        promise: promise("p1"),
        task: None,
    });
    let (status, json) =
        call_json(router(&without_task), json_request("POST", "/promises/task", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["promise"]["id"], "p1");
    assert!(json.get("task").is_none());
}

#[tokio::test]
async fn read_promise_returns_promise() {
    let engine = StubEngine::answering(ReadPromiseResponse {
        promise: promise("p1"),
    });
    let (status, body) = call_json(router(&engine), empty_request("GET", "/promises/p1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "p1");
    assert_eq!(
        engine.last_request(),
        Request::from(ReadPromiseRequest {
            id: "p1".to_string()
        })
    );
}

#[tokio::test]
async fn complete_promise_normalizes_state_case() {
    for input in ["Resolved", "RESOLVED", "resolved"] {
        let mut done = promise("p1");
        done.state = PromiseState::Resolved;
        let engine = StubEngine::answering(CompletePromiseResponse { promise: done });

        let mut req = json_request(
            "PATCH",
            "/promises/p1",
            json!({ "state": input, "value": { "data": "ok" } }),
        );
        req.headers_mut()
            .insert("idempotency-key", "ck".parse().unwrap());

        let (status, body) = call_json(router(&engine), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "resolved");

        let promise_core::Request::CompletePromise(sent) = engine.last_request() else {
            panic!("expected completePromise");
        };
        assert_eq!(sent.id, "p1");
        assert_eq!(sent.state, CompletionState::Resolved);
        assert_eq!(sent.value.data.as_deref(), Some("ok"));
        assert_eq!(sent.i_key.as_deref(), Some("ck"));
        assert!(!sent.strict);
    }
}

#[tokio::test]
async fn complete_promise_accepts_canceled() {
    let engine = StubEngine::answering(CompletePromiseResponse {
        promise: promise("p1"),
    });
    let req = json_request("PATCH", "/promises/p1", json!({ "state": "REJECTED_CANCELED" }));
    let (status, _) = call(router(&engine), req).await;
    assert_eq!(status, StatusCode::OK);

    let promise_core::Request::CompletePromise(sent) = engine.last_request() else {
        panic!("expected completePromise");
    };
    assert_eq!(sent.state, CompletionState::RejectedCanceled);
}

#[tokio::test]
async fn unknown_completion_state_is_400_without_dispatch() {
    let engine = StubEngine::answering(CompletePromiseResponse {
        promise: promise("p1"),
    });
    let req = json_request("PATCH", "/promises/p1", json!({ "state": "finished" }));
    let (status, body) = call_json(router(&engine), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_state");
    assert!(engine.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn create_callback_returns_200_with_both_parts() {
    let engine = StubEngine::answering(CreateCallbackResponse {
        promise: promise("leaf"),
        callback: Some(callback("__resume:root:leaf", "leaf")),
    });
    let req = json_request(
        "POST",
        "/promises/callback/leaf",
        json!({ "rootPromiseId": "root", "timeout": 60000, "recv": "poll://default" }),
    );
    let (status, body) = call_json(router(&engine), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["promise"]["id"], "leaf");
    assert_eq!(body["callback"]["id"], "__resume:root:leaf");

    assert_eq!(
        engine.last_request(),
        Request::from(CreateCallbackRequest {
            promise_id: "leaf".to_string(),
            root_promise_id: "root".to_string(),
            timeout: 60000,
            recv: Recv::Address("poll://default".to_string()),
        })
    );
}

#[tokio::test]
async fn create_subscription_status_follows_callback_presence() {
    let body = json!({
        "id": "sub-1",
        "timeout": 60000,
        "recv": { "type": "http", "data": { "url": "http://localhost:9000" } },
    });

    let pending = StubEngine::answering(CreateSubscriptionResponse {
        promise: promise("p1"),
        callback: Some(callback("__notify:p1:sub-1", "p1")),
    });
    let (status, json) = call_json(
        router(&pending),
        json_request("POST", "/promises/subscribe/p1", body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["callback"]["id"], "__notify:p1:sub-1");

    let promise_core::Request::CreateSubscription(sent) = pending.last_request() else {
        panic!("expected createSubscription");
    };
    assert_eq!(sent.id, "sub-1");
    assert_eq!(sent.promise_id, "p1");
    assert_eq!(
        sent.recv,
        Recv::Descriptor {
            kind: "http".to_string(),
            data: json!({ "url": "http://localhost:9000" }),
        }
    );

    let mut done = promise("p1");
    done.state = PromiseState::Resolved;
    let completed = StubEngine::answering(CreateSubscriptionResponse {
        promise: done,
        callback: None,
    });
    let (status, json) = call_json(
        router(&completed),
        json_request("POST", "/promises/subscribe/p1", body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["promise"]["state"], "resolved");
    assert!(json.get("callback").is_none());
}

#[tokio::test]
async fn search_schedules_wraps_list() {
    let engine = StubEngine::answering(SearchSchedulesResponse {
        schedules: vec![schedule("nightly")],
    });
    let (status, body) =
        call_json(router(&engine), empty_request("GET", "/schedules?id=night*")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["schedules"][0]["id"], "nightly");
    assert_eq!(
        engine.last_request(),
        Request::from(SearchSchedulesRequest {
            id: Some("night*".to_string())
        })
    );
}

#[tokio::test]
async fn create_schedule_returns_200_and_ignores_strict() {
    let engine = StubEngine::answering(CreateScheduleResponse {
        schedule: schedule("nightly"),
    });
    let mut req = json_request(
        "POST",
        "/schedules",
        json!({
            "id": "nightly",
            "description": "every hour",
            "cron": "0 * * * *",
            "promiseId": "nightly.{{.timestamp}}",
            "promiseTimeout": 60000,
        }),
    );
    req.headers_mut()
        .insert("idempotency-key", "sk".parse().unwrap());
    req.headers_mut().insert("strict", "true".parse().unwrap());

    let (status, body) = call_json(router(&engine), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "nightly");
    assert_eq!(body["cron"], "0 * * * *");

    let promise_core::Request::CreateSchedule(sent) = engine.last_request() else {
        panic!("expected createSchedule");
    };
    assert_eq!(sent.description.as_deref(), Some("every hour"));
    assert_eq!(sent.promise_timeout, 60000);
    assert_eq!(sent.i_key.as_deref(), Some("sk"));
}

#[tokio::test]
async fn read_schedule_returns_schedule() {
    let engine = StubEngine::answering(ReadScheduleResponse {
        schedule: schedule("nightly"),
    });
    let (status, body) = call_json(router(&engine), empty_request("GET", "/schedules/nightly")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "nightly");
}

#[tokio::test]
async fn delete_schedule_is_204_with_empty_body() {
    let engine = StubEngine::answering(DeleteScheduleResponse {});
    let (status, body) = call(router(&engine), empty_request("DELETE", "/schedules/gone")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
    assert_eq!(
        engine.last_request(),
        Request::from(DeleteScheduleRequest {
            id: "gone".to_string()
        })
    );
}

#[tokio::test]
async fn claim_task_returns_typed_message() {
    let engine = StubEngine::answering(ClaimTaskResponse {
        message: TaskMessage {
            kind: TaskKind::Resume,
            promises: ClaimedPromises {
                root: Some(PromiseRef {
                    id: "root".to_string(),
                    data: promise("root"),
                }),
                leaf: Some(PromiseRef {
                    id: "leaf".to_string(),
                    data: promise("leaf"),
                }),
            },
        },
    });
    let req = json_request(
        "POST",
        "/tasks/claim",
        json!({ "id": "t1", "counter": 2, "processId": "proc-1", "ttl": 5000 }),
    );
    let (status, body) = call_json(router(&engine), req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["type"], "resume");
    assert_eq!(body["promises"]["root"]["id"], "root");
    assert_eq!(body["promises"]["leaf"]["data"]["id"], "leaf");

    assert_eq!(
        engine.last_request(),
        Request::from(ClaimTaskRequest {
            id: "t1".to_string(),
            counter: 2,
            process_id: "proc-1".to_string(),
            ttl: 5000,
        })
    );
}

#[tokio::test]
async fn complete_task_returns_201_with_task() {
    let mut done = task("t1");
    done.state = TaskState::Completed;
    let engine = StubEngine::answering(CompleteTaskResponse { task: done });
    let req = json_request("POST", "/tasks/complete", json!({ "id": "t1", "counter": 1 }));
    let (status, body) = call_json(router(&engine), req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], "t1");
    assert_eq!(body["state"], "completed");
}

#[tokio::test]
async fn heartbeat_returns_bare_count() {
    let engine = StubEngine::answering(HeartbeatTasksResponse { tasks_affected: 3 });
    let req = json_request("POST", "/tasks/heartbeat", json!({ "processId": "proc-1" }));
    let (status, body) = call(router(&engine), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"3");
    assert_eq!(
        engine.last_request(),
        Request::from(HeartbeatTasksRequest {
            process_id: "proc-1".to_string()
        })
    );
}

#[tokio::test]
async fn engine_errors_map_to_status_and_body() {
    let cases = [
        (EngineError::PromiseNotFound("p1".into()), StatusCode::NOT_FOUND),
        (EngineError::PromiseAlreadyExists("p1".into()), StatusCode::CONFLICT),
        (EngineError::PromiseAlreadyRejected("p1".into()), StatusCode::FORBIDDEN),
        (EngineError::Invalid("bad".into()), StatusCode::BAD_REQUEST),
        (EngineError::Stopped, StatusCode::SERVICE_UNAVAILABLE),
        (EngineError::Storage("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, expected) in cases {
        let code = err.code();
        let engine = StubEngine::failing(err);
        let (status, body) = call_json(router(&engine), empty_request("GET", "/promises/p1")).await;
        assert_eq!(status, expected, "{code}");
        assert_eq!(body["code"], code);
        assert!(body["error"].as_str().is_some_and(|m| !m.is_empty()));
    }
}

#[tokio::test]
async fn mismatched_engine_answer_is_500() {
    let engine = StubEngine::answering(DeleteScheduleResponse {});
    let (status, body) = call_json(router(&engine), empty_request("GET", "/promises/p1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "unexpected_response");
}

#[tokio::test]
async fn malformed_body_is_rejected_before_dispatch() {
    let engine = StubEngine::answering(CreatePromiseResponse {
        promise: promise("p1"),
    });
    let req = json_request("POST", "/promises", json!({ "timeout": "soon" }));
    let (status, _) = call(router(&engine), req).await;
    assert!(status.is_client_error());
    assert!(engine.requests.lock().unwrap().is_empty());
}
