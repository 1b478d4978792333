//! Recording stub engine shared by the router and lifecycle suites.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use promise_api::build_router;
use promise_core::*;
use promise_engine::{Callback, Engine};

type Responder = Box<dyn Fn(&promise_core::Request) -> EngineResult<Response> + Send + Sync>;

/// Engine answering every request through a canned responder.
pub struct StubEngine {
    responder: Responder,
    pub requests: Mutex<Vec<promise_core::Request>>,
    pub events: Mutex<Vec<String>>,
    /// When set, `stop` probes this address and records whether it still
    /// accepts connections.
    pub probe: Mutex<Option<SocketAddr>>,
}

impl StubEngine {
    pub fn new(
        responder: impl Fn(&promise_core::Request) -> EngineResult<Response> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            probe: Mutex::new(None),
        })
    }

    /// Stub that answers every request with `response`.
    pub fn answering(response: impl Into<Response>) -> Arc<Self> {
        let response = response.into();
        Self::new(move |_| Ok(response.clone()))
    }

    pub fn failing(err: EngineError) -> Arc<Self> {
        Self::new(move |_| Err(err.clone()))
    }

    pub fn last_request(&self) -> promise_core::Request {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("engine received no request")
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Engine for StubEngine {
    fn send(&self, request: promise_core::Request, mut callback: Callback) {
        let outcome = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        self.events.lock().unwrap().push("send".to_string());
        callback(outcome);
    }

    fn stop(&self) {
        let mut events = self.events.lock().unwrap();
        if let Some(addr) = *self.probe.lock().unwrap() {
            let open = TcpStream::connect(addr).is_ok();
            events.push(format!("listener_open={open}"));
        }
        events.push("stop".to_string());
    }
}

/// Engine that holds every callback until it is stopped, then fails them
/// all with [`EngineError::Stopped`].
#[derive(Default)]
pub struct ParkingEngine {
    parked: Mutex<Vec<Callback>>,
}

impl ParkingEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn parked(&self) -> usize {
        self.parked.lock().unwrap().len()
    }
}

impl Engine for ParkingEngine {
    fn send(&self, _request: promise_core::Request, callback: Callback) {
        self.parked.lock().unwrap().push(callback);
    }

    fn stop(&self) {
        let parked = std::mem::take(&mut *self.parked.lock().unwrap());
        for mut callback in parked {
            callback(Err(EngineError::Stopped));
        }
    }
}

pub fn router(engine: &Arc<StubEngine>) -> Router {
    build_router(engine.clone())
}

/// Drive one request through the router; returns status and raw body.
pub async fn call(router: Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

/// Like [`call`], parsing the body as JSON.
pub async fn call_json(router: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, body) = call(router, req).await;
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn promise(id: &str) -> PromiseRecord {
    PromiseRecord {
        id: id.to_string(),
        state: PromiseState::Pending,
        param: PromiseValue::default(),
        value: PromiseValue::default(),
        timeout: 60_000,
        tags: HashMap::new(),
        idempotency_key_for_create: None,
        idempotency_key_for_complete: None,
        created_on: 1000,
        completed_on: None,
    }
}

pub fn task(id: &str) -> TaskRecord {
    TaskRecord {
        id: id.to_string(),
        counter: 1,
        state: TaskState::Claimed,
        kind: TaskKind::Invoke,
        root_promise_id: "p1".to_string(),
        leaf_promise_id: None,
        recv: None,
        process_id: Some("proc-1".to_string()),
        ttl: 5000,
        expiry: Some(6000),
        timeout: 60_000,
        created_on: 1000,
        completed_on: None,
    }
}

pub fn callback(id: &str, promise_id: &str) -> CallbackRecord {
    CallbackRecord {
        id: id.to_string(),
        promise_id: promise_id.to_string(),
        root_promise_id: "root".to_string(),
        recv: Recv::Address("poll://default".to_string()),
        timeout: 60_000,
        created_on: 1000,
    }
}

pub fn schedule(id: &str) -> ScheduleRecord {
    ScheduleRecord {
        id: id.to_string(),
        description: None,
        cron: "0 * * * *".to_string(),
        tags: HashMap::new(),
        promise_id: format!("{id}.{{{{.timestamp}}}}"),
        promise_timeout: 60_000,
        promise_param: PromiseValue::default(),
        promise_tags: HashMap::new(),
        idempotency_key: None,
        last_run_time: None,
        next_run_time: None,
        created_on: 1000,
    }
}
