//! In-process stand-in for the remote executor.
//!
//! [`FakeExecutor`] serves `POST /execute` and `GET /job_info/{job_id}`
//! on a loopback port with scripted replies, and records what it saw so
//! tests can assert on request bodies and poll timing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

/// A scripted HTTP reply.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub content_type: &'static str,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            content_type: "application/json",
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            content_type: "text/plain",
        }
    }

    /// A 200 job-info document.
    pub fn job_info(job_id: &str, end_processing: bool, exit_code: i64, std_err: &str) -> Self {
        Self::job_info_with_params(job_id, end_processing, exit_code, std_err, json!({}))
    }

    pub fn job_info_with_params(
        job_id: &str,
        end_processing: bool,
        exit_code: i64,
        std_err: &str,
        params: Value,
    ) -> Self {
        Self::json(
            200,
            json!({
                "job_id": job_id,
                "job_info": {
                    "end_processing": end_processing,
                    "exit_code": exit_code,
                    "std_err": std_err,
                    "params": params,
                }
            }),
        )
    }

    /// A 200 job-info document for a job that is still running.
    pub fn running(job_id: &str) -> Self {
        Self::job_info(job_id, false, 0, "")
    }
}

/// A recorded `POST /execute` request.
#[derive(Debug, Clone)]
pub struct Submission {
    pub content_type: Option<String>,
    pub body: Value,
    pub received_at: Instant,
}

#[derive(Debug)]
struct Script {
    submit_reply: Reply,
    poll_replies: Vec<Reply>,
    submissions: Vec<Submission>,
    polls: Vec<(String, Instant)>,
}

type Shared = Arc<Mutex<Script>>;

/// Loopback HTTP server imitating the remote executor.
///
/// Poll replies are served in order; once exhausted the last one repeats.
/// With no poll replies every status check answers 404. The server stops
/// when the value is dropped.
pub struct FakeExecutor {
    addr: SocketAddr,
    script: Shared,
    task: JoinHandle<()>,
}

impl FakeExecutor {
    pub async fn start(submit_reply: Reply, poll_replies: Vec<Reply>) -> Self {
        let script = Arc::new(Mutex::new(Script {
            submit_reply,
            poll_replies,
            submissions: Vec::new(),
            polls: Vec::new(),
        }));

        let app = Router::new()
            .route("/execute", post(execute))
            .route("/job_info/{job_id}", get(job_info))
            .with_state(script.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback listener");
        let addr = listener.local_addr().expect("listener address");
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake executor server");
        });

        Self { addr, script, task }
    }

    /// Base URL with a trailing slash, as operators usually configure it.
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.script.lock().expect("script lock").submissions.clone()
    }

    /// Job ids requested from `job_info`, in order.
    pub fn polled_ids(&self) -> Vec<String> {
        self.poll_log().into_iter().map(|(id, _)| id).collect()
    }

    /// Arrival times of `job_info` requests, in order.
    pub fn poll_times(&self) -> Vec<Instant> {
        self.poll_log().into_iter().map(|(_, at)| at).collect()
    }

    pub fn poll_count(&self) -> usize {
        self.script.lock().expect("script lock").polls.len()
    }

    fn poll_log(&self) -> Vec<(String, Instant)> {
        self.script.lock().expect("script lock").polls.clone()
    }
}

impl Drop for FakeExecutor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A base URL nothing is listening on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback listener");
    let addr = listener.local_addr().expect("listener address");
    drop(listener);
    format!("http://{addr}/")
}

async fn execute(State(script): State<Shared>, headers: HeaderMap, body: Bytes) -> Response {
    let reply = {
        let mut script = script.lock().expect("script lock");
        script.submissions.push(Submission {
            content_type: headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body: serde_json::from_slice(&body).unwrap_or(Value::Null),
            received_at: Instant::now(),
        });
        script.submit_reply.clone()
    };
    respond(reply)
}

async fn job_info(State(script): State<Shared>, Path(job_id): Path<String>) -> Response {
    let reply = {
        let mut script = script.lock().expect("script lock");
        let index = script.polls.len();
        script.polls.push((job_id, Instant::now()));
        match script.poll_replies.len() {
            0 => Reply::json(404, json!({ "Message": "Unknown job" })),
            n => script.poll_replies[index.min(n - 1)].clone(),
        }
    };
    respond(reply)
}

fn respond(reply: Reply) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, reply.content_type)], reply.body).into_response()
}
