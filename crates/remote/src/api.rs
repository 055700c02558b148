//! REST wrapper for the remote executor endpoints.
//!
//! Only speaks HTTP: it knows the two endpoints and how error bodies are
//! shaped, but not what a failure means for the job. That classification
//! lives in [`crate::client`].

use std::time::Duration;

use rexec_core::types::JobId;
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::messages::{error_message, RemoteJobInfo, RemoteSubmission};

/// HTTP client for one remote executor.
#[derive(Debug, Clone)]
pub struct RemoteExecutorApi {
    client: reqwest::Client,
    base: reqwest::Url,
    base_url: String,
}

impl RemoteExecutorApi {
    /// Create an API client for the executor at `base_url`.
    ///
    /// * `request_timeout` - per-request limit; `None` waits indefinitely,
    ///   which synchronous executions of long jobs may need.
    pub fn new(base_url: &str, request_timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        Self::with_client(builder.build()?, base_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (connection pooling across processors).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, ApiError> {
        let parsed = reqwest::Url::parse(base_url).map_err(|e| ApiError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(Self {
            client,
            base: parsed,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit a job.
    ///
    /// Sends `POST /execute` and returns the raw success body. In
    /// synchronous mode that body is the terminal job info; in
    /// asynchronous mode it is only an acknowledgement.
    pub async fn submit(&self, submission: &RemoteSubmission<'_>) -> Result<String, ApiError> {
        let response = self
            .client
            .post(self.endpoint(&["execute"])?)
            .json(submission)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.text().await?)
    }

    /// Fetch the current status of a job via `GET /job_info/{job_id}`.
    pub async fn job_info(&self, job_id: &JobId) -> Result<RemoteJobInfo, ApiError> {
        let response = self
            .client
            .get(self.endpoint(&["job_info", job_id.as_str()])?)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;
        decode(&body)
    }

    // ---- private helpers ----

    /// Append path segments to the base URL, percent-encoding each one so
    /// a job id can never change the path or add a query.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, ApiError> {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl {
                url: self.base_url.clone(),
                reason: "URL cannot carry a path".into(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Return the response unchanged on a 2xx status, otherwise an
    /// [`ApiError::Status`] carrying the extracted message.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(status, &body),
        })
    }
}

/// Parse a success body into the expected type.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use rexec_core::types::ExecutionMode;
    use rexec_testkit::{FakeExecutor, Reply};
    use serde_json::{json, Map};

    use super::*;

    #[test]
    fn rejects_unparseable_url() {
        assert_matches!(
            RemoteExecutorApi::new("not a url", None),
            Err(ApiError::InvalidUrl { .. })
        );
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert_matches!(
            RemoteExecutorApi::new("ftp://executor.local/", None),
            Err(ApiError::InvalidUrl { reason, .. }) if reason.contains("ftp")
        );
    }

    #[test]
    fn trims_trailing_slash() {
        let api = RemoteExecutorApi::new("http://executor.local:5000/api/", None).unwrap();
        assert_eq!(api.base_url(), "http://executor.local:5000/api");
    }

    #[tokio::test]
    async fn submit_posts_json_envelope() {
        let server = FakeExecutor::start(Reply::json(200, json!({"accepted": true})), vec![]).await;
        let api = RemoteExecutorApi::new(&server.base_url(), None).unwrap();

        let job_id = JobId::parse("abc123").unwrap();
        let mut params = Map::new();
        params.insert("-sw".into(), json!("sw.data"));

        let body = api
            .submit(&RemoteSubmission::new(&job_id, ExecutionMode::Synchronous, &params))
            .await
            .unwrap();
        assert_eq!(body, r#"{"accepted":true}"#);

        let submitted = server.submissions();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].content_type.as_deref(), Some("application/json"));
        assert_eq!(
            submitted[0].body,
            json!({
                "application_params": { "job_id": "abc123", "synch_execution": true },
                "code_input_params": { "-sw": "sw.data" },
            })
        );
    }

    #[tokio::test]
    async fn submit_surfaces_message_field() {
        let server =
            FakeExecutor::start(Reply::json(400, json!({"Message": "bad params"})), vec![]).await;
        let api = RemoteExecutorApi::new(&server.base_url(), None).unwrap();
        let job_id = JobId::parse("abc123").unwrap();
        let params = Map::new();

        let err = api
            .submit(&RemoteSubmission::new(&job_id, ExecutionMode::Synchronous, &params))
            .await
            .unwrap_err();
        assert_matches!(err, ApiError::Status { status: 400, message } if message == "bad params");
    }

    #[tokio::test]
    async fn job_info_hits_job_path() {
        let server = FakeExecutor::start(
            Reply::json(200, json!({})),
            vec![Reply::json(
                200,
                json!({"job_id": "abc123", "job_info": {"end_processing": true, "exit_code": 0}}),
            )],
        )
        .await;
        let api = RemoteExecutorApi::new(&server.base_url(), None).unwrap();

        let info = api.job_info(&JobId::parse("abc123").unwrap()).await.unwrap();
        assert!(info.is_finished());
        assert_eq!(server.polled_ids(), vec!["abc123".to_string()]);
    }

    #[test]
    fn endpoints_keep_base_path() {
        let api = RemoteExecutorApi::new("http://executor.local:5000/api/", None).unwrap();
        assert_eq!(
            api.endpoint(&["execute"]).unwrap().as_str(),
            "http://executor.local:5000/api/execute"
        );

        let api = RemoteExecutorApi::new("http://executor.local:5000", None).unwrap();
        assert_eq!(
            api.endpoint(&["job_info", "abc123"]).unwrap().as_str(),
            "http://executor.local:5000/job_info/abc123"
        );
    }

    #[test]
    fn job_id_is_escaped_in_path() {
        let api = RemoteExecutorApi::new("http://executor.local:5000/", None).unwrap();
        assert_eq!(
            api.endpoint(&["job_info", "run?1#a b%"]).unwrap().as_str(),
            "http://executor.local:5000/job_info/run%3F1%23a%20b%25"
        );
    }

    #[tokio::test]
    async fn job_info_with_reserved_characters_polls_own_job() {
        let server = FakeExecutor::start(
            Reply::json(200, json!({})),
            vec![Reply::job_info("run?1", true, 0, "")],
        )
        .await;
        let api = RemoteExecutorApi::new(&server.base_url(), None).unwrap();

        api.job_info(&JobId::parse("run?1").unwrap()).await.unwrap();
        api.job_info(&JobId::parse("run #2%").unwrap()).await.unwrap();

        assert_eq!(server.polled_ids(), vec!["run?1", "run #2%"]);
    }

    #[tokio::test]
    async fn job_info_rejects_malformed_body() {
        let server =
            FakeExecutor::start(Reply::json(200, json!({})), vec![Reply::text(200, "ok")]).await;
        let api = RemoteExecutorApi::new(&server.base_url(), None).unwrap();

        let err = api.job_info(&JobId::parse("abc123").unwrap()).await.unwrap_err();
        assert_matches!(err, ApiError::Decode(_));
    }
}
