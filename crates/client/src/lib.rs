// crates/client/src/lib.rs
//! Client for pushing progress to a headway server.
//!
//! Every call is a single `PUT` with no retry. A transport failure or any
//! status other than `200 OK` comes back as a [`ClientError`]; whether to
//! retry is up to the caller.
//!
//! ```no_run
//! # async fn run() -> Result<(), headway_client::ClientError> {
//! let client = headway_client::HeadwayClient::new("http://localhost:7777", "my-secret");
//! for i in 0..=100 {
//!     client.send(i as f64, 100.0, "resize-images", "batch 3").await?;
//! }
//! client.message("resize-images finished").await?;
//! # Ok(())
//! # }
//! ```

use reqwest::StatusCode;
use thiserror::Error;

/// Path of the ingest endpoint, relative to the server's base URL.
pub const PROGRESS_PATH: &str = "/api/progress";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    Status(StatusCode),
}

/// Handle to one headway server, authenticated with one secret.
#[derive(Debug, Clone)]
pub struct HeadwayClient {
    host: String,
    secret: String,
    http: reqwest::Client,
}

impl HeadwayClient {
    /// `host` is the server's base URL, e.g. `http://localhost:7777`.
    pub fn new(host: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::with_http_client(host, secret, reqwest::Client::new())
    }

    pub fn with_http_client(
        host: impl Into<String>,
        secret: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        let host = host.into().trim_end_matches('/').to_string();
        Self {
            host,
            secret: secret.into(),
            http,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.host, PROGRESS_PATH)
    }

    /// Report `current` out of `total` units done for task `name`.
    pub async fn send(
        &self,
        current: f64,
        total: f64,
        name: &str,
        comment: &str,
    ) -> Result<(), ClientError> {
        let current = current.to_string();
        let total = total.to_string();
        self.put(&[
            ("name", name),
            ("current", &current),
            ("total", &total),
            ("comment", comment),
            ("secret", &self.secret),
        ])
        .await
    }

    /// Send a free-text message to the owner of this client's secret.
    pub async fn message(&self, message: &str) -> Result<(), ClientError> {
        self.put(&[("message", message), ("secret", &self.secret)])
            .await
    }

    async fn put(&self, query: &[(&str, &str)]) -> Result<(), ClientError> {
        let response = self.http.put(self.endpoint()).query(query).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            tracing::debug!(status = %status, "headway server rejected update");
            return Err(ClientError::Status(status));
        }
        Ok(())
    }
}
