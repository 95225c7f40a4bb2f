//! # Field API Client
//!
//! The server side of the offline engine, seen from the device. `SiteApi` is
//! the seam the submission gateway and the reconciler talk to; `HttpSiteApi`
//! is the reqwest implementation against the REST endpoints.
//!
//! ## Response classification
//!
//! | Answer                          | Outcome                        |
//! |---------------------------------|--------------------------------|
//! | 2xx                             | confirmed                      |
//! | 409 (idempotency key applied)   | confirmed, `replayed = true`   |
//! | 408, 429, 5xx                   | `ApiError::Transient`          |
//! | other 4xx                       | `ApiError::Rejected`           |
//! | timeout, refused, reset         | `ApiError::Transient`          |
//! | request could not be built      | `ApiError::InvalidRequest`     |

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::config::Config;
use crate::shared::error::SyncError;
use crate::shared::payload::AttendanceAction;
use crate::shared::record::{PendingRecord, RecordType};

/// Header carrying the client-generated record id
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Path probed to confirm the server is reachable
pub const HEALTH_PATH: &str = "/api/health";

/// One write presented to the server
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub idempotency_key: Uuid,
    pub record_type: RecordType,
    pub payload: Value,
}

impl From<&PendingRecord> for WriteRequest {
    fn from(record: &PendingRecord) -> Self {
        Self {
            idempotency_key: record.id,
            record_type: record.record_type,
            payload: record.payload.clone(),
        }
    }
}

/// Server confirmation of a write
#[derive(Debug, Clone, PartialEq)]
pub struct ServerAck {
    /// Canonical server record; `Null` when the server sent none
    pub record: Value,
    /// The idempotency key had already been applied
    pub replayed: bool,
}

/// Transport-level classification of a failed call
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<ApiError> for SyncError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Transient(message) => SyncError::transient(message),
            ApiError::Rejected { status, message } => SyncError::validation(status, message),
            ApiError::InvalidRequest(message) => SyncError::request(message),
        }
    }
}

/// Classify a reqwest send failure
///
/// Builder errors (bad URL, header or body) never reached the network.
pub fn classify_send_error(err: &reqwest::Error) -> ApiError {
    if err.is_builder() {
        ApiError::InvalidRequest(err.to_string())
    } else {
        ApiError::Transient(format!("Network error: {}", err))
    }
}

/// Server write/read interface consumed by the engine
#[async_trait]
pub trait SiteApi: Send + Sync {
    /// Apply one write; must treat a repeated idempotency key as a no-op
    async fn write(&self, request: WriteRequest) -> Result<ServerAck, ApiError>;

    /// Read a read-mostly resource (e.g. an AI risk assessment)
    async fn fetch(&self, path: &str) -> Result<Value, ApiError>;

    /// Whether the server answers at all
    async fn ping(&self) -> bool {
        true
    }
}

/// Server path for a write
pub fn endpoint_path(record_type: RecordType, payload: &Value) -> String {
    match record_type {
        RecordType::Attendance => {
            let action = payload
                .get("action")
                .cloned()
                .and_then(|a| serde_json::from_value::<AttendanceAction>(a).ok())
                .unwrap_or(AttendanceAction::CheckIn);
            format!("/api/attendance/{}", action.endpoint_segment())
        }
        RecordType::MaterialRequest => "/api/material-requests".to_string(),
        RecordType::Dpr => "/api/dpr".to_string(),
        RecordType::Approval => "/api/approvals".to_string(),
    }
}

/// Map a server answer to an outcome
pub fn classify_response(status: StatusCode, body: &str) -> Result<ServerAck, ApiError> {
    let parsed = serde_json::from_str::<Value>(body).ok();

    if status.is_success() {
        return Ok(ServerAck {
            record: parsed.unwrap_or(Value::Null),
            replayed: false,
        });
    }

    if status == StatusCode::CONFLICT {
        let record = parsed
            .as_ref()
            .and_then(|v| v.get("record").cloned())
            .unwrap_or(Value::Null);
        return Ok(ServerAck {
            record,
            replayed: true,
        });
    }

    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message").or_else(|| v.get("error")))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            }
        });

    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        return Err(ApiError::Transient(format!("{} - {}", status, message)));
    }

    Err(ApiError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// reqwest implementation of `SiteApi`
#[derive(Debug, Clone)]
pub struct HttpSiteApi {
    config: Config,
    client: Client,
}

impl HttpSiteApi {
    pub fn new(config: Config) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(config.sync().request_timeout)
            .connect_timeout(config.sync().request_timeout)
            .build()
            .map_err(|e| SyncError::transient(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.get_token() {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }
}

#[async_trait]
impl SiteApi for HttpSiteApi {
    async fn write(&self, request: WriteRequest) -> Result<ServerAck, ApiError> {
        let url = self
            .config
            .api_url(&endpoint_path(request.record_type, &request.payload));

        let response = self
            .authorize(self.client.post(&url))
            .header(IDEMPOTENCY_HEADER, request.idempotency_key.to_string())
            .json(&request.payload)
            .send()
            .await
            .map_err(|e| classify_send_error(&e))?;

        let status = response.status();
        // Once the server answered 2xx the write is applied; a broken body does not change that.
        let body = response.text().await.unwrap_or_default();
        let outcome = classify_response(status, &body);

        match &outcome {
            Ok(ack) => debug!(
                id = %request.idempotency_key,
                record_type = %request.record_type,
                replayed = ack.replayed,
                "write confirmed"
            ),
            Err(e) => warn!(
                id = %request.idempotency_key,
                record_type = %request.record_type,
                error = %e,
                "write not confirmed"
            ),
        }
        outcome
    }

    async fn fetch(&self, path: &str) -> Result<Value, ApiError> {
        let url = self.config.api_url(path);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| classify_send_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transient(format!("Failed to read body: {}", e)))?;

        if status == StatusCode::CONFLICT {
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }
        let ack = classify_response(status, &body)?;
        Ok(ack.record)
    }

    async fn ping(&self) -> bool {
        let url = self.config.api_url(HEALTH_PATH);
        match self.client.head(&url).send().await {
            Ok(response) => !response.status().is_server_error(),
            Err(e) => {
                debug!(error = %e, "health probe failed");
                false
            }
        }
    }
}
