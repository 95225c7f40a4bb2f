//! Scripted `SiteApi` for unit tests

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::client::api_client::{ApiError, ServerAck, SiteApi, WriteRequest};

#[derive(Debug, Default)]
pub(crate) struct FakeApi {
    replies: Mutex<VecDeque<Result<ServerAck, ApiError>>>,
    fetches: Mutex<VecDeque<Result<Value, ApiError>>>,
    calls: Mutex<Vec<WriteRequest>>,
    fetch_calls: Mutex<usize>,
    delay: Option<Duration>,
}

impl FakeApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every write sleeps this long before answering
    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Next write answers `reply`; unscripted writes are accepted
    pub(crate) fn push(&self, reply: Result<ServerAck, ApiError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub(crate) fn push_fetch(&self, reply: Result<Value, ApiError>) {
        self.fetches.lock().unwrap().push_back(reply);
    }

    pub(crate) fn calls(&self) -> Vec<WriteRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn fetch_count(&self) -> usize {
        *self.fetch_calls.lock().unwrap()
    }
}

#[async_trait]
impl SiteApi for FakeApi {
    async fn write(&self, request: WriteRequest) -> Result<ServerAck, ApiError> {
        let id = request.idempotency_key;
        self.calls.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.replies.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(ServerAck {
                record: json!({"id": id.to_string()}),
                replayed: false,
            })
        })
    }

    async fn fetch(&self, _path: &str) -> Result<Value, ApiError> {
        *self.fetch_calls.lock().unwrap() += 1;
        let scripted = self.fetches.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Err(ApiError::Transient("no scripted fetch".to_string())))
    }
}
