//! Scripted field server
//!
//! Applies writes idempotently by key, like the real endpoints, and lets a
//! test decide the answer to each call in order.

use async_trait::async_trait;
use serde_json::{json, Value};
use sitesync::client::api_client::{ApiError, ServerAck, SiteApi, WriteRequest};
use sitesync::client::sync::ConnectivityMonitor;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use uuid::Uuid;

/// Answer to one write call
#[derive(Debug, Clone)]
pub enum Reply {
    /// Apply and confirm
    Accept,
    /// Do not apply; answer with this error
    Fail(ApiError),
    /// Apply, then lose the response on the way back
    ApplyButLoseResponse,
}

#[derive(Debug, Default)]
pub struct ScriptedApi {
    replies: Mutex<VecDeque<Reply>>,
    applied: Mutex<BTreeMap<Uuid, Value>>,
    calls: Mutex<Vec<WriteRequest>>,
    offline_after: Mutex<Option<(usize, ConnectivityMonitor)>>,
    reachable: Mutex<bool>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            reachable: Mutex::new(true),
            ..Self::default()
        }
    }

    pub fn script(&self, replies: impl IntoIterator<Item = Reply>) {
        self.replies.lock().unwrap().extend(replies);
    }

    /// Report the device offline once `calls` writes have been answered
    pub fn go_offline_after(&self, calls: usize, connectivity: ConnectivityMonitor) {
        *self.offline_after.lock().unwrap() = Some((calls, connectivity));
    }

    pub fn set_reachable(&self, reachable: bool) {
        *self.reachable.lock().unwrap() = reachable;
    }

    pub fn calls(&self) -> Vec<WriteRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Idempotency keys in call order
    pub fn call_keys(&self) -> Vec<Uuid> {
        self.calls().iter().map(|c| c.idempotency_key).collect()
    }

    /// Canonical server records, one per applied key
    pub fn applied(&self) -> BTreeMap<Uuid, Value> {
        self.applied.lock().unwrap().clone()
    }

    fn apply(&self, request: &WriteRequest) -> ServerAck {
        let mut applied = self.applied.lock().unwrap();
        if let Some(existing) = applied.get(&request.idempotency_key) {
            return ServerAck {
                record: existing.clone(),
                replayed: true,
            };
        }
        let record = json!({
            "id": applied.len() + 1,
            "type": request.record_type.as_str(),
            "body": request.payload,
        });
        applied.insert(request.idempotency_key, record.clone());
        ServerAck {
            record,
            replayed: false,
        }
    }

    fn after_call(&self) {
        let count = self.call_count();
        if let Some((limit, connectivity)) = self.offline_after.lock().unwrap().as_ref() {
            if count >= *limit {
                connectivity.report(false);
            }
        }
    }
}

#[async_trait]
impl SiteApi for ScriptedApi {
    async fn write(&self, request: WriteRequest) -> Result<ServerAck, ApiError> {
        self.calls.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Accept);

        let outcome = match reply {
            Reply::Accept => Ok(self.apply(&request)),
            Reply::Fail(error) => Err(error),
            Reply::ApplyButLoseResponse => {
                self.apply(&request);
                Err(ApiError::Transient("connection reset".to_string()))
            }
        };
        self.after_call();
        outcome
    }

    async fn fetch(&self, path: &str) -> Result<Value, ApiError> {
        Ok(json!({ "path": path }))
    }

    async fn ping(&self) -> bool {
        *self.reachable.lock().unwrap()
    }
}
