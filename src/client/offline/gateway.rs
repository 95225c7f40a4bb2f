//! # Submission Gateway
//!
//! Single entry point for every field write. The caller always gets an answer
//! without waiting on a dead network:
//!
//! - offline: queued at once, no network call
//! - online: one bounded attempt; confirmed on success, queued on a
//!   network-classified failure
//! - rejected by the server: returned as `SyncError::Validation`, never queued
//! - request could not be built: returned as `SyncError::Request`, never queued
//! - local store unavailable: returned as `SyncError::Storage`
//!
//! The record id is generated before the online attempt, so a write that
//! reached the server but lost its response is replayed later under the same
//! idempotency key.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::api_client::{ApiError, SiteApi, WriteRequest};
use crate::client::offline::queue::PendingWriteQueue;
use crate::client::sync::network_monitor::ConnectivityMonitor;
use crate::shared::error::SyncError;
use crate::shared::payload::WritePayload;
use crate::shared::record::{PendingRecord, RecordType};

/// Outcome of a submission
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitResult {
    /// The server applied the write
    Confirmed { server_record: Value },
    /// Saved offline; will sync
    Queued { id: Uuid },
}

impl SubmitResult {
    pub fn is_queued(&self) -> bool {
        matches!(self, SubmitResult::Queued { .. })
    }
}

pub struct SubmissionGateway {
    api: Arc<dyn SiteApi>,
    queue: Arc<PendingWriteQueue>,
    connectivity: ConnectivityMonitor,
    request_timeout: Duration,
}

impl std::fmt::Debug for SubmissionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionGateway")
            .field("online", &self.connectivity.is_online())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl SubmissionGateway {
    pub fn new(
        api: Arc<dyn SiteApi>,
        queue: Arc<PendingWriteQueue>,
        connectivity: ConnectivityMonitor,
        request_timeout: Duration,
    ) -> Self {
        Self {
            api,
            queue,
            connectivity,
            request_timeout,
        }
    }

    /// Submit a write
    pub async fn submit(&self, record_type: RecordType, payload: Value) -> Result<SubmitResult, SyncError> {
        let record = PendingRecord::new(record_type, payload);

        if !self.connectivity.is_online() {
            debug!(id = %record.id, record_type = %record_type, "offline, queuing without network attempt");
            return self.queue_record(record).await;
        }

        let request = WriteRequest::from(&record);
        match tokio::time::timeout(self.request_timeout, self.api.write(request)).await {
            Ok(Ok(ack)) => {
                info!(
                    id = %record.id,
                    record_type = %record_type,
                    replayed = ack.replayed,
                    "write confirmed online"
                );
                Ok(SubmitResult::Confirmed {
                    server_record: ack.record,
                })
            }
            Ok(Err(ApiError::Rejected { status, message })) => {
                warn!(id = %record.id, record_type = %record_type, status, "write rejected by server");
                Err(SyncError::validation(status, message))
            }
            Ok(Err(ApiError::InvalidRequest(message))) => {
                warn!(id = %record.id, record_type = %record_type, error = %message, "write could not be sent");
                Err(SyncError::request(message))
            }
            Ok(Err(ApiError::Transient(message))) => {
                debug!(id = %record.id, error = %message, "online attempt failed, queuing");
                self.queue_record(record).await
            }
            Err(_) => {
                debug!(id = %record.id, timeout = ?self.request_timeout, "online attempt timed out, queuing");
                self.queue_record(record).await
            }
        }
    }

    /// Serialize a typed payload and submit it
    pub async fn submit_payload<P: WritePayload>(&self, payload: &P) -> Result<SubmitResult, SyncError> {
        let value = serde_json::to_value(payload)?;
        self.submit(P::RECORD_TYPE, value).await
    }

    async fn queue_record(&self, record: PendingRecord) -> Result<SubmitResult, SyncError> {
        let id = self.queue.enqueue_record(record).await?;
        Ok(SubmitResult::Queued { id })
    }
}
