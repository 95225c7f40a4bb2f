//! SiteSync - Offline-first write engine for construction field apps
//!
//! Field engineers check in, raise material requests, file daily progress
//! reports and approve requests from sites with unreliable connectivity.
//! SiteSync makes every such write either confirmed by the server or durably
//! queued on the device, and replays the queue exactly once when the network
//! returns.
//!
//! # Module Structure
//!
//! - **`shared`** - Platform-agnostic types
//!   - `PendingRecord`, record types and statuses
//!   - Typed write payloads
//!   - Error taxonomy and configuration
//!
//! - **`client`** - The device-side engine
//!   - Durable local store (SQLite)
//!   - Pending write queue, submission gateway, reconciler
//!   - Connectivity monitor and background sync service
//!   - HTTP client for the field API
//!
//! - **`logging`** - Tracing subscriber setup for binaries
//!
//! # Usage
//!
//! ```rust,no_run
//! use sitesync::client::{Config, HttpSiteApi, OfflineEngine, SyncService};
//! use sitesync::shared::DprPayload;
//! use std::sync::Arc;
//!
//! # async fn example(report: DprPayload) -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let api = Arc::new(HttpSiteApi::new(config.clone())?);
//! let engine = OfflineEngine::open(config.sync(), api).await?;
//!
//! let service = SyncService::new(&engine, config.sync().drain_interval);
//! service.start().await;
//!
//! // Platform connectivity callback
//! engine.connectivity().report(true);
//!
//! // "Saved offline, will sync" or confirmed
//! let result = engine.gateway().submit_payload(&report).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! - Network failures are absorbed: the caller sees "queued"
//! - Server rejections (4xx) and local storage failures are always returned
//! - Error types live in `shared::error` and `shared::config`

/// Shared types and data structures
pub mod shared;

/// Device-side offline engine
pub mod client;

pub mod logging;
