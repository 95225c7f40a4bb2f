//! Device-side offline engine
//!
//! # Architecture
//!
//! - **`config`** - Client configuration (server URL, token, env overrides)
//! - **`local_db`** - Durable local store on SQLite
//! - **`api_client`** - Server write/read interface and its HTTP implementation
//! - **`offline`** - Pending write queue, submission gateway, reconciler, result cache
//! - **`sync`** - Connectivity monitor and the background drain loop
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── mod.rs          - Module exports and documentation
//! ├── config.rs       - Configuration management
//! ├── api_client.rs   - SiteApi trait, reqwest client
//! ├── local_db/       - SQLite store, schema, collections
//! ├── offline/        - Queue, gateway, reconciler, retry, cache
//! └── sync/           - Connectivity, scheduler, service, metrics
//! ```

pub mod api_client;
pub mod config;
pub mod local_db;
pub mod offline;
pub mod sync;

// Re-export commonly used types
pub use api_client::{ApiError, HttpSiteApi, ServerAck, SiteApi, WriteRequest};
pub use config::Config;
pub use local_db::{Collection, LocalDatabase};
pub use offline::{
    DrainReport, OfflineEngine, PendingWriteQueue, Reconciler, ResultCache, RetryPolicy, SubmissionGateway,
    SubmitResult,
};
pub use sync::{ConnectivityMonitor, SyncService, SyncStatus};
