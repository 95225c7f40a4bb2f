//! Common test utilities and helpers
//!
//! - A scripted in-memory field server implementing `SiteApi`
//! - On-disk device fixtures with simulated restarts

pub mod scripted_api;

// Re-export commonly used utilities
pub use device::*;
pub use scripted_api::*;
