//! Inventory collectors: read-only queries against the host's service
//! manager or container engine.
//!
//! Collection fails soft: a resource whose status query errors is recorded
//! as bad rather than omitted, so a transient query failure still surfaces
//! as a visible state change. Only a failure of the whole pass (engine or
//! manager unreachable) returns an error, which the watcher answers by
//! skipping the cycle and leaving the previous snapshot in place.

pub mod docker;
pub mod systemd;

use anyhow::Result;
use async_trait::async_trait;

use crate::{Category, Snapshot};

pub use docker::DockerCollector;
pub use systemd::SystemdCollector;

/// Source of truth for one resource category.
#[async_trait]
pub trait Collector: Send + Sync {
    fn category(&self) -> Category;

    /// Query the current inventory. Read-only, exclude list already applied.
    async fn collect(&self) -> Result<Snapshot>;
}
