//! Systemd unit inventory via the wants directory and `systemctl is-active`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{trace, warn};

use crate::config::ExcludeList;
use crate::{Category, ResourceRecord, ResourceStatus, Snapshot};

use super::Collector;

const WANTS_DIR: &str = "/etc/systemd/system/multi-user.target.wants";

/// Enumerates enabled `*.service` units and polls their active state.
#[derive(Debug, Clone)]
pub struct SystemdCollector {
    wants_dir: PathBuf,
    excluded: ExcludeList,
}

impl SystemdCollector {
    pub fn new(excluded: ExcludeList) -> Self {
        Self {
            wants_dir: PathBuf::from(WANTS_DIR),
            excluded,
        }
    }

    /// Override the wants directory (tests point this at a fixture dir).
    pub fn with_wants_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.wants_dir = dir.into();
        self
    }

    /// Enabled units are symlinks into the wants directory.
    async fn list_units(&self) -> Result<Vec<String>> {
        let mut units = vec![];
        let mut entries = tokio::fs::read_dir(&self.wants_dir)
            .await
            .with_context(|| format!("cannot list {}", self.wants_dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".service") {
                continue;
            }
            let file_type = entry.file_type().await?;
            if !file_type.is_symlink() {
                continue;
            }
            if self.excluded.is_excluded(&name) {
                trace!("skipping excluded unit {name}");
                continue;
            }
            units.push(name);
        }

        units.sort();
        Ok(units)
    }

    /// `Description=` line from the unit file, if readable.
    async fn unit_description(&self, unit: &str) -> Option<String> {
        let path = self.wants_dir.join(unit);
        let content = tokio::fs::read_to_string(&path).await.ok()?;
        content
            .lines()
            .map(str::trim)
            .find_map(|line| line.strip_prefix("Description="))
            .map(str::to_string)
    }

    /// Active state of one unit. A query error is recorded as bad, never
    /// propagated, so one broken unit cannot abort the pass.
    async fn unit_status(&self, unit: &str) -> ResourceStatus {
        match Command::new("systemctl")
            .args(["is-active", unit])
            .output()
            .await
        {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                if output.status.success() && stdout.trim() == "active" {
                    ResourceStatus::Ok
                } else {
                    ResourceStatus::Bad
                }
            }
            Err(e) => {
                warn!("systemctl is-active {unit} failed: {e}");
                ResourceStatus::Bad
            }
        }
    }
}

#[async_trait]
impl Collector for SystemdCollector {
    fn category(&self) -> Category {
        Category::Services
    }

    async fn collect(&self) -> Result<Snapshot> {
        let units = self.list_units().await?;
        let mut records = Vec::with_capacity(units.len());

        for unit in units {
            let status = self.unit_status(&unit).await;
            let mut record = ResourceRecord::new(&unit, status);
            if let Some(description) = self.unit_description(&unit).await {
                record = record.with_detail(description);
            }
            records.push(record);
        }

        Ok(Snapshot::new(Category::Services, records))
    }
}
