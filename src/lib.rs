pub mod api;
pub mod collector;
pub mod config;
pub mod diff;
pub mod notify;
pub mod util;
pub mod watcher;

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of monitored resources. One snapshot is kept per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Services,
    Containers,
    Images,
    Networks,
    Volumes,
    Stacks,
}

impl Category {
    /// Tag appended to the message header, e.g. `*host* (systemd)`.
    pub fn header_tag(&self) -> &'static str {
        match self {
            Category::Services => "systemd",
            Category::Containers => ".containers",
            Category::Images => ".images",
            Category::Networks => ".networks",
            Category::Volumes => ".volumes",
            Category::Stacks => ".stacks",
        }
    }

    /// Status word for a resource that is new in this category.
    pub fn appeared_word(&self) -> &'static str {
        match self {
            Category::Services => "enabled",
            Category::Containers => "created",
            Category::Images => "pulled",
            Category::Networks | Category::Volumes => "created",
            Category::Stacks => "changed",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Services => "services",
            Category::Containers => "containers",
            Category::Images => "images",
            Category::Networks => "networks",
            Category::Volumes => "volumes",
            Category::Stacks => "stacks",
        };
        write!(f, "{name}")
    }
}

/// Observed state of a single resource.
///
/// `Other` carries richer engine states ("unhealthy", "paused", a compose
/// config hash) that are neither plainly active nor plainly inactive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    Ok,
    Bad,
    Other(String),
}

impl ResourceStatus {
    /// Whether this status counts against the BAD tally.
    ///
    /// `Other` payloads that are not known failure states (image ids,
    /// compose config hashes, "created") stay neutral.
    pub fn is_bad(&self) -> bool {
        match self {
            ResourceStatus::Ok => false,
            ResourceStatus::Bad => true,
            ResourceStatus::Other(state) => matches!(
                state.as_str(),
                "unhealthy" | "exited" | "dead" | "paused" | "restarting" | "stopped" | "removing"
            ),
        }
    }

    /// Human word used in rendered change lines.
    pub fn word(&self) -> &str {
        match self {
            ResourceStatus::Ok => "active",
            ResourceStatus::Bad => "inactive",
            ResourceStatus::Other(state) => state,
        }
    }
}

/// One monitored resource as seen in a single inventory pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Unit/container/image/network/volume/stack name. Unique per snapshot.
    pub id: String,

    pub status: ResourceStatus,

    /// Secondary attribute: unit description, short id, config hash.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ResourceRecord {
    pub fn new(id: impl Into<String>, status: ResourceStatus) -> Self {
        Self {
            id: id.into(),
            status,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Full set of resource states observed in one poll cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub category: Category,
    pub taken_at: DateTime<Utc>,
    pub records: Vec<ResourceRecord>,
}

impl Snapshot {
    pub fn new(category: Category, records: Vec<ResourceRecord>) -> Self {
        Self {
            category,
            taken_at: Utc::now(),
            records,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Map view keyed by resource id.
    pub fn by_id(&self) -> HashMap<&str, &ResourceRecord> {
        self.records
            .iter()
            .map(|record| (record.id.as_str(), record))
            .collect()
    }

    /// Same resource set with every bad status reset to `Ok`; healthy
    /// statuses are kept as observed.
    ///
    /// Used as the previous snapshot on the first cycle, so resources
    /// already bad at startup surface once while healthy steady state stays
    /// silent.
    pub fn healthy_baseline(&self) -> Snapshot {
        Snapshot {
            category: self.category,
            taken_at: self.taken_at,
            records: self
                .records
                .iter()
                .map(|record| ResourceRecord {
                    id: record.id.clone(),
                    status: if record.status.is_bad() {
                        ResourceStatus::Ok
                    } else {
                        record.status.clone()
                    },
                    detail: record.detail.clone(),
                })
                .collect(),
        }
    }

    pub fn summary(&self) -> Summary {
        let total = self.records.len();
        let bad = self
            .records
            .iter()
            .filter(|record| record.status.is_bad())
            .count();

        Summary {
            total,
            ok: total - bad,
            bad,
        }
    }
}

/// Per-snapshot counts reported in the trailing summary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub ok: usize,
    pub bad: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "|ALL| - {}, |OK| - {}, |BAD| - {}",
            self.total, self.ok, self.bad
        )
    }
}
