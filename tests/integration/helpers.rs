//! Test helpers shared across the integration suite.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use vigil::collector::Collector;
use vigil::config::{BackendConfig, DotStyle};
use vigil::diff::RenderOptions;
use vigil::notify::format::MessageFormat;
use vigil::notify::{Dispatcher, RetryPolicy};
use vigil::{Category, ResourceRecord, ResourceStatus, Snapshot};

/// Collector that replays a scripted sequence of inventories. Once the
/// script is exhausted the last inventory repeats, mirroring a steady host.
pub struct ScriptedCollector {
    category: Category,
    script: Arc<Mutex<Vec<ScriptStep>>>,
    last: Arc<Mutex<Vec<ResourceRecord>>>,
}

pub enum ScriptStep {
    Inventory(Vec<ResourceRecord>),
    Fail(&'static str),
}

impl ScriptedCollector {
    pub fn new(category: Category, steps: Vec<ScriptStep>) -> Self {
        Self {
            category,
            script: Arc::new(Mutex::new(steps)),
            last: Arc::new(Mutex::new(vec![])),
        }
    }
}

#[async_trait]
impl Collector for ScriptedCollector {
    fn category(&self) -> Category {
        self.category
    }

    async fn collect(&self) -> Result<Snapshot> {
        let mut script = self.script.lock().await;
        let records = if script.is_empty() {
            self.last.lock().await.clone()
        } else {
            match script.remove(0) {
                ScriptStep::Inventory(records) => {
                    *self.last.lock().await = records.clone();
                    records
                }
                ScriptStep::Fail(reason) => anyhow::bail!("{reason}"),
            }
        };

        Ok(Snapshot::new(self.category, records))
    }
}

pub fn record(id: &str, status: ResourceStatus) -> ResourceRecord {
    ResourceRecord::new(id, status)
}

pub fn ok(id: &str) -> ResourceRecord {
    record(id, ResourceStatus::Ok)
}

pub fn bad(id: &str) -> ResourceRecord {
    record(id, ResourceStatus::Bad)
}

/// A custom JSON backend pointed at a test server.
pub fn webhook_backend(url: &str) -> BackendConfig {
    BackendConfig::Custom {
        enabled: true,
        urls: vec![url.to_string()],
        headers: HashMap::new(),
        format: MessageFormat::Asterisk,
        message_key: String::from("message"),
        title_key: None,
        raw_body: false,
    }
}

/// Dispatcher with millisecond backoff so retry tests stay fast.
pub fn fast_dispatcher(backends: Vec<BackendConfig>) -> Dispatcher {
    Dispatcher::with_retry_policy(
        backends,
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
        },
    )
}

pub fn render_options(header: &str, summary_line: bool) -> RenderOptions {
    RenderOptions {
        header: header.to_string(),
        style: DotStyle::Round,
        compact: false,
        summary_line,
    }
}
