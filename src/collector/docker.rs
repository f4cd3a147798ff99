//! Container-engine inventory via the docker CLI's JSON-lines output.
//!
//! One collector instance covers one category; the docker binary is invoked
//! with `--format '{{json .}}'` and each output line is parsed on its own,
//! so a single malformed line degrades to a warning instead of killing the
//! pass.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::warn;

use crate::config::ExcludeList;
use crate::{Category, ResourceRecord, ResourceStatus, Snapshot};

use super::Collector;

const DEFAULT_NETWORKS: [&str; 3] = ["none", "host", "bridge"];

const COMPOSE_PROJECT_LABEL: &str = "com.docker.compose.project";
const COMPOSE_HASH_LABEL: &str = "com.docker.compose.config-hash";

#[derive(Debug, Clone)]
pub struct DockerCollector {
    category: Category,
    excluded: ExcludeList,
    binary: String,
}

impl DockerCollector {
    pub fn new(category: Category, excluded: ExcludeList) -> Self {
        Self {
            category,
            excluded,
            binary: String::from("docker"),
        }
    }

    /// Run the docker CLI and return non-empty stdout lines.
    async fn cli_lines(&self, args: &[&str]) -> Result<Vec<String>> {
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .with_context(|| format!("cannot run {} {}", self.binary, args.join(" ")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{} {} failed: {}",
                self.binary,
                args.join(" "),
                stderr.trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .filter(|line| !line.trim().is_empty())
            .collect())
    }

    fn apply_excludes(&self, records: Vec<ResourceRecord>) -> Vec<ResourceRecord> {
        records
            .into_iter()
            .filter(|record| !self.excluded.is_excluded(&record.id))
            .collect()
    }
}

#[async_trait]
impl Collector for DockerCollector {
    fn category(&self) -> Category {
        self.category
    }

    async fn collect(&self) -> Result<Snapshot> {
        let records = match self.category {
            Category::Containers => {
                parse_containers(&self.cli_lines(&["ps", "-a", "--format", "{{json .}}"]).await?)
            }
            Category::Images => {
                parse_images(&self.cli_lines(&["images", "--format", "{{json .}}"]).await?)
            }
            Category::Networks => {
                parse_networks(&self.cli_lines(&["network", "ls", "--format", "{{json .}}"]).await?)
            }
            Category::Volumes => {
                parse_volumes(&self.cli_lines(&["volume", "ls", "--format", "{{json .}}"]).await?)
            }
            Category::Stacks => {
                // running containers only; stopped ones keep their last hash
                parse_stacks(&self.cli_lines(&["ps", "--format", "{{json .}}"]).await?)
            }
            Category::Services => bail!("services are not a container-engine category"),
        };

        Ok(Snapshot::new(self.category, self.apply_excludes(records)))
    }
}

#[derive(Debug, Deserialize)]
struct ContainerLine {
    #[serde(rename = "Names")]
    names: String,
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "State")]
    state: String,
    #[serde(default, rename = "Status")]
    status: String,
    #[serde(default, rename = "Labels")]
    labels: String,
}

#[derive(Debug, Deserialize)]
struct ImageLine {
    #[serde(rename = "Repository")]
    repository: String,
    #[serde(rename = "Tag")]
    tag: String,
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct NetworkLine {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct VolumeLine {
    #[serde(rename = "Name")]
    name: String,
}

fn parse_json_lines<'a, T: Deserialize<'a>>(lines: &'a [String]) -> Vec<T> {
    lines
        .iter()
        .filter_map(|line| match serde_json::from_str::<T>(line) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("skipping unparseable docker line: {e}");
                None
            }
        })
        .collect()
}

fn short_id(id: &str) -> String {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    id.chars().take(12).collect()
}

fn parse_containers(lines: &[String]) -> Vec<ResourceRecord> {
    parse_json_lines::<ContainerLine>(lines)
        .into_iter()
        .map(|container| {
            // the health attribute, when present, wins over the plain state
            let state = if container.status.contains("(unhealthy)") {
                String::from("unhealthy")
            } else if container.status.contains("(healthy)") {
                String::from("healthy")
            } else {
                container.state
            };

            let name = container
                .names
                .split(',')
                .next()
                .unwrap_or(&container.names)
                .to_string();

            ResourceRecord::new(name, ResourceStatus::Other(state))
                .with_detail(short_id(&container.id))
        })
        .collect()
}

fn parse_images(lines: &[String]) -> Vec<ResourceRecord> {
    parse_json_lines::<ImageLine>(lines)
        .into_iter()
        .map(|image| {
            let id = short_id(&image.id);
            if image.repository == "<none>" {
                ResourceRecord::new(id, ResourceStatus::Ok)
            } else {
                ResourceRecord::new(
                    format!("{}:{}", image.repository, image.tag),
                    ResourceStatus::Ok,
                )
                .with_detail(id)
            }
        })
        .collect()
}

fn parse_networks(lines: &[String]) -> Vec<ResourceRecord> {
    parse_json_lines::<NetworkLine>(lines)
        .into_iter()
        .filter(|network| !DEFAULT_NETWORKS.contains(&network.name.as_str()))
        .map(|network| {
            ResourceRecord::new(network.name, ResourceStatus::Ok)
                .with_detail(short_id(&network.id))
        })
        .collect()
}

fn parse_volumes(lines: &[String]) -> Vec<ResourceRecord> {
    parse_json_lines::<VolumeLine>(lines)
        .into_iter()
        .map(|volume| ResourceRecord::new(volume.name, ResourceStatus::Ok))
        .collect()
}

/// Compose stacks derived from running containers' labels. The config hash
/// is the change-relevant status: a redeploy flips it.
fn parse_stacks(lines: &[String]) -> Vec<ResourceRecord> {
    let mut stacks: Vec<ResourceRecord> = vec![];

    for container in parse_json_lines::<ContainerLine>(lines) {
        let mut project = None;
        let mut hash = None;

        for label in container.labels.split(',') {
            match label.split_once('=') {
                Some((COMPOSE_PROJECT_LABEL, value)) => project = Some(value.to_string()),
                Some((COMPOSE_HASH_LABEL, value)) => hash = Some(short_id(value)),
                _ => {}
            }
        }

        let (Some(project), Some(hash)) = (project, hash) else {
            continue;
        };
        if stacks.iter().any(|stack| stack.id == project) {
            continue;
        }
        stacks.push(ResourceRecord::new(project, ResourceStatus::Other(hash)));
    }

    stacks
}
