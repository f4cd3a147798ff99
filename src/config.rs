use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use tracing::trace;

use crate::Category;
use crate::notify::format::MessageFormat;

/// Top-level configuration, read once at startup and never mutated.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

impl Config {
    /// Backends that are actually used for delivery.
    pub fn enabled_backends(&self) -> Vec<BackendConfig> {
        self.backends
            .iter()
            .filter(|backend| backend.enabled())
            .cloned()
            .collect()
    }

    /// A config without a single enabled backend has no safe delivery target.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.enabled_backends().is_empty() {
            anyhow::bail!("no enabled notification backend configured");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Polling period in seconds. Clamped to a per-variant minimum.
    pub poll_interval_secs: u64,

    /// Announce the monitored inventory once at startup.
    pub startup_message: bool,

    /// Round or square status glyphs.
    pub dot_style: DotStyle,

    /// Omit secondary attributes (short ids, hashes) from change lines.
    pub compact: bool,

    /// Per-category toggles for the container-engine variant.
    pub resources: ResourceToggles,

    /// Bind address for the read-only dashboard, if any.
    pub dashboard_addr: Option<SocketAddr>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            startup_message: true,
            dot_style: DotStyle::default(),
            compact: false,
            resources: ResourceToggles::default(),
            dashboard_addr: None,
        }
    }
}

impl Settings {
    /// Effective polling period, never below `min_secs`.
    pub fn poll_interval(&self, min_secs: u64) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(min_secs))
    }
}

/// Two equivalent glyph sets for OK/BAD indicators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DotStyle {
    #[default]
    Round,
    Square,
}

impl DotStyle {
    pub fn green(&self) -> &'static str {
        match self {
            DotStyle::Round => "\u{1F7E2}",
            DotStyle::Square => "\u{1F7E9}",
        }
    }

    pub fn red(&self) -> &'static str {
        match self {
            DotStyle::Round => "\u{1F534}",
            DotStyle::Square => "\u{1F7E5}",
        }
    }

    pub fn yellow(&self) -> &'static str {
        match self {
            DotStyle::Round => "\u{1F7E1}",
            DotStyle::Square => "\u{1F7E8}",
        }
    }

    pub fn orange(&self) -> &'static str {
        match self {
            DotStyle::Round => "\u{1F7E0}",
            DotStyle::Square => "\u{1F7E7}",
        }
    }
}

/// Which container-engine categories are monitored.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(default)]
pub struct ResourceToggles {
    pub containers: bool,
    pub images: bool,
    pub networks: bool,
    pub volumes: bool,
    pub stacks: bool,
}

impl Default for ResourceToggles {
    fn default() -> Self {
        Self {
            containers: true,
            images: true,
            networks: true,
            volumes: true,
            stacks: true,
        }
    }
}

impl ResourceToggles {
    pub fn enabled_categories(&self) -> Vec<Category> {
        let mut categories = vec![];
        if self.containers {
            categories.push(Category::Containers);
        }
        if self.images {
            categories.push(Category::Images);
        }
        if self.networks {
            categories.push(Category::Networks);
        }
        if self.volumes {
            categories.push(Category::Volumes);
        }
        if self.stacks {
            categories.push(Category::Stacks);
        }
        categories
    }
}

/// One notification delivery target.
///
/// A list-valued field (chat ids, topics, webhook urls) fans out to one HTTP
/// request per element, all sharing the variant's credentials.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    Telegram {
        #[serde(default = "default_enabled")]
        enabled: bool,
        token: String,
        chat_ids: Vec<String>,
    },
    Discord {
        #[serde(default = "default_enabled")]
        enabled: bool,
        urls: Vec<String>,
    },
    Slack {
        #[serde(default = "default_enabled")]
        enabled: bool,
        urls: Vec<String>,
    },
    Gotify {
        #[serde(default = "default_enabled")]
        enabled: bool,
        url: String,
        tokens: Vec<String>,
    },
    Ntfy {
        #[serde(default = "default_enabled")]
        enabled: bool,
        url: String,
        topics: Vec<String>,
    },
    Pushover {
        #[serde(default = "default_enabled")]
        enabled: bool,
        token: String,
        user_keys: Vec<String>,
    },
    Matrix {
        #[serde(default = "default_enabled")]
        enabled: bool,
        url: String,
        token: String,
        room_ids: Vec<String>,
    },
    Custom {
        #[serde(default = "default_enabled")]
        enabled: bool,
        urls: Vec<String>,
        #[serde(default)]
        headers: HashMap<String, String>,
        #[serde(default)]
        format: MessageFormat,
        /// JSON field receiving the message body.
        #[serde(default = "default_message_key")]
        message_key: String,
        /// JSON field receiving the header line, stripped of emphasis.
        #[serde(default)]
        title_key: Option<String>,
        /// Send the body as raw UTF-8 bytes with the title in a `Title`
        /// request header instead of a JSON document.
        #[serde(default)]
        raw_body: bool,
    },
}

fn default_enabled() -> bool {
    true
}

fn default_message_key() -> String {
    String::from("message")
}

impl BackendConfig {
    pub fn enabled(&self) -> bool {
        match self {
            BackendConfig::Telegram { enabled, .. }
            | BackendConfig::Discord { enabled, .. }
            | BackendConfig::Slack { enabled, .. }
            | BackendConfig::Gotify { enabled, .. }
            | BackendConfig::Ntfy { enabled, .. }
            | BackendConfig::Pushover { enabled, .. }
            | BackendConfig::Matrix { enabled, .. }
            | BackendConfig::Custom { enabled, .. } => *enabled,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BackendConfig::Telegram { .. } => "telegram",
            BackendConfig::Discord { .. } => "discord",
            BackendConfig::Slack { .. } => "slack",
            BackendConfig::Gotify { .. } => "gotify",
            BackendConfig::Ntfy { .. } => "ntfy",
            BackendConfig::Pushover { .. } => "pushover",
            BackendConfig::Matrix { .. } => "matrix",
            BackendConfig::Custom { .. } => "custom",
        }
    }

    /// Declared body format for this backend's wire dialect.
    pub fn format(&self) -> MessageFormat {
        match self {
            BackendConfig::Telegram { .. } => MessageFormat::Html,
            BackendConfig::Discord { .. } => MessageFormat::Markdown,
            BackendConfig::Slack { .. } => MessageFormat::Asterisk,
            BackendConfig::Gotify { .. } => MessageFormat::Markdown,
            BackendConfig::Ntfy { .. } => MessageFormat::Text,
            BackendConfig::Pushover { .. } => MessageFormat::Html,
            BackendConfig::Matrix { .. } => MessageFormat::Html,
            BackendConfig::Custom { format, .. } => *format,
        }
    }
}

/// Resource ids omitted from monitoring entirely.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ExcludeList {
    #[serde(default)]
    pub list: Vec<String>,
}

impl ExcludeList {
    pub fn is_excluded(&self, id: &str) -> bool {
        self.list.iter().any(|entry| entry == id)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read configuration file {path}: {e}"))?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("invalid configuration file {path}: {e}"))
        .inspect(|config: &Config| trace!("loaded config: {config:?}"))
}

pub fn read_exclude_file(path: &str) -> anyhow::Result<ExcludeList> {
    let file_content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read exclude file {path}: {e}"))?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("invalid exclude file {path}: {e}"))
        .inspect(|excluded: &ExcludeList| trace!("loaded exclude list: {excluded:?}"))
}
