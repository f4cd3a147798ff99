use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use vigil::{
    collector::DockerCollector,
    config::{Config, ExcludeList, read_config_file, read_exclude_file},
    diff::RenderOptions,
    notify::{Dispatcher, Notification},
    util::{hostname, message_header},
    watcher::{SnapshotStore, WatcherHandle},
};

/// Enforced lower bound for the container-engine polling period.
const MIN_POLL_SECS: u64 = 10;

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,

    /// Exclude-list file
    #[arg(short = 'x')]
    exclude: Option<String>,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_targets(vec![
        ("vigil", LevelFilter::TRACE),
        ("vigil_docker", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;
    config.validate()?;

    let excluded = match &args.exclude {
        Some(path) => read_exclude_file(path)?,
        None => ExcludeList::default(),
    };

    let categories = config.settings.resources.enabled_categories();
    if categories.is_empty() {
        anyhow::bail!("every resource category is disabled, nothing to monitor");
    }

    let host = hostname();
    let poll_interval = config.settings.poll_interval(MIN_POLL_SECS);

    let dispatcher = Arc::new(Dispatcher::new(config.enabled_backends()));
    let store = SnapshotStore::new();

    let mut watchers = vec![];
    for category in categories {
        let watcher = WatcherHandle::spawn(
            Box::new(DockerCollector::new(category, excluded.clone())),
            store.clone(),
            dispatcher.clone(),
            RenderOptions {
                header: message_header(&host, category.header_tag()),
                style: config.settings.dot_style,
                compact: config.settings.compact,
                summary_line: false,
            },
            poll_interval,
        );
        watchers.push(watcher);
    }

    // baseline cycles before the startup announcement, so its counts are real
    for watcher in &watchers {
        if let Err(e) = watcher.check_now().await {
            error!(
                "initial {} collection failed: {e:#}",
                watcher.category()
            );
        }
    }

    if config.settings.startup_message {
        let announcement = startup_notification(
            &message_header(&host, ".dockcheck"),
            &config,
            &excluded,
            &store,
            poll_interval,
        )
        .await;
        dispatcher.dispatch(&announcement).await;
    }

    #[cfg(feature = "dashboard")]
    if let Some(addr) = config.settings.dashboard_addr {
        vigil::api::spawn_dashboard(
            addr,
            vigil::api::DashboardState {
                snapshots: store.clone(),
                excluded: Arc::new(excluded),
            },
        )
        .await?;
    }

    info!("started, polling every {}s", poll_interval.as_secs());

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    for watcher in &watchers {
        watcher.shutdown().await;
    }

    Ok(())
}

async fn startup_notification(
    header: &str,
    config: &Config,
    excluded: &ExcludeList,
    store: &SnapshotStore,
    poll_interval: Duration,
) -> Notification {
    let mut lines: Vec<String> = config
        .enabled_backends()
        .iter()
        .map(|backend| format!("- messaging: {},", capitalize(backend.kind())))
        .collect();
    lines.sort();

    for snapshot in store.all().await {
        if !snapshot.is_empty() {
            lines.push(format!(
                "- monitoring: {} {},",
                snapshot.len(),
                snapshot.category
            ));
        }
    }

    lines.push(format!("- excluded: {} resource(s),", excluded.len()));
    lines.push(format!(
        "- polling period: {} second(s).",
        poll_interval.as_secs()
    ));

    Notification::new(header, format!("docker monitor:\n{}", lines.join("\n")))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
