use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use vigil::{
    Category,
    collector::SystemdCollector,
    config::{Config, ExcludeList, read_config_file, read_exclude_file},
    diff::RenderOptions,
    notify::{Dispatcher, Notification},
    util::{hostname, message_header},
    watcher::{SnapshotStore, WatcherHandle},
};

/// Enforced lower bound for the services polling period.
const MIN_POLL_SECS: u64 = 60;

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
        ("vigil_services", LevelFilter::TRACE),
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

    let host = hostname();
    let header = message_header(&host, Category::Services.header_tag());
    let poll_interval = config.settings.poll_interval(MIN_POLL_SECS);

    let dispatcher = Arc::new(Dispatcher::new(config.enabled_backends()));
    let store = SnapshotStore::new();

    let watcher = WatcherHandle::spawn(
        Box::new(SystemdCollector::new(excluded.clone())),
        store.clone(),
        dispatcher.clone(),
        RenderOptions {
            header: header.clone(),
            style: config.settings.dot_style,
            compact: config.settings.compact,
            summary_line: true,
        },
        poll_interval,
    );

    // baseline cycle before the startup announcement, so its counts are real
    if let Err(e) = watcher.check_now().await {
        error!("initial collection failed: {e:#}");
    }

    if config.settings.startup_message {
        let monitored = store
            .get(Category::Services)
            .await
            .map(|snapshot| snapshot.len())
            .unwrap_or(0);
        let announcement =
            startup_notification(&header, &config, &excluded, monitored, poll_interval);
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
    watcher.shutdown().await;

    Ok(())
}

fn startup_notification(
    header: &str,
    config: &Config,
    excluded: &ExcludeList,
    monitored: usize,
    poll_interval: Duration,
) -> Notification {
    let mut lines: Vec<String> = config
        .enabled_backends()
        .iter()
        .map(|backend| format!("- messaging: {},", capitalize(backend.kind())))
        .collect();
    lines.sort();

    lines.push(format!("- monitoring: {monitored} service(s),"));
    lines.push(format!("- excluded: {} service(s),", excluded.len()));
    lines.push(format!(
        "- polling period: {} second(s).",
        poll_interval.as_secs()
    ));

    Notification::new(header, format!("services monitor:\n{}", lines.join("\n")))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
