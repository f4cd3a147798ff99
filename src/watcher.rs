//! Poll-cycle driver: one watcher task per resource category.
//!
//! A cycle runs collect → diff → store swap → dispatch, strictly in that
//! order and to completion before the next tick can fire. The store swap
//! happens before dispatch, so a slow or failing backend can neither lose a
//! state change nor cause it to be re-reported on the next cycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, instrument, trace, warn};

use crate::collector::Collector;
use crate::diff::{RenderOptions, diff};
use crate::notify::Dispatcher;
use crate::{Category, Snapshot};

/// Last snapshot per category, shared with the dashboard.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<RwLock<HashMap<Category, Snapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, snapshot: Snapshot) {
        self.inner.write().await.insert(snapshot.category, snapshot);
    }

    pub async fn get(&self, category: Category) -> Option<Snapshot> {
        self.inner.read().await.get(&category).cloned()
    }

    /// All stored snapshots, ordered by category name for stable output.
    pub async fn all(&self) -> Vec<Snapshot> {
        let mut snapshots: Vec<Snapshot> = self.inner.read().await.values().cloned().collect();
        snapshots.sort_by_key(|snapshot| snapshot.category.to_string());
        snapshots
    }
}

/// Commands accepted by a running watcher.
#[derive(Debug)]
pub enum WatcherCommand {
    /// Run a cycle immediately, bypassing the interval timer. Replies with
    /// whether a notification was dispatched.
    CheckNow {
        respond_to: oneshot::Sender<Result<bool>>,
    },

    /// Finish the in-flight cycle, then exit.
    Shutdown,
}

/// Actor that polls one category and reports its changes.
pub struct Watcher {
    collector: Box<dyn Collector>,
    store: SnapshotStore,
    dispatcher: Arc<Dispatcher>,
    render: RenderOptions,

    /// Previous snapshot; `None` until the first successful collect.
    previous: Option<Snapshot>,

    command_rx: mpsc::Receiver<WatcherCommand>,
    poll_interval: Duration,
}

impl Watcher {
    #[instrument(skip(self), fields(category = %self.collector.category()))]
    pub async fn run(mut self) {
        debug!("starting watcher");

        // the first cycle is triggered explicitly via CheckNow, so the
        // ticker starts one full period out
        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        warn!("cycle failed, keeping previous snapshot: {e:#}");
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        WatcherCommand::CheckNow { respond_to } => {
                            let result = self.run_cycle().await;
                            let _ = respond_to.send(result);
                        }

                        WatcherCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("watcher stopped");
    }

    /// One full poll cycle. Returns whether a notification went out.
    async fn run_cycle(&mut self) -> Result<bool> {
        let current = self.collector.collect().await?;

        let previous = match self.previous.take() {
            Some(snapshot) => snapshot,
            // first cycle: already-bad resources surface once, healthy
            // steady state stays silent
            None => current.healthy_baseline(),
        };

        let report = diff(&previous, &current);
        trace!(
            "cycle: {} records, {} events",
            current.len(),
            report.events.len()
        );

        // swap before dispatch; delivery failures must not repeat events
        self.store.insert(current.clone()).await;
        self.previous = Some(current);

        match report.render(&self.render) {
            Some(notification) => {
                self.dispatcher.dispatch(&notification).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Handle for controlling a spawned watcher.
#[derive(Clone)]
pub struct WatcherHandle {
    sender: mpsc::Sender<WatcherCommand>,
    category: Category,
}

impl WatcherHandle {
    /// Spawn a watcher task for one category.
    pub fn spawn(
        collector: Box<dyn Collector>,
        store: SnapshotStore,
        dispatcher: Arc<Dispatcher>,
        render: RenderOptions,
        poll_interval: Duration,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let category = collector.category();

        let watcher = Watcher {
            collector,
            store,
            dispatcher,
            render,
            previous: None,
            command_rx: cmd_rx,
            poll_interval,
        };

        tokio::spawn(watcher.run());

        Self {
            sender: cmd_tx,
            category,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Run a cycle immediately; returns whether a notification was sent.
    pub async fn check_now(&self) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WatcherCommand::CheckNow { respond_to: tx })
            .await?;
        rx.await?
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(WatcherCommand::Shutdown).await;
    }
}
