//! Snapshot diffing and change-report rendering.
//!
//! Two consecutive snapshots of the same category are compared keyed by
//! resource id. A record with the same id and the same status in both
//! snapshots never produces an event, so the rendered report contains
//! exactly the set of real changes. Rendering sorts lines before
//! concatenation, so identical change sets always produce byte-identical
//! output regardless of collection order.

use crate::config::DotStyle;
use crate::notify::Notification;
use crate::{Category, ResourceStatus, Snapshot, Summary};

/// How a resource moved between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    BecameBad,
    BecameOk,
    Appeared,
    Disappeared,
    Changed,
}

/// One notifiable transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub id: String,
    pub detail: Option<String>,
    pub previous: Option<ResourceStatus>,
    pub current: Option<ResourceStatus>,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// Status word printed after the resource name.
    fn word(&self, category: Category) -> &str {
        match self.kind {
            ChangeKind::Appeared => category.appeared_word(),
            ChangeKind::Disappeared => "removed",
            ChangeKind::Changed => "changed",
            ChangeKind::BecameBad | ChangeKind::BecameOk => self
                .current
                .as_ref()
                .map(ResourceStatus::word)
                .unwrap_or("changed"),
        }
    }

    fn dot(&self, style: DotStyle) -> &'static str {
        match self.kind {
            ChangeKind::BecameBad | ChangeKind::Disappeared => style.red(),
            ChangeKind::BecameOk => style.green(),
            ChangeKind::Appeared => style.yellow(),
            ChangeKind::Changed => style.orange(),
        }
    }
}

/// Result of one diff pass: the events plus counts over the new snapshot.
#[derive(Debug, Clone)]
pub struct DiffReport {
    pub category: Category,
    pub events: Vec<ChangeEvent>,
    pub summary: Summary,
}

impl DiffReport {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Render the composite change message, or `None` for a no-op cycle.
    pub fn render(&self, options: &RenderOptions) -> Option<Notification> {
        if self.events.is_empty() {
            return None;
        }

        let mut lines: Vec<String> = self
            .events
            .iter()
            .map(|event| {
                let detail = match (&event.detail, options.compact) {
                    (Some(detail), false) => format!(" ({detail})"),
                    _ => String::new(),
                };
                format!(
                    "{} *{}*{}: {}!",
                    event.dot(options.style),
                    event.id,
                    detail,
                    event.word(self.category)
                )
            })
            .collect();
        lines.sort();

        let mut body = lines.join("\n");
        if options.summary_line {
            body.push('\n');
            body.push_str(&self.summary.to_string());
        }

        Some(Notification::new(options.header.clone(), body))
    }
}

/// Rendering knobs, fixed per watcher at startup.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// First line of every message, e.g. `*host* (systemd)`.
    pub header: String,
    pub style: DotStyle,
    pub compact: bool,
    /// Append the `|ALL| - n, |OK| - n, |BAD| - n` line.
    pub summary_line: bool,
}

/// Compare two snapshots of the same category.
///
/// O(n) over both snapshots via an id-keyed map. Events come back sorted by
/// resource id.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> DiffReport {
    let previous_by_id = previous.by_id();
    let current_by_id = current.by_id();

    let mut events = vec![];

    for record in &current.records {
        match previous_by_id.get(record.id.as_str()) {
            Some(prev) if prev.status == record.status => {}
            Some(prev) => {
                let kind = match (prev.status.is_bad(), record.status.is_bad()) {
                    (false, true) => ChangeKind::BecameBad,
                    (true, false) => ChangeKind::BecameOk,
                    _ => ChangeKind::Changed,
                };
                events.push(ChangeEvent {
                    id: record.id.clone(),
                    detail: record.detail.clone(),
                    previous: Some(prev.status.clone()),
                    current: Some(record.status.clone()),
                    kind,
                });
            }
            None => {
                events.push(ChangeEvent {
                    id: record.id.clone(),
                    detail: record.detail.clone(),
                    previous: None,
                    current: Some(record.status.clone()),
                    kind: ChangeKind::Appeared,
                });
            }
        }
    }

    for record in &previous.records {
        if !current_by_id.contains_key(record.id.as_str()) {
            events.push(ChangeEvent {
                id: record.id.clone(),
                detail: record.detail.clone(),
                previous: Some(record.status.clone()),
                current: None,
                kind: ChangeKind::Disappeared,
            });
        }
    }

    events.sort_by(|a, b| a.id.cmp(&b.id));

    DiffReport {
        category: current.category,
        events,
        summary: current.summary(),
    }
}
