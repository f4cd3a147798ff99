//! Notification message model, per-backend payload shaping, and delivery.

pub mod dispatcher;
pub mod format;

pub use dispatcher::{Dispatcher, RetryPolicy};

/// One semantic message, produced once per notification event and consumed
/// once per configured backend.
///
/// `header` and `body` both use the internal single-`*` emphasis convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub header: String,
    pub body: String,
}

impl Notification {
    pub fn new(header: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            body: body.into(),
        }
    }

    /// Header and body joined into the full message text.
    pub fn full_text(&self) -> String {
        format!("{}\n{}", self.header, self.body)
    }
}
