//! Fan-out delivery to configured notification backends.
//!
//! Every enabled backend is attempted independently: a dead endpoint burns
//! its own retry budget and is then skipped, without affecting delivery to
//! the remaining backends. The snapshot store is already updated by the time
//! dispatch runs, so a delivery failure can never repeat or lose a state
//! change on the next cycle.

use std::time::Duration;

use rand::Rng;
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::config::BackendConfig;
use crate::notify::Notification;
use crate::notify::format::{self, MessageFormat};

/// Bounded retry with exponential backoff and sub-second jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given zero-based attempt.
    ///
    /// The base delay doubles each attempt; the random sub-second offset
    /// keeps a fleet of hosts from hammering a rate-limited endpoint in
    /// lockstep.
    pub fn delay(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay * 2u32.saturating_pow(attempt);
        let jitter = Duration::from_millis(rand::rng().random_range(0..1000));
        backoff + jitter
    }
}

/// Request body variants: JSON document or raw UTF-8 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Raw(Vec<u8>),
}

/// One concrete HTTP POST derived from a backend config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub url: String,
    pub body: RequestBody,
    pub headers: Vec<(String, String)>,
}

/// Expand a backend into its wire requests for one notification.
///
/// A backend with several chat ids / topics / urls yields one request per
/// element. The match arms are the only place that knows each backend's
/// payload schema.
pub fn build_requests(backend: &BackendConfig, notification: &Notification) -> Vec<OutboundRequest> {
    let title = format::strip_emphasis(&notification.header);

    match backend {
        BackendConfig::Telegram {
            token, chat_ids, ..
        } => {
            let text = format::render(&notification.full_text(), MessageFormat::Html);
            chat_ids
                .iter()
                .map(|chat_id| OutboundRequest {
                    url: format!("https://api.telegram.org/bot{token}/sendMessage"),
                    body: RequestBody::Json(json!({
                        "chat_id": chat_id,
                        "text": text,
                        "parse_mode": "HTML",
                    })),
                    headers: vec![],
                })
                .collect()
        }

        BackendConfig::Discord { urls, .. } => {
            let content = format::render(&notification.full_text(), MessageFormat::Markdown);
            urls.iter()
                .map(|url| OutboundRequest {
                    url: url.clone(),
                    body: RequestBody::Json(json!({ "content": content })),
                    headers: vec![],
                })
                .collect()
        }

        BackendConfig::Slack { urls, .. } => {
            // Slack mrkdwn uses the same single-asterisk bold convention.
            let text = format::render(&notification.full_text(), MessageFormat::Asterisk);
            urls.iter()
                .map(|url| OutboundRequest {
                    url: url.clone(),
                    body: RequestBody::Json(json!({ "text": text })),
                    headers: vec![],
                })
                .collect()
        }

        BackendConfig::Gotify { url, tokens, .. } => {
            // Blank lines force the markdown client renderer to break.
            let message =
                format::render(&notification.body, MessageFormat::Markdown).replace('\n', "\n\n");
            tokens
                .iter()
                .map(|token| OutboundRequest {
                    url: format!("{url}/message?token={token}"),
                    body: RequestBody::Json(json!({
                        "title": title,
                        "message": message,
                        "extras": {
                            "client::display": { "contentType": "text/markdown" }
                        },
                    })),
                    headers: vec![],
                })
                .collect()
        }

        BackendConfig::Ntfy { url, topics, .. } => {
            let body = format::render(&notification.body, MessageFormat::Text);
            topics
                .iter()
                .map(|topic| OutboundRequest {
                    url: format!("{url}/{topic}"),
                    body: RequestBody::Raw(body.clone().into_bytes()),
                    headers: vec![(String::from("Title"), title.clone())],
                })
                .collect()
        }

        BackendConfig::Pushover {
            token, user_keys, ..
        } => {
            let message = format::render(&notification.body, MessageFormat::Html);
            user_keys
                .iter()
                .map(|user| OutboundRequest {
                    url: String::from("https://api.pushover.net/1/messages.json"),
                    body: RequestBody::Json(json!({
                        "token": token,
                        "user": user,
                        "title": title,
                        "message": message,
                        "html": 1,
                    })),
                    headers: vec![],
                })
                .collect()
        }

        BackendConfig::Matrix {
            url,
            token,
            room_ids,
            ..
        } => {
            let plain = format::render(&notification.full_text(), MessageFormat::Text);
            let formatted = format::render(&notification.full_text(), MessageFormat::Html);
            room_ids
                .iter()
                .map(|room_id| OutboundRequest {
                    url: format!(
                        "{url}/_matrix/client/v3/rooms/{room_id}/send/m.room.message?access_token={token}"
                    ),
                    body: RequestBody::Json(json!({
                        "msgtype": "m.text",
                        "body": plain,
                        "format": "org.matrix.custom.html",
                        "formatted_body": formatted,
                    })),
                    headers: vec![],
                })
                .collect()
        }

        BackendConfig::Custom {
            urls,
            headers,
            format: declared,
            message_key,
            title_key,
            raw_body,
            ..
        } => {
            let extra_headers: Vec<(String, String)> = headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();

            urls.iter()
                .map(|url| {
                    if *raw_body {
                        let mut request_headers = extra_headers.clone();
                        request_headers.push((String::from("Title"), title.clone()));
                        OutboundRequest {
                            url: url.clone(),
                            body: RequestBody::Raw(
                                format::render(&notification.body, *declared).into_bytes(),
                            ),
                            headers: request_headers,
                        }
                    } else {
                        let mut payload = serde_json::Map::new();
                        if let Some(title_key) = title_key {
                            payload.insert(title_key.clone(), json!(title));
                            payload.insert(
                                message_key.clone(),
                                json!(format::render(&notification.body, *declared)),
                            );
                        } else {
                            payload.insert(
                                message_key.clone(),
                                json!(format::render(&notification.full_text(), *declared)),
                            );
                        }
                        OutboundRequest {
                            url: url.clone(),
                            body: RequestBody::Json(serde_json::Value::Object(payload)),
                            headers: extra_headers.clone(),
                        }
                    }
                })
                .collect()
        }
    }
}

/// Delivers one notification to every enabled backend.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    backends: Vec<BackendConfig>,
    retry: RetryPolicy,
}

impl Dispatcher {
    pub fn new(backends: Vec<BackendConfig>) -> Self {
        Self::with_retry_policy(backends, RetryPolicy::default())
    }

    pub fn with_retry_policy(backends: Vec<BackendConfig>, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .timeout(Duration::from_secs(20))
                .build()
                .expect("Failed to build HTTP client"),
            backends,
            retry,
        }
    }

    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    /// Send `notification` to every backend, each under its own retry budget.
    #[instrument(skip(self, notification))]
    pub async fn dispatch(&self, notification: &Notification) {
        for backend in &self.backends {
            for request in build_requests(backend, notification) {
                self.deliver(backend.kind(), &request).await;
            }
        }
    }

    /// Attempt one request until success or the retry budget is spent.
    async fn deliver(&self, kind: &str, request: &OutboundRequest) {
        let target = base_url(&request.url);

        for attempt in 0..self.retry.max_attempts {
            match self.send_once(request).await {
                Ok(status) if status.is_success() => {
                    info!("message sent to {kind} ({target}), status {status}");
                    return;
                }
                Ok(status) => {
                    warn!(
                        "attempt {}/{} to {kind} ({target}) returned {status}",
                        attempt + 1,
                        self.retry.max_attempts
                    );
                }
                Err(e) => {
                    warn!(
                        "attempt {}/{} to {kind} ({target}) failed: {e}",
                        attempt + 1,
                        self.retry.max_attempts
                    );
                }
            }

            if attempt + 1 < self.retry.max_attempts {
                tokio::time::sleep(self.retry.delay(attempt)).await;
            }
        }

        error!(
            "giving up on {kind} ({target}) after {} attempts",
            self.retry.max_attempts
        );
    }

    async fn send_once(&self, request: &OutboundRequest) -> reqwest::Result<reqwest::StatusCode> {
        let mut builder = self.client.post(&request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        builder = match &request.body {
            RequestBody::Json(payload) => builder.json(payload),
            RequestBody::Raw(bytes) => builder.body(bytes.clone()),
        };

        Ok(builder.send().await?.status())
    }
}

/// Scheme and host only, so tokens embedded in paths never reach the logs.
fn base_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let host_start = scheme_end + 3;
    match url[host_start..].find('/') {
        Some(path_start) => format!("{}....", &url[..host_start + path_start]),
        None => url.to_string(),
    }
}
