//! Delivery failure handling: bounded retry, backend isolation.

use std::time::Duration;

use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vigil::config::BackendConfig;
use vigil::notify::format::MessageFormat;
use vigil::notify::{Dispatcher, Notification, RetryPolicy};

use crate::helpers::fast_dispatcher;

fn custom_backend(url: &str) -> BackendConfig {
    BackendConfig::Custom {
        enabled: true,
        urls: vec![url.to_string()],
        headers: Default::default(),
        format: MessageFormat::Html,
        message_key: String::from("message"),
        title_key: None,
        raw_body: false,
    }
}

fn sample_notification() -> Notification {
    Notification::new("*host* (systemd)", "\u{1F534} *ssh.service*: inactive!")
}

#[tokio::test]
async fn five_failures_exhaust_retries_without_panicking() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500))
        .expect(5)
        .mount(&server)
        .await;

    let dispatcher = fast_dispatcher(vec![custom_backend(&format!("{}/hook", server.uri()))]);
    dispatcher.dispatch(&sample_notification()).await;

    // expectation (exactly 5 attempts) is verified when the server drops
}

#[tokio::test]
async fn failing_backend_does_not_block_the_next_one() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dead"))
        .respond_with(ResponseTemplate::new(500))
        .expect(5)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/alive"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = fast_dispatcher(vec![
        custom_backend(&format!("{}/dead", server.uri())),
        custom_backend(&format!("{}/alive", server.uri())),
    ]);
    dispatcher.dispatch(&sample_notification()).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 6);
}

#[tokio::test]
async fn transient_failure_recovers_before_the_budget_is_spent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dispatcher = fast_dispatcher(vec![custom_backend(&server.uri())]);
    dispatcher.dispatch(&sample_notification()).await;

    // two 503s, then success on the third attempt, then no further calls
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn unreachable_endpoint_is_given_up_quietly() {
    // nothing listens on this port
    let dispatcher = Dispatcher::with_retry_policy(
        vec![custom_backend("http://127.0.0.1:1/hook")],
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
        },
    );

    // must return, not panic or hang
    dispatcher.dispatch(&sample_notification()).await;
}

#[tokio::test]
async fn one_notification_fans_out_to_every_list_element() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let backend = BackendConfig::Ntfy {
        enabled: true,
        url: server.uri(),
        topics: vec![String::from("alerts"), String::from("ops")],
    };

    let dispatcher = fast_dispatcher(vec![backend]);
    dispatcher.dispatch(&sample_notification()).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    // raw-bytes mode: title travels as a request header, body is plain text
    for request in &requests {
        let title = request.headers.get("Title").unwrap();
        assert_eq!(title.to_str().unwrap(), "host (systemd)");
        let body = String::from_utf8(request.body.clone()).unwrap();
        assert!(!body.contains('*'));
    }
}
