//! Integration tests for the fetch engine.
//!
//! These tests verify FetchEngine against a mock HTTP server, including the
//! fixed-delay retry loop, concurrency limits and crawl-delay spacing.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use harvester_core::{FetchEngine, FetchError, FetchOutcome, HttpClient, RateLimiter, RetryPolicy};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

// ==================== Helper Functions ====================

const TEST_RETRY_DELAY: Duration = Duration::from_millis(50);

fn create_engine(concurrency: usize, max_attempts: u32) -> FetchEngine {
    FetchEngine::new(
        concurrency,
        RetryPolicy::new(max_attempts, TEST_RETRY_DELAY),
        Arc::new(RateLimiter::new()),
    )
    .unwrap()
}

/// Responds 503 for the first `failures` requests, then 200.
struct FlakyResponder {
    calls: AtomicUsize,
    failures: usize,
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            ResponseTemplate::new(503)
        } else {
            ResponseTemplate::new(200).set_body_string("<html>ok</html>")
        }
    }
}

// ==================== Retry Tests ====================

#[tokio::test]
async fn test_fetch_one_always_503_exhausts_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let engine = create_engine(10, 3);
    let url = format!("{}/down", server.uri());
    let start = Instant::now();
    let outcome = engine.fetch_one(&HttpClient::new(), &url).await;

    // Three attempts with two waits between them.
    assert!(start.elapsed() >= TEST_RETRY_DELAY * 2);
    match outcome {
        FetchOutcome::Failure {
            url: failed_url,
            error,
            attempts_exhausted,
        } => {
            assert_eq!(failed_url, url);
            assert!(attempts_exhausted);
            assert_eq!(error.status(), Some(503));
        }
        FetchOutcome::Success { .. } => panic!("expected failure"),
    }
    assert_eq!(engine.stats().retried(), 2);
    assert_eq!(engine.stats().failed(), 1);
}

#[tokio::test]
async fn test_fetch_one_recovers_after_transient_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(FlakyResponder {
            calls: AtomicUsize::new(0),
            failures: 2,
        })
        .expect(3)
        .mount(&server)
        .await;

    let engine = create_engine(10, 3);
    let outcome = engine
        .fetch_one(&HttpClient::new(), &format!("{}/flaky", server.uri()))
        .await;

    match outcome {
        FetchOutcome::Success { body, status, .. } => {
            assert_eq!(status, 200);
            assert_eq!(body, "<html>ok</html>");
        }
        FetchOutcome::Failure { error, .. } => panic!("unexpected failure: {error}"),
    }
    assert_eq!(engine.stats().retried(), 2);
    assert_eq!(engine.stats().succeeded(), 1);
}

#[tokio::test]
async fn test_single_attempt_policy_does_not_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let engine = create_engine(10, 1);
    let outcome = engine
        .fetch_one(&HttpClient::new(), &format!("{}/gone", server.uri()))
        .await;

    assert!(matches!(
        outcome,
        FetchOutcome::Failure {
            attempts_exhausted: true,
            ..
        }
    ));
}

#[tokio::test]
async fn test_timeout_is_retried_then_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .expect(2)
        .mount(&server)
        .await;

    let client = HttpClient::with_timeout(Duration::from_millis(200)).unwrap();
    let engine = create_engine(10, 2);
    let outcome = engine
        .fetch_one(&client, &format!("{}/slow", server.uri()))
        .await;

    match outcome {
        FetchOutcome::Failure {
            error,
            attempts_exhausted,
            ..
        } => {
            assert!(matches!(error, FetchError::Timeout { .. }), "got {error:?}");
            assert!(attempts_exhausted);
        }
        FetchOutcome::Success { .. } => panic!("expected timeout"),
    }
}

#[tokio::test]
async fn test_connection_refused_is_network_failure() {
    let engine = create_engine(10, 2);
    let outcome = engine
        .fetch_one(&HttpClient::new(), "http://127.0.0.1:1/p/1")
        .await;

    match outcome {
        FetchOutcome::Failure {
            error,
            attempts_exhausted,
            ..
        } => {
            assert!(matches!(error, FetchError::Network { .. }), "got {error:?}");
            assert!(attempts_exhausted);
        }
        FetchOutcome::Success { .. } => panic!("expected failure"),
    }
}

// ==================== fetch_many Tests ====================

#[tokio::test]
async fn test_fetch_many_failure_does_not_affect_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fine"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let engine = create_engine(10, 3);
    let urls = vec![
        format!("{}/ok", server.uri()),
        format!("{}/broken", server.uri()),
    ];
    let outcomes = engine.fetch_many(&HttpClient::new(), urls.clone()).await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].url(), urls[0]);
    assert_eq!(outcomes[1].url(), urls[1]);
    assert!(matches!(&outcomes[0], FetchOutcome::Success { body, .. } if body == "fine"));
    assert!(matches!(
        &outcomes[1],
        FetchOutcome::Failure {
            attempts_exhausted: true,
            ..
        }
    ));
    assert_eq!(engine.stats().total(), 2);
}

#[tokio::test]
async fn test_fetch_many_empty_input() {
    let engine = create_engine(10, 3);
    let outcomes = engine.fetch_many(&HttpClient::new(), Vec::new()).await;
    assert!(outcomes.is_empty());
}

#[tokio::test]
async fn test_fetch_many_respects_concurrency_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(200)))
        .expect(4)
        .mount(&server)
        .await;

    let engine = create_engine(2, 1);
    let urls: Vec<String> = (0..4).map(|i| format!("{}/p/{i}", server.uri())).collect();
    let start = Instant::now();
    let outcomes = engine.fetch_many(&HttpClient::new(), urls).await;

    assert!(outcomes.iter().all(FetchOutcome::is_success));
    // Four 200ms responses through two slots take at least two rounds.
    assert!(start.elapsed() >= Duration::from_millis(400));
}

#[tokio::test]
async fn test_retry_sleep_releases_concurrency_slot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fine"))
        .expect(1)
        .mount(&server)
        .await;

    // One slot; /bad spends 800ms asleep between its two attempts.
    let engine = FetchEngine::new(
        1,
        RetryPolicy::new(2, Duration::from_millis(800)),
        Arc::new(RateLimiter::new()),
    )
    .unwrap();
    let client = HttpClient::new();
    let bad_url = format!("{}/bad", server.uri());
    let ok_url = format!("{}/ok", server.uri());

    let bad = engine.fetch_one(&client, &bad_url);
    let ok = async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let start = Instant::now();
        let outcome = engine.fetch_one(&client, &ok_url).await;
        (outcome, start.elapsed())
    };
    let (bad_outcome, (ok_outcome, ok_elapsed)) = tokio::join!(bad, ok);

    assert!(ok_outcome.is_success());
    assert!(
        ok_elapsed < Duration::from_millis(400),
        "/ok waited {ok_elapsed:?} behind a sleeping retry"
    );
    assert!(matches!(
        bad_outcome,
        FetchOutcome::Failure {
            attempts_exhausted: true,
            ..
        }
    ));
}

#[tokio::test]
async fn test_fetch_many_spaces_requests_by_crawl_delay() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let limiter = Arc::new(RateLimiter::new());
    limiter.set_delay("127.0.0.1", Duration::from_millis(150));
    let engine =
        FetchEngine::new(10, RetryPolicy::new(1, TEST_RETRY_DELAY), Arc::clone(&limiter)).unwrap();

    let urls: Vec<String> = (0..3).map(|i| format!("{}/p/{i}", server.uri())).collect();
    let start = Instant::now();
    let outcomes = engine.fetch_many(&HttpClient::new(), urls).await;

    assert_eq!(outcomes.len(), 3);
    assert!(start.elapsed() >= Duration::from_millis(300));
}
