//! Integration tests for `XSearchClient` using wiremock HTTP mocks.

use std::time::Duration;

use brandpulse_core::BrandConfig;
use brandpulse_insights::{InsightsError, MentionSource, RetryPolicy, SearchOptions, XSearchClient};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn options() -> SearchOptions {
    SearchOptions {
        page_delay: Duration::ZERO,
        ..SearchOptions::default()
    }
}

fn test_client(base_url: &str, options: SearchOptions, policy: RetryPolicy) -> XSearchClient {
    XSearchClient::with_base_url(Some("test-token".to_owned()), 30, base_url, policy, options)
        .expect("client construction should not fail")
}

fn tweet(id: &str, text: &str, author: &str) -> Value {
    json!({
        "id": id,
        "text": text,
        "author_id": author,
        "created_at": "2025-03-01T12:00:00.000Z",
        "public_metrics": {"like_count": 2, "retweet_count": 0, "reply_count": 1, "quote_count": 0}
    })
}

fn users() -> Value {
    json!([
        {"id": "big", "username": "big", "public_metrics": {"followers_count": 25000}},
        {"id": "small", "username": "small", "public_metrics": {"followers_count": 12}}
    ])
}

fn page(tweets: Vec<Value>, next_token: Option<&str>) -> Value {
    let mut meta = json!({"result_count": tweets.len()});
    if let Some(token) = next_token {
        meta["next_token"] = json!(token);
    }
    json!({"data": tweets, "includes": {"users": users()}, "meta": meta})
}

fn brand() -> BrandConfig {
    let mut brand = BrandConfig::adhoc("Acme");
    brand.handle = Some("@acmegear".to_owned());
    brand
}

#[tokio::test]
async fn pages_until_next_token_runs_out_and_filters_each_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param("max_results", "100"))
        .and(query_param_is_missing("next_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![
                tweet("1", "Acme tent survived the storm", "big"),
                tweet("2", "Acme is fine I guess", "small"),
                tweet("3", "WIN a GIVEAWAY from Acme", "big"),
            ],
            Some("page-2"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/2/tweets/search/recent"))
        .and(query_param("next_token", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![
                tweet("4", "Acme shipping was slow", "big"),
                tweet("1", "Acme tent survived the storm", "big"),
            ],
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&format!("{}/2", server.uri()), options(), RetryPolicy::none());
    let mentions = client.search_mentions(&brand()).await.expect("should fetch");

    let ids: Vec<&str> = mentions.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "4"]);
    assert_eq!(mentions[0].author_id, "big");
    assert_eq!(mentions[0].metrics.replies, 1);
}

#[tokio::test]
async fn stops_at_target_count() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![
                tweet("1", "first", "big"),
                tweet("2", "second", "big"),
                tweet("3", "third", "big"),
            ],
            Some("more"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let opts = SearchOptions {
        target_count: 2,
        ..options()
    };
    let client = test_client(&server.uri(), opts, RetryPolicy::none());
    let mentions = client.search_mentions(&brand()).await.expect("should fetch");
    assert_eq!(mentions.len(), 2);
}

#[tokio::test]
async fn respects_page_cap() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![tweet("1", "only", "big")], Some("again"))),
        )
        .expect(3)
        .mount(&server)
        .await;

    let opts = SearchOptions {
        max_pages: 3,
        ..options()
    };
    let client = test_client(&server.uri(), opts, RetryPolicy::none());
    let mentions = client.search_mentions(&brand()).await.expect("should fetch");
    assert_eq!(mentions.len(), 1);
}

#[tokio::test]
async fn rate_limit_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(vec![tweet("7", "ok", "big")], None)),
        )
        .mount(&server)
        .await;

    let policy = RetryPolicy {
        max_retries: 2,
        backoff_base_ms: 0,
    };
    let client = test_client(&server.uri(), options(), policy);
    let mentions = client.search_mentions(&brand()).await.expect("should retry");
    assert_eq!(mentions.len(), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn exhausted_rate_limit_surfaces_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), options(), RetryPolicy::none());
    let err = client.search_mentions(&brand()).await.unwrap_err();
    assert!(matches!(
        err,
        InsightsError::RateLimited {
            retry_after_secs: 0,
            ..
        }
    ));
}

#[tokio::test]
async fn first_page_error_is_returned() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad query"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), options(), RetryPolicy::default());
    let err = client.search_mentions(&brand()).await.unwrap_err();
    assert!(matches!(err, InsightsError::UnexpectedStatus { status: 400, .. }));
}

#[tokio::test]
async fn later_page_error_keeps_earlier_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param_is_missing("next_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![tweet("1", "kept", "big")], Some("p2"))),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("next_token", "p2"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), options(), RetryPolicy::none());
    let mentions = client.search_mentions(&brand()).await.expect("should degrade");
    assert_eq!(mentions.len(), 1);
}

#[tokio::test]
async fn missing_token_fails_before_any_request() {
    let server = MockServer::start().await;
    let client =
        XSearchClient::with_base_url(None, 30, &server.uri(), RetryPolicy::none(), options())
            .expect("client construction should not fail");

    let err = client.search_mentions(&brand()).await.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.to_string(), "missing credential: set X_BEARER_TOKEN");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn brand_voice_queries_own_posts_with_media() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("query", "from:acmegear -is:retweet lang:en"))
        .and(query_param("expansions", "attachments.media_keys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "b1", "text": "Meet the Trailhead 2", "created_at": "2025-03-02T09:00:00.000Z",
                 "attachments": {"media_keys": ["3_1"]}},
                {"id": "b2", "text": "Happy trails"}
            ],
            "includes": {"media": [
                {"media_key": "3_1", "type": "photo", "url": "https://pbs/1.jpg", "alt_text": "tent", "width": 1200, "height": 800}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), options(), RetryPolicy::none());
    let posts = client.brand_voice(&brand()).await.expect("should fetch");

    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].media.len(), 1);
    assert_eq!(posts[0].media[0].url.as_deref(), Some("https://pbs/1.jpg"));
    assert_eq!(posts[0].media[0].width, Some(1200));
    assert!(posts[1].created_at.is_none());
    assert!(posts[1].media.is_empty());
}
