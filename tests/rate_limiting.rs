//! End-to-end rate limiting through a live gateway.

use std::sync::Arc;
use std::time::Duration;

use arcade_gateway::config::GatewayConfig;
use arcade_gateway::security::rate_limit::{
    FixedSampler, ManualClock, RateLimitPolicy, RateLimiter, DEFAULT_STALE_AFTER,
};
use reqwest::StatusCode;

mod common;

#[tokio::test]
async fn test_quota_enforced_over_http() {
    let backend = common::start_mock_backend("leaderboard").await;

    let mut config = GatewayConfig::default();
    config.routes.push(common::route(
        "leaderboard",
        "/api/leaderboard",
        backend,
        Some(RateLimitPolicy::new(2, 60)),
    ));
    let gateway = common::start_gateway(config).await;
    let client = common::client();
    let url = gateway.url("/api/leaderboard");

    for _ in 0..2 {
        let res = client.get(&url).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.text().await.unwrap(), "leaderboard");
    }

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = res.headers()["retry-after"].to_str().unwrap().parse().unwrap();
    assert!((1..=60).contains(&retry_after));
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "too_many_requests");

    // The rejected request was not recorded.
    assert_eq!(gateway.limiter.window("127.0.0.1").unwrap().len(), 2);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_route_without_policy_is_unlimited() {
    let backend = common::start_mock_backend("assets").await;

    let mut config = GatewayConfig::default();
    config.routes.push(common::route("assets", "/assets", backend, None));
    let gateway = common::start_gateway(config).await;
    let client = common::client();

    for _ in 0..25 {
        let res = client.get(gateway.url("/assets/logo.png")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
    assert_eq!(gateway.limiter.tracked_clients(), 0);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_window_slides() {
    let backend = common::start_mock_backend("matches").await;

    let mut config = GatewayConfig::default();
    config.routes.push(common::route(
        "matches",
        "/api/matches",
        backend,
        Some(RateLimitPolicy::new(1, 60)),
    ));

    let clock = ManualClock::new(0);
    let limiter = Arc::new(RateLimiter::with_parts(
        Arc::new(clock.clone()),
        Arc::new(FixedSampler::never()),
        DEFAULT_STALE_AFTER,
    ));
    let gateway = common::start_gateway_with(config, limiter).await;
    let client = common::client();
    let url = gateway.url("/api/matches");

    assert_eq!(client.get(&url).send().await.unwrap().status(), StatusCode::OK);
    assert_eq!(
        client.get(&url).send().await.unwrap().status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    clock.advance(Duration::from_secs(59));
    assert_eq!(
        client.get(&url).send().await.unwrap().status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    clock.advance(Duration::from_secs(1));
    assert_eq!(client.get(&url).send().await.unwrap().status(), StatusCode::OK);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_trusted_forwarded_for_separates_clients() {
    let backend = common::start_mock_backend("profile").await;

    let mut config = GatewayConfig::default();
    config.rate_limit.trust_forwarded_for = true;
    config.routes.push(common::route(
        "profile",
        "/api/profile",
        backend,
        Some(RateLimitPolicy::new(1, 60)),
    ));
    let gateway = common::start_gateway(config).await;
    let client = common::client();
    let url = gateway.url("/api/profile");

    let send = |ip: &'static str| {
        client
            .get(&url)
            .header("x-forwarded-for", ip)
            .send()
    };

    assert_eq!(send("203.0.113.1").await.unwrap().status(), StatusCode::OK);
    assert_eq!(
        send("203.0.113.1").await.unwrap().status(),
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(send("203.0.113.2").await.unwrap().status(), StatusCode::OK);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_untrusted_forwarded_for_is_ignored() {
    let backend = common::start_mock_backend("profile").await;

    let mut config = GatewayConfig::default();
    config.routes.push(common::route(
        "profile",
        "/api/profile",
        backend,
        Some(RateLimitPolicy::new(1, 60)),
    ));
    let gateway = common::start_gateway(config).await;
    let client = common::client();
    let url = gateway.url("/api/profile");

    let first = client.get(&url).header("x-forwarded-for", "203.0.113.1").send().await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    // Same TCP peer, so the spoofed header does not buy a fresh quota.
    let second = client.get(&url).header("x-forwarded-for", "203.0.113.2").send().await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_routes_share_client_history() {
    let backend = common::start_mock_backend("ok").await;

    let mut config = GatewayConfig::default();
    config.routes.push(common::route(
        "browse",
        "/api/browse",
        backend,
        Some(RateLimitPolicy::new(10, 60)),
    ));
    config.routes.push(common::route(
        "mint",
        "/api/mint",
        backend,
        Some(RateLimitPolicy::new(2, 60)),
    ));
    let gateway = common::start_gateway(config).await;
    let client = common::client();

    for _ in 0..2 {
        let res = client.get(gateway.url("/api/browse")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    // One registry keyed by client: browsing already filled the mint quota.
    let res = client.get(gateway.url("/api/mint")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    let res = client.get(gateway.url("/api/browse")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_unmatched_and_unreachable() {
    let mut config = GatewayConfig::default();
    config.routes.push(common::route(
        "dead",
        "/api/dead",
        "127.0.0.1:1".parse().unwrap(),
        Some(RateLimitPolicy::new(5, 60)),
    ));
    let gateway = common::start_gateway(config).await;
    let client = common::client();

    let res = client.get(gateway.url("/nowhere")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.get(gateway.url("/api/dead")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let gateway = common::start_gateway(GatewayConfig::default()).await;

    gateway.shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), gateway.handle)
        .await
        .expect("server did not stop")
        .unwrap();
}
