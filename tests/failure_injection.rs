//! Failure injection: breakers, fallbacks and discovery outages.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use api_gateway::config::{BreakerConfig, BreakerSettings, FallbackConfig, GatewayConfig, RouteConfig, StaticServiceConfig};

mod common;

fn account_config(backend: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.timeouts.upstream_ms = 300;
    config.breaker_defaults.failure_threshold = 3;
    config.breaker_defaults.open_duration_ms = 60_000;
    config.discovery.services.push(StaticServiceConfig {
        name: "account-service".into(),
        instances: vec![format!("http://{backend}")],
    });
    config
        .routes
        .push(RouteConfig::service("account-service", "/api/v1/account", "account-service"));
    config
}

#[tokio::test]
async fn test_timeouts_open_breaker_and_fallback_short_circuits() {
    let (backend, accepted) = common::start_hanging_backend().await;
    let gateway = common::start_gateway(account_config(backend)).await;
    let client = common::client();

    for _ in 0..3 {
        let res = client.get(gateway.url("/api/v1/account")).send().await.unwrap();
        assert_eq!(res.status(), 503);
        assert_eq!(res.text().await.unwrap(), "Service Unavailable");
    }
    assert_eq!(accepted.load(Ordering::SeqCst), 3);

    let started = Instant::now();
    let res = client.get(gateway.url("/api/v1/account")).send().await.unwrap();
    assert_eq!(res.status(), 503);
    assert!(started.elapsed() < Duration::from_millis(300), "open breaker must answer immediately");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(accepted.load(Ordering::SeqCst), 3, "open breaker must not contact the upstream");

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_breaker_recovers_through_half_open() {
    let healthy = Arc::new(AtomicU32::new(0));
    let flag = healthy.clone();
    let backend = common::start_programmable_backend(move |_| {
        let flag = flag.clone();
        async move {
            if flag.load(Ordering::SeqCst) == 1 {
                (200, "Recovered".into())
            } else {
                (500, "boom".into())
            }
        }
    })
    .await;

    let mut config = account_config(backend);
    config.breaker_defaults.open_duration_ms = 300;
    let gateway = common::start_gateway(config).await;
    let client = common::client();

    for _ in 0..3 {
        let res = client.get(gateway.url("/api/v1/account")).send().await.unwrap();
        assert_eq!(res.status(), 503);
    }

    healthy.store(1, Ordering::SeqCst);
    let res = client.get(gateway.url("/api/v1/account")).send().await.unwrap();
    assert_eq!(res.status(), 503, "breaker still open");

    tokio::time::sleep(Duration::from_millis(400)).await;
    let res = client.get(gateway.url("/api/v1/account")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "Recovered");

    let res = client.get(gateway.url("/api/v1/account")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_404_passes_through() {
    let backend = common::start_programmable_backend(|_| async { (404, "no such account".into()) }).await;
    let gateway = common::start_gateway(account_config(backend)).await;
    let client = common::client();

    for _ in 0..5 {
        let res = client.get(gateway.url("/api/v1/account")).send().await.unwrap();
        assert_eq!(res.status(), 404);
        assert_eq!(res.text().await.unwrap(), "no such account");
    }

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_shared_breaker_and_custom_fallback() {
    let (backend, _) = common::start_hanging_backend().await;

    let mut config = GatewayConfig::default();
    config.timeouts.upstream_ms = 200;
    config.breakers.push(BreakerConfig {
        id: "discoveryServiceCircuitBreaker".into(),
        settings: BreakerSettings {
            failure_threshold: 2,
            ..BreakerSettings::default()
        },
    });
    config.fallbacks.push(FallbackConfig {
        id: "registry-down".into(),
        body: "Registry unavailable".into(),
    });
    for (id, path) in [("discovery-service", "/eureka/web"), ("discovery-service-static", "/eureka/**")] {
        let mut route = RouteConfig::static_uri(id, path, &format!("http://{backend}"));
        route.breaker = Some("discoveryServiceCircuitBreaker".into());
        route.fallback = "registry-down".into();
        config.routes.push(route);
    }
    let gateway = common::start_gateway(config).await;
    let client = common::client();

    // One failure on each route opens the shared breaker.
    client.get(gateway.url("/eureka/web")).send().await.unwrap();
    client.get(gateway.url("/eureka/apps")).send().await.unwrap();

    let started = Instant::now();
    let res = client.get(gateway.url("/eureka/web")).send().await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(200));
    assert_eq!(res.status(), 503);
    assert_eq!(res.text().await.unwrap(), "Registry unavailable");

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_connection_refused_serves_fallback() {
    // Bind and drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);

    let gateway = common::start_gateway(account_config(dead)).await;
    let res = common::client().get(gateway.url("/api/v1/account")).send().await.unwrap();
    assert_eq!(res.status(), 503);
    assert_eq!(res.text().await.unwrap(), "Service Unavailable");

    gateway.shutdown.trigger();
}
