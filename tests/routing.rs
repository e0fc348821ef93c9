//! End-to-end routing through the gateway.

use std::time::Duration;

use api_gateway::config::{GatewayConfig, RouteConfig, StaticServiceConfig};

mod common;

fn static_service(name: &str, addr: std::net::SocketAddr) -> StaticServiceConfig {
    StaticServiceConfig {
        name: name.into(),
        instances: vec![format!("http://{addr}")],
    }
}

#[tokio::test]
async fn test_routes_service_and_rejects_unknown_paths() {
    let backend = common::start_echo_backend().await;

    let mut config = GatewayConfig::default();
    config.discovery.services.push(static_service("account-service", backend));
    config
        .routes
        .push(RouteConfig::service("account-service", "/api/v1/account", "account-service"));
    let gateway = common::start_gateway(config).await;
    let client = common::client();

    let res = client
        .get(gateway.url("/api/v1/account?id=42"))
        .send()
        .await
        .expect("Gateway unreachable");
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "/api/v1/account?id=42");

    let res = client.get(gateway.url("/api/v2/account")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.text().await.unwrap(), "No matching route found");

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_path_rewrites() {
    let backend = common::start_echo_backend().await;

    let mut config = GatewayConfig::default();
    config.discovery.services.push(static_service("account-service", backend));

    let mut docs = RouteConfig::service(
        "account-service-swagger",
        "/aggregate/account-service/v3/api-docs",
        "account-service",
    );
    docs.rewrite_path = Some("/api-docs".into());
    config.routes.push(docs);

    let mut web = RouteConfig::static_uri("discovery-service", "/eureka/web", &format!("http://{backend}"));
    web.rewrite_path = Some("/".into());
    config.routes.push(web);
    config.routes.push(RouteConfig::static_uri(
        "discovery-service-static",
        "/eureka/**",
        &format!("http://{backend}"),
    ));

    let gateway = common::start_gateway(config).await;
    let client = common::client();

    let body = client
        .get(gateway.url("/aggregate/account-service/v3/api-docs"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "/api-docs");

    let body = client.get(gateway.url("/eureka/web")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "/");

    let body = client
        .get(gateway.url("/eureka/css/wro.css"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "/eureka/css/wro.css");

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_config_reload_adds_route() {
    let backend = common::start_echo_backend().await;

    let mut config = GatewayConfig::default();
    config.discovery.services.push(static_service("account-service", backend));
    config
        .routes
        .push(RouteConfig::service("account-service", "/api/v1/account", "account-service"));
    let gateway = common::start_gateway(config.clone()).await;
    let client = common::client();

    let res = client.get(gateway.url("/api/v1/provisioning")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    let mut next = config;
    next.routes.push(RouteConfig::static_uri(
        "provisioning-service",
        "/api/v1/provisioning",
        &format!("http://{backend}"),
    ));
    gateway.config_updates.send(next).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let res = client.get(gateway.url("/api/v1/provisioning")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "/api/v1/provisioning");

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_forwards_method_headers_and_body() {
    let backend = common::start_request_echo_backend().await;

    let mut config = GatewayConfig::default();
    config.discovery.services.push(static_service("billing-service", backend));
    config
        .routes
        .push(RouteConfig::service("billing-service", "/api/v1/billing", "billing-service"));
    let gateway = common::start_gateway(config).await;

    let res = common::client()
        .post(gateway.url("/api/v1/billing"))
        .header("x-tenant", "acme")
        .body(r#"{"invoice":42}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "POST\nacme\n{\"invoice\":42}");

    let res = common::client()
        .delete(gateway.url("/api/v1/billing"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "DELETE\n-\n");

    gateway.shutdown.trigger();
}
