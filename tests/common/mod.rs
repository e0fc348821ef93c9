//! Shared utilities for integration tests.
//!
//! Mock upstreams speak just enough HTTP/1.1 to answer one request per
//! connection, which is all the gateway needs to be exercised end to end.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use api_gateway::config::GatewayConfig;
use api_gateway::http::HttpServer;
use api_gateway::lifecycle::Shutdown;

/// A request as seen by a mock upstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Read one request: head plus a `Content-Length` delimited body.
async fn read_request(socket: &mut TcpStream) -> RecordedRequest {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break buf.len(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or("GET").to_string();
    let target = request_line.next().unwrap_or("/").to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = buf[head_end..].to_vec();
    while body.len() < content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => body.extend_from_slice(&chunk[..n]),
        }
    }

    RecordedRequest {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    }
}

/// Read the request and return the request target (path and query).
async fn read_request_target(socket: &mut TcpStream) -> String {
    read_request(socket).await.target
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

async fn write_response(socket: &mut TcpStream, status: u16, content_type: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text(status),
        content_type,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives the request target and returns status and body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let target = read_request_target(&mut socket).await;
                let (status, body) = f(target).await;
                write_response(&mut socket, status, "text/plain", &body).await;
            });
        }
    });
    addr
}

/// Backend that answers every request with the request target it saw.
pub async fn start_echo_backend() -> SocketAddr {
    start_programmable_backend(|target| async move { (200, target) }).await
}

/// Backend that answers with the method, the `x-tenant` header and the body
/// it received, one per line.
pub async fn start_request_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let request = read_request(&mut socket).await;
                let body = format!(
                    "{}\n{}\n{}",
                    request.method,
                    request.header("x-tenant").unwrap_or("-"),
                    request.body
                );
                write_response(&mut socket, 200, "text/plain", &body).await;
            });
        }
    });
    addr
}

/// Backend that accepts connections and never answers. Returns the number
/// of accepted connections.
pub async fn start_hanging_backend() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let _socket = socket;
                tokio::time::sleep(Duration::from_secs(60)).await;
            });
        }
    });
    (addr, accepted)
}

/// Mock Eureka server under `/eureka`. `apps` maps upper-case application
/// names to the backend addresses registered as `UP`.
pub async fn start_mock_eureka(apps: Vec<(&'static str, Vec<SocketAddr>)>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let apps = Arc::new(apps);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let apps = apps.clone();
            tokio::spawn(async move {
                let target = read_request_target(&mut socket).await;
                let app = target.trim_start_matches("/eureka/apps/");
                match apps.iter().find(|(name, _)| *name == app) {
                    Some((name, instances)) => {
                        let body = eureka_application(name, instances);
                        write_response(&mut socket, 200, "application/json", &body).await;
                    }
                    None => write_response(&mut socket, 404, "application/json", "").await,
                }
            });
        }
    });
    addr
}

fn eureka_application(name: &str, instances: &[SocketAddr]) -> String {
    let instances: Vec<serde_json::Value> = instances
        .iter()
        .map(|addr| {
            serde_json::json!({
                "hostName": addr.ip().to_string(),
                "app": name,
                "status": "UP",
                "port": { "$": addr.port(), "@enabled": "true" },
                "securePort": { "$": 443, "@enabled": "false" },
            })
        })
        .collect();
    serde_json::json!({ "application": { "name": name, "instance": instances } }).to_string()
}

/// A gateway running in the background.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub config_updates: mpsc::UnboundedSender<GatewayConfig>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (config_updates, updates_rx) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });

    TestGateway {
        addr,
        shutdown,
        config_updates,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
