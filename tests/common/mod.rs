//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use arcade_gateway::config::{GatewayConfig, RouteConfig};
use arcade_gateway::lifecycle::Shutdown;
use arcade_gateway::security::rate_limit::{
    FixedSampler, RateLimitPolicy, RateLimiter, SystemClock, DEFAULT_STALE_AFTER,
};
use arcade_gateway::HttpServer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Start a backend that answers every request with `200 OK` and `body`.
pub async fn start_mock_backend(body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        read_request_head(&mut socket).await;
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request_head(socket: &mut TcpStream) {
    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => {
                head.extend_from_slice(&chunk[..n]);
                if head.windows(4).any(|w| w == b"\r\n\r\n") {
                    return;
                }
            }
        }
    }
}

/// A running gateway on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub limiter: Arc<RateLimiter>,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<()>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a gateway on the system clock with sweeping disabled.
pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let limiter = Arc::new(RateLimiter::with_parts(
        Arc::new(SystemClock),
        Arc::new(FixedSampler::never()),
        DEFAULT_STALE_AFTER,
    ));
    start_gateway_with(config, limiter).await
}

pub async fn start_gateway_with(config: GatewayConfig, limiter: Arc<RateLimiter>) -> TestGateway {
    let server = HttpServer::with_limiter(config, limiter.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    TestGateway {
        addr,
        limiter,
        shutdown,
        handle,
    }
}

pub fn route(
    name: &str,
    path_prefix: &str,
    upstream: SocketAddr,
    rate_limit: Option<RateLimitPolicy>,
) -> RouteConfig {
    RouteConfig {
        name: name.into(),
        host: None,
        path_prefix: Some(path_prefix.into()),
        upstream: format!("http://{upstream}"),
        priority: 0,
        rate_limit: rate_limit.map(Into::into),
    }
}

/// A client that never pools connections or uses a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
