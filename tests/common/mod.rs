//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use async_trait::async_trait;
use hsp_proxy::lifecycle::startup::build_services;
use hsp_proxy::lifecycle::Shutdown;
use hsp_proxy::{HotelSupply, HttpServer, ProxyConfig, ProxyResult, RateBreakdownRequest, RateBreakdownResponse};

/// Read one HTTP/1.1 request and return its body.
async fn read_request(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(String::from_utf8_lossy(&buf[header_end..]).to_string())
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Start a programmable mock upstream on an ephemeral port.
///
/// `f` receives the request body and returns the status and body to send.
pub async fn start_programmable_upstream<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(body) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(body).await;

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text(status),
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

/// Mock upstream that always answers with `status` and counts its hits.
pub async fn start_failing_upstream(status: u16) -> (SocketAddr, Arc<AtomicU32>) {
    let hits = Arc::new(AtomicU32::new(0));
    let h = hits.clone();
    let addr = start_programmable_upstream(move |_| {
        let h = h.clone();
        async move {
            h.fetch_add(1, Ordering::SeqCst);
            (status, r#"{"error":"upstream failure"}"#.to_string())
        }
    })
    .await;
    (addr, hits)
}

/// Mock upstream that echoes the request as a rate breakdown response,
/// tagging `request_url` with `tag`, after `delay`.
pub async fn start_echo_upstream(tag: &'static str, delay: Duration) -> (SocketAddr, Arc<AtomicU32>) {
    let hits = Arc::new(AtomicU32::new(0));
    let h = hits.clone();
    let addr = start_programmable_upstream(move |body| {
        let h = h.clone();
        async move {
            h.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            let mut request: RateBreakdownRequest = serde_json::from_str(&body).unwrap_or_default();
            request.request_url = Some(tag.to_string());
            let response = RateBreakdownResponse { request, error: None };
            (200, serde_json::to_string(&response).unwrap())
        }
    })
    .await;
    (addr, hits)
}

/// Local service that counts the calls it answers.
#[derive(Default)]
pub struct CountingSupply {
    pub calls: AtomicU32,
}

#[async_trait]
impl HotelSupply for CountingSupply {
    fn name(&self) -> &str {
        "counting"
    }

    async fn rate_breakdown(&self, request: RateBreakdownRequest) -> ProxyResult<RateBreakdownResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RateBreakdownResponse { request, error: None })
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Serve `/ean/rate_breakdown` from `service` on an ephemeral port.
pub async fn start_upstream_server(service: Arc<dyn HotelSupply>, shutdown: &Shutdown) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::upstream(&ProxyConfig::default(), service);
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    addr
}

/// Serve the full business stack for `config` on an ephemeral port.
pub async fn start_business_server(config: &ProxyConfig, shutdown: &Shutdown) -> SocketAddr {
    let services = build_services(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::business(config, services.business);
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    addr
}

/// Default proxy configuration pointing at `instances`.
pub fn proxy_config(instances: &[SocketAddr]) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.upstream.instances = instances
        .iter()
        .map(SocketAddr::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    config
}

/// A client that does not reuse connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

pub fn sample_request() -> RateBreakdownRequest {
    RateBreakdownRequest {
        arrival: "2026-11-02".into(),
        departure: "2026-11-05".into(),
        currency: "USD".into(),
        ..Default::default()
    }
}
