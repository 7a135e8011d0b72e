//! HTTP probing.
//!
//! Sends a HEAD request first and falls back to GET when the server rejects
//! HEAD or answers with something other than success/redirect. Redirects are
//! followed; only the final hop's status and URL are kept.

mod status;

pub use status::{describe_status, UNKNOWN_STATUS};

use crate::error::{HttpProbeError, HttpResult};
use crate::types::{Domain, HttpProbeResult};
use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// User agent sent with every probe.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Redirect hops followed before giving up on a chain.
pub const MAX_REDIRECTS: usize = 10;

/// Anything that can fetch the HTTP status of a domain.
#[async_trait]
pub trait HttpProbe: Send + Sync {
    async fn probe(&self, domain: &Domain) -> HttpResult<HttpProbeResult>;
}

/// `reqwest`-backed prober.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
    attempts: u32,
}

impl HttpProber {
    /// Prober honoring the system proxy settings.
    ///
    /// `attempts` bounds how many times a transport failure is retried; it is
    /// clamped to at least one.
    pub fn new(timeout: Duration, attempts: u32) -> HttpResult<Self> {
        Self::build(timeout, attempts, true)
    }

    /// Prober that always connects directly.
    pub fn direct(timeout: Duration, attempts: u32) -> HttpResult<Self> {
        Self::build(timeout, attempts, false)
    }

    fn build(timeout: Duration, attempts: u32, use_proxy: bool) -> HttpResult<Self> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .user_agent(BROWSER_USER_AGENT)
            .danger_accept_invalid_certs(true);

        if !use_proxy {
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(|e| HttpProbeError::Client(e.to_string()))?;

        Ok(Self {
            client,
            attempts: attempts.max(1),
        })
    }

    async fn probe_once(&self, url: &Url) -> HttpResult<HttpProbeResult> {
        let head = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = head.status();
        if status != StatusCode::METHOD_NOT_ALLOWED
            && (status.is_success() || status.is_redirection())
        {
            return Ok(final_hop(&head));
        }

        debug!(%url, %status, "HEAD not accepted, retrying with GET");

        let get = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        Ok(final_hop(&get))
    }
}

#[async_trait]
impl HttpProbe for HttpProber {
    async fn probe(&self, domain: &Domain) -> HttpResult<HttpProbeResult> {
        let raw = domain.url();
        let url = Url::parse(&raw).map_err(|_| HttpProbeError::InvalidUrl(raw.clone()))?;

        let mut attempt = 1;
        loop {
            match self.probe_once(&url).await {
                Ok(result) => {
                    info!(
                        %url,
                        status = ?result.status_code,
                        final_url = ?result.final_url,
                        "HTTP probe complete"
                    );
                    return Ok(result);
                }
                Err(e) if attempt < self.attempts => {
                    warn!(%url, attempt, error = %e, "HTTP probe failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn final_hop(response: &Response) -> HttpProbeResult {
    HttpProbeResult::from_status(response.status().as_u16(), Some(response.url().to_string()))
}

fn transport_error(url: &Url, err: reqwest::Error) -> HttpProbeError {
    let url = url.to_string();
    if err.is_timeout() {
        HttpProbeError::Timeout { url }
    } else if err.is_connect() {
        HttpProbeError::Connect {
            url,
            reason: err.to_string(),
        }
    } else {
        HttpProbeError::Request {
            url,
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn response(status: &str, extra_headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
            status,
            body.len(),
            extra_headers,
            body
        )
    }

    /// Minimal HTTP server answering each request through `handler`.
    async fn spawn_stub(handler: fn(&str) -> String) -> (SocketAddr, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&requests);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).to_string();
                    let _ = socket.write_all(handler(&request).as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (addr, requests)
    }

    fn prober() -> HttpProber {
        HttpProber::direct(Duration::from_secs(5), 1).unwrap()
    }

    fn domain_for(addr: SocketAddr) -> Domain {
        Domain::new(addr.to_string())
    }

    #[tokio::test]
    async fn test_head_405_falls_back_to_get() {
        let (addr, _) = spawn_stub(|request| {
            if request.starts_with("HEAD") {
                response("405 Method Not Allowed", "", "")
            } else {
                response("200 OK", "", "ok")
            }
        })
        .await;

        let result = prober().probe(&domain_for(addr)).await.unwrap();

        assert_eq!(result.status_code, Some(200));
        assert_eq!(result.description, "OK");
    }

    #[tokio::test]
    async fn test_successful_head_is_final() {
        let (addr, requests) = spawn_stub(|request| {
            if request.starts_with("HEAD") {
                response("200 OK", "", "")
            } else {
                response("500 Internal Server Error", "", "")
            }
        })
        .await;

        let result = prober().probe(&domain_for(addr)).await.unwrap();

        assert_eq!(result.status_code, Some(200));
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_status_is_retried_with_get() {
        let (addr, requests) = spawn_stub(|_| response("404 Not Found", "", "")).await;

        let result = prober().probe(&domain_for(addr)).await.unwrap();

        assert_eq!(result.status_code, Some(404));
        assert_eq!(result.description, "Not Found");
        assert_eq!(requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_redirects_are_followed() {
        let (addr, _) = spawn_stub(|request| {
            if request.contains(" /final ") {
                response("200 OK", "", "")
            } else {
                response("301 Moved Permanently", "Location: /final\r\n", "")
            }
        })
        .await;

        let result = prober().probe(&domain_for(addr)).await.unwrap();

        assert_eq!(result.status_code, Some(200));
        assert_eq!(result.final_url, Some(format!("http://{}/final", addr)));
    }

    #[tokio::test]
    async fn test_unknown_status_description() {
        let (addr, _) = spawn_stub(|_| response("418 I'm a teapot", "", "")).await;

        let result = prober().probe(&domain_for(addr)).await.unwrap();

        assert_eq!(result.status_code, Some(418));
        assert_eq!(result.description, UNKNOWN_STATUS);
    }

    #[tokio::test]
    async fn test_connection_refused_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = HttpProber::direct(Duration::from_secs(2), 2)
            .unwrap()
            .probe(&domain_for(addr))
            .await;

        assert!(matches!(result, Err(HttpProbeError::Connect { .. })));
    }

    /// Listener that accepts connections and hands each socket to `handle`.
    async fn spawn_listener<F, Fut>(handle: F) -> (SocketAddr, Arc<AtomicUsize>)
    where
        F: Fn(tokio::net::TcpStream) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&connections);

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(handle(socket));
            }
        });

        (addr, connections)
    }

    #[tokio::test]
    async fn test_transport_failures_use_every_attempt() {
        let (addr, connections) = spawn_listener(|socket| async move { drop(socket) }).await;

        let result = HttpProber::direct(Duration::from_secs(2), 3)
            .unwrap()
            .probe(&domain_for(addr))
            .await;

        assert!(result.is_err());
        assert_eq!(connections.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let (addr, _) = spawn_listener(|socket| async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        })
        .await;

        let result = HttpProber::direct(Duration::from_millis(300), 1)
            .unwrap()
            .probe(&domain_for(addr))
            .await;

        assert!(matches!(result, Err(HttpProbeError::Timeout { .. })));
    }
}
