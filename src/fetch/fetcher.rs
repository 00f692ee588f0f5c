use super::traits::{PageFetcher, RateLimiter};
use crate::model::FetchError;

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    rate_limiter: Arc<dyn RateLimiter>,
}

impl HttpFetcher {
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            timeout,
            rate_limiter,
        })
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.rate_limiter.wait().await;
        info!("Working on url {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    timeout: self.timeout,
                }
            } else {
                transport(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| transport(url, e))
    }
}

fn transport(url: &str, e: reqwest::Error) -> FetchError {
    FetchError::Transport {
        url: url.to_string(),
        cause: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FixedDelay, Unthrottled};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio::time::{Instant, sleep};

    /// Serves one canned HTTP response on a local port and returns its URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "{}\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\
                 Connection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
        });
        format!("http://{}/cars", addr)
    }

    fn fetcher_with(timeout: Duration, rate_limiter: Arc<dyn RateLimiter>) -> HttpFetcher {
        HttpFetcher {
            client: Client::builder().no_proxy().timeout(timeout).build().unwrap(),
            timeout,
            rate_limiter,
        }
    }

    fn fetcher() -> HttpFetcher {
        fetcher_with(Duration::from_secs(5), Arc::new(Unthrottled))
    }

    #[tokio::test]
    async fn returns_body_of_successful_page() {
        let url = serve_once("HTTP/1.1 200 OK", "<html>cars</html>").await;

        assert_eq!(fetcher().fetch(&url).await.unwrap(), "<html>cars</html>");
    }

    #[tokio::test]
    async fn non_success_status_is_a_fetch_error() {
        let url = serve_once("HTTP/1.1 503 Service Unavailable", "busy").await;

        let err = fetcher().fetch(&url).await.unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/cars", listener.local_addr().unwrap());
        drop(listener);

        let err = fetcher().fetch(&url).await.unwrap_err();

        assert!(matches!(err, FetchError::Transport { .. }));
    }

    #[tokio::test]
    async fn waits_politeness_delay_before_sending() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/cars", listener.local_addr().unwrap());
        let (accepted_tx, accepted_rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let _ = accepted_tx.send(Instant::now());
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let body = "<html></html>";
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
        });
        let delay = Duration::from_millis(300);
        let fetcher = fetcher_with(Duration::from_secs(5), Arc::new(FixedDelay::new(delay)));
        let start = Instant::now();

        fetcher.fetch(&url).await.unwrap();

        let accepted_at = accepted_rx.await.unwrap();
        assert!(accepted_at.duration_since(start) >= delay);
    }

    #[tokio::test]
    async fn silent_server_is_a_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/cars", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            sleep(Duration::from_secs(30)).await;
            drop(socket);
        });
        let timeout = Duration::from_millis(200);

        let err = fetcher_with(timeout, Arc::new(Unthrottled))
            .fetch(&url)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FetchError::Timeout { timeout: t, .. } if t == timeout
        ));
    }
}
