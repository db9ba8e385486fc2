//! Probe transport.
//!
//! The health engine only needs "send a GET, tell me the status". Anything
//! that can do that implements `ProbeTransport`; the default uses the
//! hyper-util legacy client over a rustls connector, so `http` and `https`
//! endpoints are both probed.

use futures_util::future::BoxFuture;
use http_body_util::Empty;
use hyper::body::Bytes;
use hyper::http::{Request, StatusCode, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

/// User agent sent with every probe.
pub const PROBE_USER_AGENT: &str = "reverse-proxy-health-check";

/// Why a probe did not produce a status code.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid probe uri '{0}'")]
    InvalidUri(String),

    #[error("probe transport error: {0}")]
    Transport(String),

    #[error("probe timed out")]
    Timeout,
}

/// Issues health probe requests.
pub trait ProbeTransport: Send + Sync + 'static {
    /// Send a probe and return the response status.
    fn probe(&self, uri: Uri) -> BoxFuture<'static, Result<StatusCode, ProbeError>>;
}

/// Probe transport backed by the hyper-util legacy client.
#[derive(Clone)]
pub struct HyperProbeTransport {
    client: Client<HttpsConnector<HttpConnector>, Empty<Bytes>>,
}

impl HyperProbeTransport {
    /// Client trusting the webpki root store.
    pub fn new() -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);

        let https = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new()).build(https);
        Self { client }
    }
}

impl Default for HyperProbeTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeTransport for HyperProbeTransport {
    fn probe(&self, uri: Uri) -> BoxFuture<'static, Result<StatusCode, ProbeError>> {
        let client = self.client.clone();
        Box::pin(async move {
            let request = Request::builder()
                .method("GET")
                .uri(uri)
                .header("user-agent", PROBE_USER_AGENT)
                .body(Empty::<Bytes>::new())
                .map_err(|e| ProbeError::Transport(e.to_string()))?;

            let response = client
                .request(request)
                .await
                .map_err(|e| ProbeError::Transport(e.to_string()))?;
            Ok(response.status())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_https_endpoint_gets_tls_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = tokio::spawn(async move {
            // Close right away; the TLS handshake cannot complete.
            listener.accept().await.is_ok()
        });

        let uri: Uri = format!("https://{addr}/health").parse().unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), HyperProbeTransport::new().probe(uri))
            .await
            .expect("probe did not finish");

        assert!(matches!(result, Err(ProbeError::Transport(_))));
        assert!(accepted.await.unwrap(), "no TCP connection for an https endpoint");
    }

    #[tokio::test]
    async fn test_http_endpoint_returns_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            use tokio::io::{AsyncReadExt, AsyncWriteExt};
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n")
                .await;
        });

        let uri: Uri = format!("http://{addr}/health").parse().unwrap();
        let status = HyperProbeTransport::new().probe(uri).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
