//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use reverse_proxy_core::config::{
    ClusterConfig, EndpointConfig, HealthCheckConfig, ProxyConfig, RouteConfig,
};

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives the request line and returns the status and body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
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
                        let mut buf = vec![0u8; 4096];
                        let mut read = 0;
                        while let Ok(n) = socket.read(&mut buf[read..]).await {
                            if n == 0 {
                                break;
                            }
                            read += n;
                            if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") || read == buf.len() {
                                break;
                            }
                        }
                        let request = String::from_utf8_lossy(&buf[..read]).to_string();
                        let request_line = request.lines().next().unwrap_or_default().to_string();

                        let (status, body) = f(request_line).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
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

/// Backend whose health endpoint answers with whatever status the returned
/// switch holds (200 while `true`, 503 once flipped to `false`).
pub async fn start_switchable_backend() -> (SocketAddr, Arc<std::sync::atomic::AtomicBool>) {
    let healthy = Arc::new(std::sync::atomic::AtomicBool::new(true));
    let flag = healthy.clone();
    let addr = start_programmable_backend(move |_| {
        let up = flag.load(Ordering::SeqCst);
        async move {
            if up {
                (200, "ok".into())
            } else {
                (503, "down".into())
            }
        }
    })
    .await;
    (addr, healthy)
}

pub fn route(route_id: &str, path: &str, cluster_id: &str) -> RouteConfig {
    RouteConfig {
        route_id: route_id.into(),
        path: Some(path.into()),
        cluster_id: cluster_id.into(),
        ..Default::default()
    }
}

pub fn cluster(cluster_id: &str, endpoints: &[(&str, String)]) -> ClusterConfig {
    ClusterConfig {
        cluster_id: cluster_id.into(),
        endpoints: endpoints
            .iter()
            .map(|(id, address)| EndpointConfig::new(*id, address.clone()))
            .collect(),
        ..Default::default()
    }
}

pub fn with_health(mut cluster: ClusterConfig, health: HealthCheckConfig) -> ClusterConfig {
    cluster.health_check = Some(health);
    cluster
}

pub fn with_metadata(mut cluster: ClusterConfig, pairs: &[(&str, &str)]) -> ClusterConfig {
    cluster.metadata = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<HashMap<_, _>>();
    cluster
}

pub fn config(routes: Vec<RouteConfig>, clusters: Vec<ClusterConfig>) -> ProxyConfig {
    ProxyConfig {
        routes,
        clusters,
        ..Default::default()
    }
}

/// Unique path under the system temp dir.
pub fn temp_path(name: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!("proxy-core-{}-{}-{}", std::process::id(), n, name))
}
