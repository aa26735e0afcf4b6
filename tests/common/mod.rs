//! Shared helpers: a canned tunnel registry and a scripted connector.

#![allow(dead_code)]

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rsd_tunnels::{session_name, ConnectError, ConnectRequest, HostPort, RsdConnect};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Registry body from the reference scenario: A on a kernel tunnel, B on a userspace one.
pub const TWO_DEVICES: &str = r#"[
    {"udid": "A", "address": "10.0.0.1", "rsdPort": 100, "userspaceTun": false, "userspaceTunPort": 0},
    {"udid": "B", "address": "10.0.0.2", "rsdPort": 200, "userspaceTun": true, "userspaceTunPort": 300}
]"#;

/// HTTP server answering every request with one canned response.
pub struct FakeRegistry {
    pub address: HostPort,
    hits: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl FakeRegistry {
    /// Serve `body` with HTTP `status` on an ephemeral loopback port.
    pub async fn serve(status: u16, body: impl Into<String>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let body: String = body.into();
        let body: Arc<str> = Arc::from(body);
        let hits = Arc::new(AtomicUsize::new(0));
        let paths = Arc::new(Mutex::new(Vec::new()));

        let task = {
            let hits = Arc::clone(&hits);
            let paths = Arc::clone(&paths);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let body = Arc::clone(&body);
                    let paths = Arc::clone(&paths);
                    tokio::spawn(async move {
                        let _ = respond(stream, status, &body, &paths).await;
                    });
                }
            })
        };

        Ok(Self {
            address: HostPort::new("127.0.0.1", port),
            hits,
            paths,
            task,
        })
    }

    /// Number of connections accepted so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Request paths seen so far.
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

impl Drop for FakeRegistry {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn respond(
    mut stream: TcpStream,
    status: u16,
    body: &str,
    paths: &Mutex<Vec<String>>,
) -> anyhow::Result<()> {
    let mut request: Vec<u8> = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&request);
    if let Some(path) = head.split_whitespace().nth(1) {
        paths.lock().unwrap().push(path.to_string());
    }

    let response = format!(
        "HTTP/1.1 {status} Fake\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// A loopback address nothing listens on.
pub async fn dead_address() -> HostPort {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    HostPort::new("127.0.0.1", port)
}

/// Connector that refuses a fixed set of devices and records every request.
#[derive(Default)]
pub struct ScriptedConnector {
    refused: HashSet<String>,
    dialed: Mutex<Vec<ConnectRequest>>,
}

impl ScriptedConnector {
    pub fn refusing(udids: &[&str]) -> Self {
        Self {
            refused: udids.iter().map(|u| session_name(u)).collect(),
            dialed: Mutex::new(Vec::new()),
        }
    }

    pub fn dialed(&self) -> Vec<ConnectRequest> {
        self.dialed.lock().unwrap().clone()
    }
}

impl RsdConnect for ScriptedConnector {
    type Session = ConnectRequest;

    fn connect(
        &self,
        request: ConnectRequest,
    ) -> impl Future<Output = Result<ConnectRequest, ConnectError>> + Send {
        self.dialed.lock().unwrap().push(request.clone());
        let refused = self.refused.contains(&request.name);
        async move {
            if refused {
                Err(ConnectError::Io(std::io::Error::from(
                    std::io::ErrorKind::ConnectionRefused,
                )))
            } else {
                Ok(request)
            }
        }
    }
}
