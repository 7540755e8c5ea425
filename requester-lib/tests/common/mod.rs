// requester-lib/tests/common/mod.rs

//! Minimal in-process HTTP/1.1 server for dispatcher tests.
//!
//! Every connection carries exactly one request and is closed after the
//! reply, so the number of connections being served at once equals the number
//! of requests in flight.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// What the server sends back for one request.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
    /// Held before answering, while the request counts as in flight
    pub delay: Duration,
    /// Announce more bytes than are sent, then close the connection
    pub truncate: bool,
}

impl Reply {
    pub fn ok<B: Into<Vec<u8>>>(body: B) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: Duration::ZERO,
            truncate: false,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::ok("")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn truncated(mut self) -> Self {
        self.truncate = true;
        self
    }
}

type Handler = Arc<dyn Fn(&str, &[u8]) -> Reply + Send + Sync>;

#[derive(Default)]
struct Stats {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    hits: AtomicUsize,
}

pub struct TestServer {
    addr: SocketAddr,
    stats: Arc<Stats>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server whose replies are computed from method and body.
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&str, &[u8]) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stats = Arc::new(Stats::default());
        let handler: Handler = Arc::new(handler);

        let server_stats = Arc::clone(&stats);
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let handler = Arc::clone(&handler);
                let stats = Arc::clone(&server_stats);
                tokio::spawn(async move {
                    let _ = serve(stream, handler, stats).await;
                });
            }
        });

        Self {
            addr,
            stats,
            handle,
        }
    }

    /// Start a server that always sends the same reply.
    pub async fn fixed(reply: Reply) -> Self {
        Self::start(move |_, _| reply.clone()).await
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn max_in_flight(&self) -> usize {
        self.stats.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn hits(&self) -> usize {
        self.stats.hits.load(Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Address on which nothing is listening.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/", addr)
}

async fn serve(mut stream: TcpStream, handler: Handler, stats: Arc<Stats>) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let method = head.split_whitespace().next().unwrap_or("").to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    let current = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    stats.max_in_flight.fetch_max(current, Ordering::SeqCst);

    let reply = handler(&method, &body);
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    // leave the in-flight window before the client can see the reply
    stats.in_flight.fetch_sub(1, Ordering::SeqCst);
    stats.hits.fetch_add(1, Ordering::SeqCst);

    let announced = if reply.truncate {
        reply.body.len() + 100
    } else {
        reply.body.len()
    };
    let header = format!(
        "HTTP/1.1 {} Test\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        reply.status, announced
    );

    stream.write_all(header.as_bytes()).await?;
    stream.write_all(&reply.body).await?;
    stream.flush().await?;
    stream.shutdown().await
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}
