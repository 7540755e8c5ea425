// requester/tests/common/mod.rs

//! Blocking HTTP/1.1 stub server for driving the CLI binary.
//!
//! Routes:
//! - `/fail` answers 500
//! - `/slow` answers 200 after 300ms
//! - anything else answers 200 with `"<METHOD> <body>"` trimmed, so `GET /` yields `GET`

#![allow(dead_code)]

use assert_cmd::Command;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// Binary invocation isolated from the user's config files and REQUESTER_* variables.
pub fn requester_process(sandbox: &TempDir) -> std::process::Command {
    let mut cmd = std::process::Command::new(assert_cmd::cargo::cargo_bin("requester"));
    cmd.current_dir(sandbox.path())
        .env("HOME", sandbox.path())
        .env("XDG_CONFIG_HOME", sandbox.path())
        .env_remove("REQUESTER_PARALLEL")
        .env_remove("REQUESTER_METHOD")
        .env_remove("REQUESTER_USER_AGENT")
        .env_remove("REQUESTER_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

pub fn requester(sandbox: &TempDir) -> Command {
    let mut cmd = Command::from_std(requester_process(sandbox));
    cmd.timeout(Duration::from_secs(30));
    cmd
}

pub struct StubServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl StubServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let server_hits = Arc::clone(&hits);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else {
                    break;
                };
                let hits = Arc::clone(&server_hits);
                thread::spawn(move || {
                    let _ = handle(stream, &hits);
                });
            }
        });

        Self { addr, hits }
    }

    /// Requests whose head has been read, counted before the reply is sent.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// URL on which nothing is listening.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/", addr)
}

fn handle(mut stream: TcpStream, hits: &AtomicUsize) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut request_line = head.split_whitespace();
    let method = request_line.next().unwrap_or("").to_string();
    let path = request_line.next().unwrap_or("/").to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    hits.fetch_add(1, Ordering::SeqCst);

    let (status, reply) = match path.as_str() {
        "/fail" => (500, String::new()),
        "/slow" => {
            thread::sleep(Duration::from_millis(300));
            (200, "slow".to_string())
        }
        _ => {
            let echo = format!("{} {}", method, String::from_utf8_lossy(&body));
            (200, echo.trim().to_string())
        }
    };

    let response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reply.len(),
        reply
    );
    stream.write_all(response.as_bytes())?;
    stream.flush()
}
