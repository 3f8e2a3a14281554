//! One-shot local HTTP server standing in for the synthesis endpoint in tests.

use std::{io, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

#[derive(Debug)]
pub struct StubServer {
    url: String,
    handle: JoinHandle<io::Result<Vec<u8>>>,
}

impl StubServer {
    /// Answer the first request with `status` and `body`.
    pub async fn respond(status: u16, body: impl Into<Vec<u8>>) -> io::Result<Self> {
        let body = body.into();
        Self::spawn(Some((status, body))).await
    }

    /// Read the first request and never answer it.
    pub async fn hang() -> io::Result<Self> {
        Self::spawn(None).await
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw bytes of the first request, if one arrives within `wait`.
    pub async fn request_within(mut self, wait: Duration) -> Option<Vec<u8>> {
        match tokio::time::timeout(wait, &mut self.handle).await {
            Ok(Ok(Ok(request))) => Some(request),
            Ok(_) => None,
            Err(_) => {
                self.handle.abort();
                None
            }
        }
    }

    async fn spawn(response: Option<(u16, Vec<u8>)>) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}/try-on-file", listener.local_addr()?);

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await?;
            let request = read_request(&mut socket).await?;

            match response {
                Some((status, body)) => {
                    let head = format!(
                        "HTTP/1.1 {status} Stub\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
                        body.len()
                    );
                    socket.write_all(head.as_bytes()).await?;
                    socket.write_all(&body).await?;
                    socket.shutdown().await?;
                }
                None => tokio::time::sleep(Duration::from_secs(3600)).await,
            }

            Ok(request)
        });

        Ok(Self { url, handle })
    }
}

// Reads headers plus a `Content-Length` body
async fn read_request(socket: &mut TcpStream) -> io::Result<Vec<u8>> {
    let mut request = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(request);
        }
        request.extend_from_slice(&chunk[..n]);

        let Some(head_end) = find(&request, b"\r\n\r\n") else {
            continue;
        };

        let head = String::from_utf8_lossy(&request[..head_end]).to_ascii_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        if request.len() >= head_end + 4 + content_length {
            return Ok(request);
        }
    }
}

pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
