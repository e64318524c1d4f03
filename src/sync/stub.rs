//! In-process HTTP ledger used by the sync tests.

use std::io;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// Answers each connection with the next scripted reply; the last reply
/// repeats once the script runs out.
pub(crate) struct StubLedger {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubLedger {
    pub(crate) async fn spawn(statuses: Vec<u16>) -> Self {
        Self::spawn_with_bodies(statuses.into_iter().map(|s| (s, String::new())).collect()).await
    }

    /// Serves `body` as JSON with `status` on every request.
    pub(crate) async fn spawn_json(status: u16, body: &str) -> Self {
        Self::spawn_with_bodies(vec![(status, body.to_string())]).await
    }

    async fn spawn_with_bodies(replies: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        tokio::spawn(async move {
            let mut served = 0usize;
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let (status, body) = replies
                    .get(served)
                    .or(replies.last())
                    .cloned()
                    .unwrap_or((200, String::new()));
                served += 1;
                let _ = answer(stream, status, &body, &recorded).await;
            }
        });

        Self { base_url, requests }
    }

    /// Accepts connections and never answers them.
    pub(crate) async fn spawn_silent() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        Self {
            base_url,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Base URL of a port nobody listens on.
    pub(crate) async fn closed_base_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Records the request before replying, so a caller that has seen the
/// response always finds its request recorded.
async fn answer(
    mut stream: TcpStream,
    status: u16,
    reply: &str,
    recorded: &Mutex<Vec<RecordedRequest>>,
) -> io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body_end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).into_owned();

    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();

    recorded
        .lock()
        .unwrap()
        .push(RecordedRequest { method, path, body });

    let reason = if status == 200 { "OK" } else { "Error" };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{reply}",
        reply.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}
