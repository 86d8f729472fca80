//! In-memory server used by the client and session tests.

use bytes::BytesMut;
use parking_lot::Mutex;
use rivulet_protocol::{Request, RequestFrame, ResponseFrame};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

/// Encoded request frame for `request`.
pub fn request_bytes<R: Request>(request: &R) -> Vec<u8> {
    RequestFrame::from_request(request)
        .unwrap()
        .encode()
        .unwrap()
        .to_vec()
}

/// Encoded response frame.
pub fn response_bytes(response: ResponseFrame) -> Vec<u8> {
    response.encode().unwrap().to_vec()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ServerStats {
    pub requests: usize,
    /// Requests whose bytes arrived before the previous response was sent.
    pub interleaved: usize,
}

pub struct MockServer {
    stats: Arc<Mutex<ServerStats>>,
    task: JoinHandle<()>,
}

impl MockServer {
    pub fn stats(&self) -> ServerStats {
        *self.stats.lock()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawns a server answering each request frame with `handler`.
///
/// Before answering, the server waits briefly and records whether any bytes
/// of another request show up while this one is outstanding.
pub fn spawn_server<F>(mut handler: F) -> (DuplexStream, MockServer)
where
    F: FnMut(RequestFrame) -> ResponseFrame + Send + 'static,
{
    let (client, mut server) = tokio::io::duplex(64 * 1024);
    let stats = Arc::new(Mutex::new(ServerStats::default()));

    let task = tokio::spawn({
        let stats = stats.clone();
        async move {
            let mut buf = BytesMut::new();
            loop {
                let request = loop {
                    match RequestFrame::decode(&mut buf) {
                        Ok(Some(request)) => break request,
                        Ok(None) => {}
                        Err(_) => return,
                    }
                    match server.read_buf(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(_) => {}
                    }
                };

                let early = if buf.is_empty() {
                    matches!(
                        tokio::time::timeout(Duration::from_millis(1), server.read_buf(&mut buf))
                            .await,
                        Ok(Ok(n)) if n > 0
                    )
                } else {
                    true
                };
                {
                    let mut stats = stats.lock();
                    stats.requests += 1;
                    if early {
                        stats.interleaved += 1;
                    }
                }

                let response = handler(request);
                if server.write_all(&response_bytes(response)).await.is_err() {
                    return;
                }
            }
        }
    });

    (client, MockServer { stats, task })
}
