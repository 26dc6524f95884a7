//! Minimal framed client for integration testing
//!
//! Speaks the server's length-prefixed JSON protocol over a real TCP
//! connection: one [`Request`] out, one [`Response`] back. Tests use
//! it the way the interactive client would, without any of the menu
//! machinery.

use postdrop::frame::{read_frame, write_frame};
use postdrop::{Request, Response, Result};
use std::net::SocketAddr;
use tokio::net::TcpStream;

pub struct NetClient {
    stream: TcpStream,
}

impl NetClient {
    /// Connect to a test server.
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr)
            .await
            .expect("connect to test server");
        Self { stream }
    }

    /// Send a request without waiting for a response (logout, quit).
    pub async fn send(&mut self, request: &Request) {
        write_frame(&mut self.stream, request)
            .await
            .expect("send request frame");
    }

    /// Send raw bytes as-is, bypassing framing. For teardown tests.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        use tokio::io::AsyncWriteExt;
        self.stream.write_all(bytes).await.expect("send raw bytes");
        self.stream.flush().await.expect("flush raw bytes");
    }

    /// Read one response frame, transport errors included.
    pub async fn try_response(&mut self) -> Result<Response> {
        read_frame(&mut self.stream).await
    }

    /// Send a request and read its response.
    pub async fn roundtrip(&mut self, request: &Request) -> Response {
        self.send(request).await;
        self.try_response().await.expect("read response frame")
    }
}
