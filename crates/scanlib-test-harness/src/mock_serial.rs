//! Mock transport for deterministic testing of the protocol engine.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs. This lets you test command encoding and
//! response classification without a scanner attached.
//!
//! # Example
//!
//! ```
//! use scanlib_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // When the engine sends this line, answer with that one.
//! mock.expect(b"MDL\r", b"MDL,BC246T\r");
//! // An empty response simulates a scanner that never answers.
//! mock.expect(b"VER\r", b"");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

use scanlib_core::error::{Error, Result};
use scanlib_core::transport::Transport;

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    request: Vec<u8>,
    response: Vec<u8>,
}

/// A mock [`Transport`] for testing the protocol engine without hardware.
///
/// Expectations are consumed in order. When `send()` is called, the sent
/// data is recorded and matched against the next expectation. The
/// corresponding response is then returned by subsequent `receive()` calls,
/// at most `buf.len()` bytes at a time. Once the response is drained, or if
/// it was empty, `receive()` reports [`Error::Timeout`].
#[derive(Debug)]
pub struct MockTransport {
    expectations: VecDeque<Expectation>,
    pending_response: Option<Vec<u8>>,
    response_cursor: usize,
    connected: bool,
    sent_log: Vec<Vec<u8>>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            pending_response: None,
            response_cursor: 0,
            connected: true,
            sent_log: Vec::new(),
        }
    }

    /// Add an expected request/response pair.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// All data sent through this transport, one element per `send()`.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// Number of expectations not yet consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Set the connected state. While disconnected, `send()` and
    /// `receive()` return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        self.sent_log.push(data.to_vec());

        match self.expectations.pop_front() {
            Some(expectation) if data == expectation.request.as_slice() => {
                self.pending_response = Some(expectation.response);
                self.response_cursor = 0;
                Ok(())
            }
            Some(expectation) => Err(Error::Transport(format!(
                "unexpected send data: expected {:?}, got {:?}",
                String::from_utf8_lossy(&expectation.request),
                String::from_utf8_lossy(data)
            ))),
            None => Err(Error::Transport(
                "no more expectations in mock transport".into(),
            )),
        }
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        let Some(response) = self.pending_response.as_ref() else {
            return Err(Error::Timeout);
        };

        let remaining = &response[self.response_cursor..];
        if remaining.is_empty() {
            self.pending_response = None;
            self.response_cursor = 0;
            return Err(Error::Timeout);
        }

        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.response_cursor += n;
        if self.response_cursor >= response.len() {
            self.pending_response = None;
            self.response_cursor = 0;
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.pending_response = None;
        self.response_cursor = 0;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_then_receive_returns_response() {
        let mut mock = MockTransport::new();
        mock.expect(b"MDL\r", b"MDL,BC246T\r");

        mock.send(b"MDL\r").await.unwrap();

        let mut buf = [0u8; 64];
        let n = mock
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"MDL,BC246T\r");
        assert_eq!(mock.remaining_expectations(), 0);
    }

    #[tokio::test]
    async fn response_is_chunked_by_buffer_size() {
        let mut mock = MockTransport::new();
        mock.expect(b"VER\r", b"VER,1.06\r");
        mock.send(b"VER\r").await.unwrap();

        let mut buf = [0u8; 4];
        let mut got = Vec::new();
        while let Ok(n) = mock.receive(&mut buf, Duration::from_millis(10)).await {
            got.extend_from_slice(&buf[..n]);
        }
        assert_eq!(got, b"VER,1.06\r");
    }

    #[tokio::test]
    async fn tracks_sent_data() {
        let mut mock = MockTransport::new();
        mock.expect(b"PRG\r", b"PRG,OK\r");
        mock.expect(b"EPG\r", b"EPG,OK\r");

        mock.send(b"PRG\r").await.unwrap();
        mock.send(b"EPG\r").await.unwrap();

        assert_eq!(mock.sent_data(), &[b"PRG\r".to_vec(), b"EPG\r".to_vec()]);
    }

    #[tokio::test]
    async fn wrong_request_errors() {
        let mut mock = MockTransport::new();
        mock.expect(b"PRG\r", b"PRG,OK\r");

        let result = mock.send(b"EPG\r").await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn exhausted_expectations_error() {
        let mut mock = MockTransport::new();
        let result = mock.send(b"MDL\r").await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn empty_response_times_out() {
        let mut mock = MockTransport::new();
        mock.expect(b"SCT\r", b"");
        mock.send(b"SCT\r").await.unwrap();

        let mut buf = [0u8; 16];
        let result = mock.receive(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn disconnected_rejects_io() {
        let mut mock = MockTransport::new();
        mock.expect(b"MDL\r", b"MDL,BC246T\r");
        mock.set_connected(false);

        assert!(matches!(mock.send(b"MDL\r").await, Err(Error::NotConnected)));
        let mut buf = [0u8; 16];
        assert!(matches!(
            mock.receive(&mut buf, Duration::from_millis(10)).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn close_disconnects() {
        let mut mock = MockTransport::new();
        assert!(mock.is_connected());
        mock.close().await.unwrap();
        assert!(!mock.is_connected());
    }
}
