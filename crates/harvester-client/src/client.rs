use harvester_common::protocol::error::{HarvestError, Result};
use harvester_common::protocol::Message;
use harvester_common::transport::FrameTransportAsync;
use std::time::Duration;

/// Client for one-shot calls to the worker service.
///
/// Each [`call`] opens a fresh TCP connection, sends one request frame,
/// reads exactly one response frame, and drops the connection. This is an
/// explicit design choice: with no correlation id in the protocol,
/// dedicated connections are what keeps responses from interleaving.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use harvester_client::WorkerClient;
/// use harvester_common::protocol::Message;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = WorkerClient::new("127.0.0.1:9000", Duration::from_secs(30));
/// let request = Message::screenshot_request("https://example.com", None);
/// let response = client.call(&request).await?;
/// # Ok(())
/// # }
/// ```
///
/// [`call`]: WorkerClient::call
#[derive(Clone)]
pub struct WorkerClient {
    addr: String,
    timeout: Duration,
}

impl WorkerClient {
    /// Creates a client for the worker service at `addr`.
    ///
    /// `timeout` bounds each complete call: connect, send, and the wait
    /// for the single response frame.
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    /// The worker service address this client targets.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Sends one request and waits for its response.
    ///
    /// # Errors
    ///
    /// - [`HarvestError::PeerUnavailable`] when the connection is refused
    ///   or reset
    /// - [`HarvestError::TaskTimeout`] when the deadline elapses
    /// - [`HarvestError::MalformedFrame`] when the response does not decode
    ///
    /// All of these are per-sub-task failures the caller is expected to
    /// absorb into a partial result; none should abort sibling calls.
    pub async fn call(&self, request: &Message) -> Result<Message> {
        tokio::time::timeout(self.timeout, self.call_inner(request))
            .await
            .map_err(|_| HarvestError::TaskTimeout(self.timeout.as_millis() as u64))?
    }

    async fn call_inner(&self, request: &Message) -> Result<Message> {
        let mut stream = FrameTransportAsync::connect(&self.addr, self.timeout).await?;
        tracing::debug!(addr = %self.addr, kind = ?request.kind, "sub-task call");
        FrameTransportAsync::write_frame(&mut stream, request).await?;
        let response = FrameTransportAsync::read_frame(&mut stream).await?;
        // Dropping the stream closes the dedicated connection.
        Ok(response)
    }
}
