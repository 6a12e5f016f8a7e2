//! TCP worker service.
//!
//! Accepts connections and handles each on its own thread. One connection
//! carries exactly one request/response pair:
//!
//! ```text
//! AwaitHeader → AwaitPayload → Dispatch → AwaitPoolResult → Respond → Closed
//! ```
//!
//! A client that disconnects before a full frame arrives is dropped
//! silently. A task failure becomes an `ErrorResponse` frame, not a
//! dropped connection. Send-side socket errors are logged and swallowed so
//! one broken peer cannot affect its siblings.

use harvester_common::protocol::error::Result;
use harvester_common::protocol::{Message, MessageKind};
use harvester_common::transport::FrameTransport;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;

use crate::pool::{TaskKind, WorkerPool};

/// TCP service dispatching framed task requests onto a [`WorkerPool`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use harvester_worker::pool::{PoolConfig, WorkerPool};
/// use harvester_worker::service::WorkerService;
/// use harvester_worker::tasks;
///
/// let pool = Arc::new(WorkerPool::new(PoolConfig::default(), Arc::new(tasks::dispatch)));
/// let service = WorkerService::bind("0.0.0.0:9000", pool).unwrap();
/// service.run().unwrap();
/// ```
pub struct WorkerService {
    listener: TcpListener,
    pool: Arc<WorkerPool>,
}

impl WorkerService {
    /// Binds the service to an address. Use port 0 for an ephemeral port.
    pub fn bind(addr: &str, pool: Arc<WorkerPool>) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        tracing::info!(addr = %listener.local_addr()?, "worker service listening");
        Ok(Self { listener, pool })
    }

    /// The actual bound address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept loop. Blocks forever; each accepted connection gets its own
    /// thread, all sharing the one pool.
    pub fn run(&self) -> Result<()> {
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let pool = Arc::clone(&self.pool);
                    std::thread::spawn(move || handle_connection(stream, pool));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to accept connection");
                }
            }
        }
        Ok(())
    }
}

/// Handles one connection end to end: read one frame, dispatch, write one
/// frame, half-close, done.
fn handle_connection(mut stream: TcpStream, pool: Arc<WorkerPool>) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    tracing::debug!(%peer, "connection accepted");

    let request = match FrameTransport::read_frame(&mut stream) {
        Ok(Some(request)) => request,
        Ok(None) => {
            tracing::debug!(%peer, "peer disconnected before sending a full frame");
            return;
        }
        Err(e) => {
            // Malformed input gets no response; just drop the connection.
            tracing::warn!(%peer, error = %e, "dropping connection");
            return;
        }
    };

    let response = process_request(&pool, &request);

    if let Err(e) = FrameTransport::write_frame(&mut stream, &response) {
        tracing::warn!(%peer, error = %e, "failed to send response");
    }
    // Half-close the write side so the peer sees a clean end of response.
    if let Err(e) = stream.shutdown(Shutdown::Write) {
        tracing::debug!(%peer, error = %e, "shutdown after response failed");
    }
    tracing::debug!(%peer, "connection closed");
}

/// Maps a request to its task family, runs it on the pool, and converts
/// the outcome to a response frame. Every failure path yields an
/// `ErrorResponse`; the connection always gets exactly one frame back
/// once a request has been decoded.
fn process_request(pool: &WorkerPool, request: &Message) -> Message {
    let task_id = request.task_id();

    let kind = match request.kind {
        MessageKind::ScreenshotRequest => TaskKind::Screenshot,
        MessageKind::PerformanceRequest => TaskKind::Performance,
        MessageKind::ImageBatchRequest => TaskKind::ImageBatch,
        MessageKind::Response | MessageKind::ErrorResponse => {
            return Message::error_response(
                &format!("unexpected request kind: {:?}", request.kind),
                task_id,
            );
        }
    };

    match pool.submit_and_wait(kind, request.payload.clone()) {
        Ok(data) => Message::response(data, task_id),
        Err(e) => {
            tracing::warn!(error = %e, "task failed");
            Message::error_response(&e.to_string(), task_id)
        }
    }
}
