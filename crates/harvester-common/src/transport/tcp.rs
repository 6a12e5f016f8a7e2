use std::io::{Read, Write};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::protocol::error::{HarvestError, Result};
use crate::protocol::Message;
use crate::transport::codec::{FrameCodec, HEADER_LEN, MAX_FRAME_SIZE};

/// Blocking frame transport over `std::net::TcpStream` (or any `Read`/`Write`).
///
/// This is the synchronous side of the wire protocol, used by the worker
/// service which handles each connection on its own thread.
///
/// # Example
///
/// ```no_run
/// use std::net::TcpStream;
/// use harvester_common::protocol::Message;
/// use harvester_common::transport::FrameTransport;
///
/// let mut stream = TcpStream::connect("127.0.0.1:9000").unwrap();
/// let request = Message::performance_request("https://example.com", None);
/// FrameTransport::write_frame(&mut stream, &request).unwrap();
/// let response = FrameTransport::read_frame(&mut stream).unwrap();
/// ```
pub struct FrameTransport;

impl FrameTransport {
    /// Writes one frame and flushes the stream.
    pub fn write_frame<W: Write>(writer: &mut W, message: &Message) -> Result<()> {
        let frame = FrameCodec::encode(message)?;
        writer.write_all(&frame)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads exactly one frame.
    ///
    /// Returns `Ok(None)` when the peer closed the connection before a
    /// complete frame arrived. At the header boundary this is a clean
    /// disconnect, mid-payload it is an aborted send; either way there is
    /// nothing to respond to.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::MalformedFrame`] when the frame violates the
    /// length or payload rules, and [`HarvestError::Io`] for other socket
    /// failures.
    pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Message>> {
        let mut header = [0u8; HEADER_LEN];
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let mut length_bytes = [0u8; 4];
        length_bytes.copy_from_slice(&header[..4]);
        let length = u32::from_be_bytes(length_bytes) as usize;

        if length == 0 || length > MAX_FRAME_SIZE {
            return Err(HarvestError::MalformedFrame(format!(
                "declared length {} outside 1..={}",
                length, MAX_FRAME_SIZE
            )));
        }

        let mut frame = vec![0u8; HEADER_LEN + length - 1];
        frame[..HEADER_LEN].copy_from_slice(&header);
        match reader.read_exact(&mut frame[HEADER_LEN..]) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        FrameCodec::decode(&frame).map(Some)
    }
}

/// Async frame transport over `tokio::net::TcpStream`.
///
/// This is the orchestrator side of the wire protocol. [`connect`] opens a
/// fresh connection with a bounded deadline; one request frame goes out, one
/// response frame comes back, and the stream is dropped. There is no
/// correlation id in the protocol, so connections are never reused.
///
/// [`connect`]: FrameTransportAsync::connect
pub struct FrameTransportAsync;

impl FrameTransportAsync {
    /// Connects to a remote endpoint within `timeout`.
    ///
    /// The address may resolve to multiple socket addresses; each is tried
    /// in turn until one succeeds.
    ///
    /// # Errors
    ///
    /// - [`HarvestError::TaskTimeout`] when the deadline elapses
    /// - [`HarvestError::PeerUnavailable`] when every resolved address
    ///   refuses the connection or the address does not resolve
    pub async fn connect(addr: &str, timeout: Duration) -> Result<tokio::net::TcpStream> {
        let socket_addrs: Vec<_> = tokio::net::lookup_host(addr)
            .await
            .map_err(|e| HarvestError::PeerUnavailable(format!("invalid address '{}': {}", addr, e)))?
            .collect();

        let mut last_err = None;
        for socket_addr in socket_addrs {
            match tokio::time::timeout(timeout, tokio::net::TcpStream::connect(&socket_addr)).await
            {
                Ok(Ok(stream)) => return Ok(stream),
                Ok(Err(e)) => last_err = Some(e),
                Err(_) => return Err(HarvestError::TaskTimeout(timeout.as_millis() as u64)),
            }
        }

        Err(HarvestError::PeerUnavailable(format!(
            "failed to connect to {}: {}",
            addr,
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no addresses resolved".to_string())
        )))
    }

    /// Writes one frame and flushes the stream.
    pub async fn write_frame(stream: &mut tokio::net::TcpStream, message: &Message) -> Result<()> {
        let frame = FrameCodec::encode(message)?;
        stream
            .write_all(&frame)
            .await
            .map_err(|e| Self::map_io_error(e, "writing frame"))?;
        stream
            .flush()
            .await
            .map_err(|e| Self::map_io_error(e, "flushing stream"))?;
        Ok(())
    }

    /// Reads exactly one frame.
    ///
    /// Unlike the blocking side, an early EOF here is an error: the client
    /// always expects exactly one response frame per connection.
    pub async fn read_frame(stream: &mut tokio::net::TcpStream) -> Result<Message> {
        let mut header = [0u8; HEADER_LEN];
        stream
            .read_exact(&mut header)
            .await
            .map_err(|e| Self::map_io_error(e, "reading frame header"))?;

        let mut length_bytes = [0u8; 4];
        length_bytes.copy_from_slice(&header[..4]);
        let length = u32::from_be_bytes(length_bytes) as usize;

        if length == 0 || length > MAX_FRAME_SIZE {
            return Err(HarvestError::MalformedFrame(format!(
                "declared length {} outside 1..={}",
                length, MAX_FRAME_SIZE
            )));
        }

        let mut frame = vec![0u8; HEADER_LEN + length - 1];
        frame[..HEADER_LEN].copy_from_slice(&header);
        stream
            .read_exact(&mut frame[HEADER_LEN..])
            .await
            .map_err(|e| Self::map_io_error(e, "reading frame payload"))?;

        FrameCodec::decode(&frame)
    }

    /// Maps IO errors to protocol error variants: connection loss becomes
    /// `PeerUnavailable` so callers can treat it as a degraded sub-task.
    fn map_io_error(err: std::io::Error, context: &str) -> HarvestError {
        match err.kind() {
            std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::NotConnected
            | std::io::ErrorKind::UnexpectedEof => {
                HarvestError::PeerUnavailable(format!("{}: connection lost", context))
            }
            _ => HarvestError::Io(err),
        }
    }
}
