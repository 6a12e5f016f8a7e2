use crate::protocol::error::{HarvestError, Result};
use crate::protocol::{Message, MessageKind};

/// Bytes before the payload: 4-byte length prefix + 1 kind byte.
pub const HEADER_LEN: usize = 5;

/// Maximum frame size (100 MB). Screenshots travel as base64 so frames can
/// get large, but a corrupt length prefix must not drive allocation.
pub const MAX_FRAME_SIZE: usize = 100 * 1024 * 1024;

/// Codec between [`Message`] and the wire frame format.
///
/// # Wire Format
///
/// ```text
/// [4-byte length, u32 big-endian][1-byte kind][length-1 bytes JSON payload]
/// ```
///
/// The length field covers the kind byte plus the payload bytes. Decoding is
/// total and side-effect-free: any input that is not exactly one well-formed
/// frame yields [`HarvestError::MalformedFrame`].
///
/// # Example
///
/// ```
/// use harvester_common::protocol::Message;
/// use harvester_common::transport::FrameCodec;
///
/// let message = Message::screenshot_request("https://example.com", None);
/// let bytes = FrameCodec::encode(&message).unwrap();
/// assert_eq!(FrameCodec::decode(&bytes).unwrap(), message);
/// ```
pub struct FrameCodec;

impl FrameCodec {
    /// Encodes a message into one frame.
    ///
    /// Never fails for a message built through the [`Message`] constructors;
    /// the `Result` only carries the theoretical JSON serialization failure.
    pub fn encode(message: &Message) -> Result<Vec<u8>> {
        let payload = serde_json::to_vec(&message.payload)?;
        let length = (1 + payload.len()) as u32;

        let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
        frame.extend_from_slice(&length.to_be_bytes());
        frame.push(message.kind.as_byte());
        frame.extend_from_slice(&payload);
        Ok(frame)
    }

    /// Decodes exactly one frame.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::MalformedFrame`] if:
    /// - fewer than 5 bytes are supplied
    /// - the declared length does not match the supplied bytes
    /// - the declared length is zero or exceeds [`MAX_FRAME_SIZE`]
    /// - the kind byte is outside the protocol
    /// - the payload is not valid JSON
    pub fn decode(data: &[u8]) -> Result<Message> {
        if data.len() < HEADER_LEN {
            return Err(HarvestError::MalformedFrame(format!(
                "frame shorter than header: {} bytes",
                data.len()
            )));
        }

        let mut length_bytes = [0u8; 4];
        length_bytes.copy_from_slice(&data[..4]);
        let length = u32::from_be_bytes(length_bytes) as usize;

        if length == 0 {
            return Err(HarvestError::MalformedFrame(
                "declared length is zero".to_string(),
            ));
        }
        if length > MAX_FRAME_SIZE {
            return Err(HarvestError::MalformedFrame(format!(
                "declared length {} exceeds maximum {}",
                length, MAX_FRAME_SIZE
            )));
        }
        if data.len() - 4 != length {
            return Err(HarvestError::MalformedFrame(format!(
                "declared length {} does not match {} supplied bytes",
                length,
                data.len() - 4
            )));
        }

        let kind = MessageKind::from_byte(data[4]).ok_or_else(|| {
            HarvestError::MalformedFrame(format!("unknown kind byte {}", data[4]))
        })?;

        let payload = serde_json::from_slice(&data[HEADER_LEN..]).map_err(|e| {
            HarvestError::MalformedFrame(format!("payload is not valid JSON: {}", e))
        })?;

        Ok(Message::new(kind, payload))
    }
}
