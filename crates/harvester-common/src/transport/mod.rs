//! Harvester Transport Layer
//!
//! This module frames protocol messages onto TCP streams.
//!
//! # Architecture
//!
//! - **[`FrameCodec`]**: pure encode/decode between [`Message`] and frame
//!   bytes; no I/O, no side effects
//! - **[`FrameTransport`]**: blocking frame reads/writes over
//!   `std::net::TcpStream` (used by the worker service, one thread per
//!   connection)
//! - **[`FrameTransportAsync`]**: async frame reads/writes over
//!   `tokio::net::TcpStream` (used by the orchestrator's connection client)
//!
//! # Frame Size Limit
//!
//! Both transports reject frames larger than 100 MB before allocating the
//! payload buffer, so a bad length prefix cannot exhaust memory.
//!
//! [`Message`]: crate::protocol::Message

pub mod codec;
pub mod tcp;

pub use codec::FrameCodec;
pub use tcp::{FrameTransport, FrameTransportAsync};
