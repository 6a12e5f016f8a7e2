//! Harvester Common Types and Transport
//!
//! This crate provides the wire protocol definitions and the frame transport
//! layer shared by the harvester scraping system.
//!
//! # Overview
//!
//! Harvester is a two-service system: an orchestrator that accepts scrape
//! requests and a worker service that executes CPU-heavy processing tasks.
//! The two talk over a private TCP protocol defined here:
//!
//! - **Protocol Layer**: message kinds, payload constructors, and the shared
//!   error type
//! - **Transport Layer**: length-prefixed frame encoding plus sync and async
//!   stream helpers
//!
//! # Wire Format
//!
//! ```text
//! [4-byte length, u32 big-endian][1-byte kind][length-1 bytes JSON payload]
//! ```
//!
//! The length field covers the kind byte and the payload, so
//! `length = 1 + payload byte length`. A receiver reads exactly `length`
//! bytes past the length field before decoding; frame boundaries are never
//! inferred from payload content.
//!
//! # Example
//!
//! ```
//! use harvester_common::protocol::Message;
//! use harvester_common::transport::FrameCodec;
//!
//! let request = Message::screenshot_request("https://example.com", None);
//! let bytes = FrameCodec::encode(&request).unwrap();
//! let decoded = FrameCodec::decode(&bytes).unwrap();
//! assert_eq!(request, decoded);
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
