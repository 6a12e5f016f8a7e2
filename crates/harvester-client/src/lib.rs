//! Harvester Worker Client
//!
//! One-connection-per-call client used by the orchestrator to reach the
//! worker service. The wire protocol has no correlation id, so every
//! sub-task gets its own dedicated socket: one frame out, one frame back,
//! connection dropped. Never multiplex requests on a shared connection.

pub mod client;

pub use client::WorkerClient;
