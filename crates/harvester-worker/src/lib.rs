//! Harvester Worker Service
//!
//! This crate provides the back-end half of the harvester system: a TCP
//! service that accepts one framed request per connection, executes the
//! matching CPU-heavy task on a bounded worker pool, and replies with one
//! framed response.
//!
//! # Concurrency Model
//!
//! Each accepted connection is handled on its own OS thread; all connection
//! threads share one fixed-size [`WorkerPool`]. A call into the pool blocks
//! the connection thread until the task settles, so once the pool is
//! saturated new connections queue behind its dispatch. That is deliberate
//! backpressure: throughput is throttled to available CPU parallelism.

pub mod pool;
pub mod service;
pub mod tasks;

pub use pool::{PoolConfig, TaskKind, WorkerPool};
pub use service::WorkerService;
