//! Harvester Orchestrator
//!
//! The async half of the system. The orchestrator fetches a page, parses
//! it locally, then fans the CPU-bound work (screenshot, performance
//! analysis, thumbnail generation) out to the worker service over three
//! parallel dedicated connections, and joins everything into a single
//! aggregate document.
//!
//! Sub-task failures never fail the scrape: each failed call degrades to
//! its placeholder value (`null`, `{"error": ...}`, `[]`) so clients
//! always get the page data they asked for.

pub mod http_server;
pub mod orchestrator;
pub mod page;

pub use http_server::HttpServer;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
