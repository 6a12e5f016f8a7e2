pub mod error;
pub mod message;

#[cfg(test)]
mod tests;

pub use error::{HarvestError, Result};
pub use message::{Message, MessageKind};
