//! Pipeline execution

pub mod cancel;
pub mod runner;

pub use cancel::CancellationFlag;
pub use runner::{EventHandler, RunEvent, Runner};
