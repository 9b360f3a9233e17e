//! CLI-specific utilities for butterfly-map
//!
//! Terminal presentation lives here, separate from the core library.

pub mod progress;

pub use progress::ProgressManager;
