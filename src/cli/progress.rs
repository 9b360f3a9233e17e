//! Spinner shown on stderr while a backend call is in flight

use std::future::Future;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Creates a spinner for an operation of unknown length
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb
}

/// Owns the spinner for the lifetime of one request
pub struct ProgressManager {
    pub pb: ProgressBar,
}

impl ProgressManager {
    pub fn new(message: &str, quiet: bool) -> Self {
        let pb = if quiet {
            ProgressBar::hidden()
        } else {
            create_spinner(message)
        };
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    /// Spins until `future` resolves, then clears the line
    pub async fn run<F: Future>(self, future: F) -> F::Output {
        let output = future.await;
        self.pb.finish_and_clear();
        output
    }
}
