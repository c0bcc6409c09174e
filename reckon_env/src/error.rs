//! Error types for the environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The update source was closed or unsubscribed
    #[error("Update source closed")]
    SourceClosed,
}
