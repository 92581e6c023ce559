use thiserror::Error;

/// Failures inside the relay core. None of these are fatal to the process;
/// each aborts at most the single operation that raised it.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The store could not persist a message. The send is aborted, nothing
    /// is broadcast, and only the originating session is told.
    #[error("failed to persist message: {0}")]
    Persistence(#[from] sqlx::Error),

    /// A structurally valid frame carried an unusable payload.
    #[error("invalid {event} event: {reason}")]
    InvalidEvent {
        event: &'static str,
        reason: &'static str,
    },
}
