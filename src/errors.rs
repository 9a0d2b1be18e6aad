use thiserror::Error;

/// Typed error hierarchy for classline.
///
/// Used at module boundaries (the LMS and media gateway clients). Internal/leaf
/// functions can continue using `anyhow::Result` — the `Internal` variant
/// allows seamless conversion via the `?` operator. The router and the receipt
/// pipeline catch these at the branch boundary and degrade to a safe reply
/// payload; nothing here ever reaches the webhook response as a 5xx.
#[derive(Debug, Error)]
pub enum ClasslineError {
    #[error("LMS error: {message}")]
    Lms {
        message: String,
        status: Option<u16>,
    },

    #[error("Media error: {stage}: {message}")]
    Media {
        stage: &'static str,
        message: String,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience alias for results using `ClasslineError`.
pub type ClasslineResult<T> = std::result::Result<T, ClasslineError>;

impl ClasslineError {
    /// The upstream HTTP status that caused this error, when there is one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ClasslineError::Lms { status, .. } => *status,
            _ => None,
        }
    }
}
