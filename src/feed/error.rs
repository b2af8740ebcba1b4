use thiserror::Error;

/// Failures while fetching the upstream pair. Everything except `Exhausted`
/// is retryable; `Exhausted` ends the current cycle only.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{endpoint}: transport error: {message}")]
    Transport {
        endpoint: &'static str,
        message: String,
    },

    #[error("{endpoint}: HTTP {status}")]
    HttpStatus { endpoint: &'static str, status: u16 },

    #[error("{endpoint}: invalid response shape: {reason}")]
    Shape {
        endpoint: &'static str,
        reason: String,
    },

    #[error("data consistency validation failed: {0}")]
    Consistency(String),

    #[error("failed to fetch synchronized data after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    pub fn transport(endpoint: &'static str, err: impl std::fmt::Display) -> Self {
        FetchError::Transport {
            endpoint,
            message: err.to_string(),
        }
    }

}
