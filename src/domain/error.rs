use thiserror::Error;

/// Failure of a single outbound notification request.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{0} is not configured")]
    MissingConfig(&'static str),

    #[error("HTTP {status}{}", body_suffix(.body))]
    Status { status: u16, body: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

impl NotifyError {
    /// Client errors that suggest the remote rejected the payload shape.
    pub fn is_payload_rejection(&self) -> bool {
        matches!(self, NotifyError::Status { status: 400 | 401 | 403, .. })
    }
}
