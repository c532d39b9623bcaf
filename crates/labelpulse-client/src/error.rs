use thiserror::Error;

/// Errors from the notification API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure, timeout, or undecodable body
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Notification ids are embedded in the path and must be non-empty
    #[error("invalid notification id: {0:?}")]
    InvalidId(String),
}

impl ApiError {
    /// Status code for `Status` errors
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::InvalidId(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}
