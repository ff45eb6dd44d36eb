use http::StatusCode;
use thiserror::Error;

/// Failures surfaced by the participant and event stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The collaborator answered with a non-success status and a message body.
    #[error("store responded {status}: {message}")]
    Response { status: StatusCode, message: String },
    /// The request never produced a usable response.
    #[error("store request failed: {0}")]
    Connection(String),
}

impl StoreError {
    pub fn response(status: StatusCode, message: impl Into<String>) -> Self {
        StoreError::Response {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            StoreError::Response { status, .. } => Some(*status),
            StoreError::Connection(_) => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT)
    }
}

/// Status-coded responses are mapped by the store clients after reading the
/// body; anything converted here never got a response at all.
impl From<reqwest::Error> for StoreError {
    fn from(error: reqwest::Error) -> Self {
        StoreError::Connection(error.to_string())
    }
}
