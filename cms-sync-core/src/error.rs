//! Error taxonomy shared by listing, fetching and persistence.

use thiserror::Error;

/// Errors raised by the collaborators and the pipeline stages.
///
/// `Upstream` and `Transport` together form the "upstream" class: the remote
/// call either answered with a non-success status or never answered at all.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Remote API answered with a non-success status.
    #[error("upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Connection, TLS or timeout failure before a status was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body could not be parsed as the expected structured reply.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Collection could not be serialized for storage.
    #[error("failed to serialize collection: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key-value store rejected the write (or the read).
    #[error("failed to persist '{key}': {message}")]
    Persistence { key: String, message: String },

    /// A stream's required credential is absent.
    #[error("credential missing: {0}")]
    CredentialMissing(String),

    /// Caller cancelled the sync before this operation was issued.
    #[error("sync cancelled")]
    Cancelled,
}

impl SyncError {
    /// True for non-success statuses and transport failures.
    pub fn is_upstream(&self) -> bool {
        matches!(self, SyncError::Upstream { .. } | SyncError::Transport(_))
    }

    /// True when the upstream refused the credential (401 or 403).
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, SyncError::Upstream { status: 401 | 403, .. })
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL can carry the API key in its query string.
        let e = e.without_url();
        if e.is_timeout() {
            SyncError::Transport(format!("request timed out: {e}"))
        } else if e.is_decode() {
            SyncError::Decode(e.to_string())
        } else {
            SyncError::Transport(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SyncError::Upstream {
            status: 404,
            body: "File not found".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "upstream returned status 404: File not found"
        );
    }

    #[test]
    fn test_upstream_classification() {
        assert!(SyncError::Transport("refused".into()).is_upstream());
        assert!(!SyncError::Decode("bad json".into()).is_upstream());
        assert!(SyncError::Upstream {
            status: 401,
            body: String::new()
        }
        .is_auth_rejection());
        assert!(!SyncError::Upstream {
            status: 500,
            body: String::new()
        }
        .is_auth_rejection());
        assert!(!SyncError::CredentialMissing("token".into()).is_upstream());
    }
}
