//! Error types for rysig

use crate::cipher::OperationKind;
use std::sync::Arc;
use thiserror::Error;

/// Failure to identify the three toolkit helpers in a player script
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    #[error("no {0} helper found in player script")]
    NotFound(OperationKind),

    #[error("{operation} helper is ambiguous, candidates: {}", candidates.join(", "))]
    Ambiguous {
        operation: OperationKind,
        candidates: Vec<String>,
    },
}

impl ClassificationError {
    /// Operation whose helper could not be pinned down
    pub fn operation(&self) -> OperationKind {
        match self {
            ClassificationError::NotFound(operation) => *operation,
            ClassificationError::Ambiguous { operation, .. } => *operation,
        }
    }
}

/// Failure to record the driver's call sequence
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordingError {
    #[error("no driver function calls the signature helpers")]
    NoDriverFound,

    #[error("malformed {operation} call `{call}` in {function}: {reason}")]
    MalformedCall {
        function: String,
        operation: OperationKind,
        call: String,
        reason: String,
    },
}

/// Failure while applying a recipe to one signature
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpretationError {
    #[error("{operation} index {index} out of range for signature of length {length}")]
    IndexOutOfRange {
        operation: OperationKind,
        index: usize,
        length: usize,
    },
}

/// Main error type for rysig operations
#[derive(Debug, Error)]
pub enum RysigError {
    #[error("Classification failed: {0}")]
    Classification(#[from] ClassificationError),

    #[error("Recording failed: {0}")]
    Recording(#[from] RecordingError),

    #[error("Interpretation failed: {0}")]
    Interpretation(#[from] InterpretationError),

    #[error("Player script URL not found in page")]
    PlayerScriptNotFound,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid signature cipher: {0}")]
    InvalidSignatureCipher(String),

    #[error("HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    /// Failure of a resolution shared by several concurrent callers
    #[error(transparent)]
    Shared(Arc<RysigError>),
}

impl RysigError {
    /// Check if error is retryable
    ///
    /// Only transport failures qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            RysigError::RequestFailed(e) => e.is_timeout() || e.is_connect(),
            RysigError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            RysigError::Shared(inner) => inner.is_retryable(),
            _ => false,
        }
    }

    /// Check if error suggests the player's obfuscation format has changed
    pub fn is_format_change(&self) -> bool {
        match self {
            RysigError::Classification(_) | RysigError::Recording(_) => true,
            RysigError::Shared(inner) => inner.is_format_change(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_error_display() {
        let err = ClassificationError::Ambiguous {
            operation: OperationKind::Swap,
            candidates: vec!["Xy".to_string(), "Qp".to_string()],
        };
        assert_eq!(err.to_string(), "swap helper is ambiguous, candidates: Xy, Qp");
        assert_eq!(err.operation(), OperationKind::Swap);

        let err = ClassificationError::NotFound(OperationKind::RemoveAt);
        assert_eq!(err.to_string(), "no remove-at helper found in player script");
    }

    #[test]
    fn test_is_retryable() {
        let err = RysigError::HttpStatus {
            status: 503,
            url: "https://example.com".to_string(),
        };
        assert!(err.is_retryable());

        let err = RysigError::HttpStatus {
            status: 404,
            url: "https://example.com".to_string(),
        };
        assert!(!err.is_retryable());

        let err = RysigError::from(RecordingError::NoDriverFound);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_is_format_change() {
        assert!(RysigError::from(ClassificationError::NotFound(OperationKind::Reverse))
            .is_format_change());
        assert!(RysigError::from(RecordingError::NoDriverFound).is_format_change());

        let err = RysigError::from(InterpretationError::IndexOutOfRange {
            operation: OperationKind::RemoveAt,
            index: 9,
            length: 3,
        });
        assert!(!err.is_format_change());
        assert!(!RysigError::PlayerScriptNotFound.is_format_change());
    }

    #[test]
    fn test_shared_error_delegates() {
        let err = RysigError::Shared(Arc::new(RysigError::from(RecordingError::NoDriverFound)));
        assert!(err.is_format_change());
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "Recording failed: no driver function calls the signature helpers"
        );

        let err = RysigError::Shared(Arc::new(RysigError::HttpStatus {
            status: 502,
            url: "https://example.com".to_string(),
        }));
        assert!(err.is_retryable());
    }
}
