// Error types for video translation

use thiserror::Error;

/// Message shown when the service fails without a usable `detail`
pub const GENERIC_FAILURE_MESSAGE: &str = "Translation failed";

pub type Result<T, E = TranslateError> = std::result::Result<T, E>;

/// Input rejected before any request is issued
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please upload a video or enter a URL")]
    MissingInput,

    #[error("URL feature coming soon! Use upload for now.")]
    UrlNotSupported,

    #[error("Unsupported video type: {0} (expected mp4, mov, avi, mkv or webm)")]
    UnsupportedFileType(String),

    #[error("Could not read video file: {0}")]
    UnreadableFile(String),
}

/// Failure talking to the translation service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Unexpected status: {0}")]
    Status(u16),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else if err.is_body() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Terminal failure of one translation attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{message}")]
    Service { status: u16, message: String },
}

impl TranslateError {
    /// Text surfaced to the user. Service details are passed through verbatim.
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, TranslateError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_message_is_verbatim() {
        let err = TranslateError::Service {
            status: 400,
            message: "No speech detected".to_string(),
        };
        assert_eq!(err.message(), "No speech detected");
    }

    #[test]
    fn test_validation_messages() {
        let missing: TranslateError = ValidationError::MissingInput.into();
        assert!(missing.is_validation());
        assert_eq!(missing.message(), "Please upload a video or enter a URL");

        let url: TranslateError = ValidationError::UrlNotSupported.into();
        assert!(url.message().contains("coming soon"));
    }

    #[test]
    fn test_transport_message_keeps_description() {
        let err: TranslateError = TransportError::Network("connection refused".to_string()).into();
        assert!(!err.is_validation());
        assert_eq!(err.message(), "Network error: connection refused");
    }
}
