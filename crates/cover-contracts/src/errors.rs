use thiserror::Error;

use crate::phase::Phase;

/// Failure of a single model gateway round trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Failed to generate a prompt from the blog content: {0}")]
    DescriptionFailed(String),
    #[error("No content generated by the image model.")]
    NoContentGenerated,
    #[error("No image data found in the model response.")]
    NoImageInResponse,
    #[error("{0}")]
    Transport(String),
    #[error("Gateway configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::DescriptionFailed(_) => "description_failed",
            GatewayError::NoContentGenerated => "no_content_generated",
            GatewayError::NoImageInResponse => "no_image_in_response",
            GatewayError::Transport(_) => "transport",
            GatewayError::Configuration(_) => "configuration",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("{0}")]
    Validation(String),
    #[error("A request is already in flight ({0}).")]
    Busy(Phase),
    #[error("History index {index} is out of range ({len} artifacts).")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Result discarded: the session was reset while the request was in flight.")]
    Discarded,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[cfg(test)]
mod tests {
    use super::{GatewayError, SessionError};
    use crate::phase::Phase;

    #[test]
    fn messages_name_the_failure() {
        assert!(GatewayError::NoImageInResponse
            .to_string()
            .contains("No image data"));
        assert_eq!(
            GatewayError::DescriptionFailed("quota".to_string()).to_string(),
            "Failed to generate a prompt from the blog content: quota"
        );
        assert_eq!(
            SessionError::Busy(Phase::Editing).to_string(),
            "A request is already in flight (editing)."
        );
    }

    #[test]
    fn gateway_errors_pass_through_session_errors() {
        let err: SessionError = GatewayError::NoContentGenerated.into();
        assert_eq!(err.to_string(), GatewayError::NoContentGenerated.to_string());
        assert_eq!(GatewayError::NoContentGenerated.kind(), "no_content_generated");
    }
}
