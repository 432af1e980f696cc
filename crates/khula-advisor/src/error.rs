//! Advisor-specific error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("No advisor API key configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Advisor returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Advisor returned no content")]
    EmptyResponse,
}

impl AdvisorError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotConfigured => "AI analysis is not configured.".to_string(),
            Self::Network(_) => "Network error. Check your connection.".to_string(),
            Self::Status { status, .. } if *status == 429 => {
                "Too many AI requests. Please wait and try again.".to_string()
            }
            Self::Status { .. } => "AI service error. Please try again later.".to_string(),
            Self::Parse(_) | Self::EmptyResponse => {
                "AI service returned an unexpected response.".to_string()
            }
        }
    }

    /// Whether this error is retryable by an outer layer.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Status { status: 429, .. } | Self::Status { status: 500..=599, .. }
        )
    }
}
