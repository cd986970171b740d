use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("response has no message content")]
    EmptyResponse,
    #[error("content is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid prediction: {0}")]
    InvalidPrediction(String),
}

impl PredictError {
    /// Rate limiting and server-side failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status == 429 || (500..600).contains(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> PredictError {
        PredictError::Api {
            status,
            body: String::new(),
        }
    }

    #[test]
    fn retries_rate_limits_and_server_errors_only() {
        assert!(api(429).is_retryable());
        assert!(api(503).is_retryable());
        assert!(!api(401).is_retryable());
        assert!(!api(400).is_retryable());
        assert!(!PredictError::EmptyResponse.is_retryable());
    }
}
