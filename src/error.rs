//! Error types for remote calls and their user-facing normalization.
use serde::Deserialize;
use thiserror::Error;

/// Raw failure of a call to the generative API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
}

#[derive(Deserialize)]
struct RemoteErrorEnvelope {
    error: RemoteErrorBody,
}

#[derive(Deserialize)]
struct RemoteErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Failure of a generation flow, normalized to a human-readable message.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{service} failed due to API quota limits. Please check your plan and billing details.")]
    QuotaExceeded { service: &'static str },
    #[error("{0}")]
    SafetyBlocked(&'static str),
    #[error("Failed to parse the structured {what} from the AI response. The format was unexpected.")]
    Parse { what: &'static str },
    #[error("{service} failed: {message}")]
    Api {
        service: &'static str,
        message: String,
    },
    #[error("{0}")]
    JobFailed(String),
    #[error("{0}")]
    InvalidInput(&'static str),
}

impl GenerationError {
    /// Map a raw API failure of `service` onto the error taxonomy.
    pub fn from_api(service: &'static str, err: ApiError) -> Self {
        match err {
            ApiError::Status { status, body } => {
                if let Ok(envelope) = serde_json::from_str::<RemoteErrorEnvelope>(&body) {
                    if envelope.error.status == "RESOURCE_EXHAUSTED" {
                        return GenerationError::QuotaExceeded { service };
                    }
                    if !envelope.error.message.is_empty() {
                        return GenerationError::Api {
                            service,
                            message: envelope.error.message,
                        };
                    }
                }
                if status == 429 {
                    return GenerationError::QuotaExceeded { service };
                }
                GenerationError::Api {
                    service,
                    message: format!("HTTP {}: {}", status, body.trim()),
                }
            }
            other => GenerationError::Api {
                service,
                message: other.to_string(),
            },
        }
    }

    pub fn is_quota(&self) -> bool {
        matches!(self, GenerationError::QuotaExceeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16, body: &str) -> ApiError {
        ApiError::Status {
            status,
            body: body.into(),
        }
    }

    #[test]
    fn resource_exhausted_maps_to_quota() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = GenerationError::from_api("Article generation", status(429, body));
        assert!(err.is_quota());
        assert_eq!(
            err.to_string(),
            "Article generation failed due to API quota limits. Please check your plan and billing details."
        );
    }

    #[test]
    fn bare_429_maps_to_quota() {
        let err = GenerationError::from_api("Image generation", status(429, "slow down"));
        assert!(err.is_quota());
    }

    #[test]
    fn json_error_message_is_surfaced() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        let err = GenerationError::from_api("Video generation", status(400, body));
        assert_eq!(err.to_string(), "Video generation failed: API key not valid");
    }

    #[test]
    fn plain_status_and_decode_errors() {
        let err = GenerationError::from_api("Article generation", status(503, " unavailable \n"));
        assert_eq!(
            err.to_string(),
            "Article generation failed: HTTP 503: unavailable"
        );

        let err = GenerationError::from_api(
            "Article generation",
            ApiError::Decode("missing candidates".into()),
        );
        assert_eq!(
            err.to_string(),
            "Article generation failed: invalid response: missing candidates"
        );
    }
}
