//! Error types for the odds provider client.

use thiserror::Error;

use crate::errors::EngineError;

#[derive(Error, Debug)]
pub enum OddsApiError {
    #[error("HTTP error: {status_code} - {message}")]
    Http { status_code: u16, message: String },

    #[error("Rate limited (retry after {retry_after}s)")]
    RateLimited { retry_after: u64 },

    #[error("ODDS_API_KEY is not set")]
    MissingApiKey,

    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Request failed after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

impl OddsApiError {
    /// Build an error from a non-success response. The provider answers with
    /// `{"message": "...", "error_code": "..."}` on client errors.
    pub fn from_response(status_code: u16, body: &str) -> Self {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
            let code = json
                .get("error_code")
                .and_then(|v| v.as_str())
                .unwrap_or("UNKNOWN");
            let message = json
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or(body)
                .to_string();

            return match (status_code, code) {
                (401, "OUT_OF_USAGE_CREDITS") => Self::QuotaExhausted(message),
                (429, _) => Self::RateLimited { retry_after: 1 },
                _ => Self::Http {
                    status_code,
                    message,
                },
            };
        }

        Self::Http {
            status_code,
            message: body.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::Network(_)
                | Self::Timeout(_)
                | Self::Http {
                    status_code: 500..=599,
                    ..
                }
        )
    }
}

impl From<OddsApiError> for EngineError {
    fn from(err: OddsApiError) -> Self {
        match err {
            OddsApiError::Engine(inner) => inner,
            other => EngineError::Source(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_structured() {
        let err = OddsApiError::from_response(
            401,
            r#"{"message": "Usage quota has been reached", "error_code": "OUT_OF_USAGE_CREDITS"}"#,
        );
        assert!(matches!(err, OddsApiError::QuotaExhausted(_)));
        assert!(!err.is_retryable());

        let err = OddsApiError::from_response(422, r#"{"message": "Invalid markets"}"#);
        match err {
            OddsApiError::Http {
                status_code,
                message,
            } => {
                assert_eq!(status_code, 422);
                assert_eq!(message, "Invalid markets");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_from_response_plain_body() {
        let err = OddsApiError::from_response(503, "upstream down");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("upstream down"));
    }

    #[test]
    fn test_into_engine_error() {
        let engine: EngineError = OddsApiError::Timeout("10s".into()).into();
        assert!(matches!(engine, EngineError::Source(_)));

        let engine: EngineError =
            OddsApiError::Engine(EngineError::InvalidStatType("player_dunks".into())).into();
        assert!(matches!(engine, EngineError::InvalidStatType(_)));
    }

    #[test]
    fn test_only_transient_failures_retry() {
        assert!(OddsApiError::RateLimited { retry_after: 2 }.is_retryable());
        assert!(OddsApiError::Network("reset".into()).is_retryable());
        assert!(OddsApiError::from_response(500, "").is_retryable());
        assert!(!OddsApiError::from_response(404, "not found").is_retryable());
        assert!(!OddsApiError::from_response(422, r#"{"message": "bad"}"#).is_retryable());
        assert!(!OddsApiError::Deserialization("eof".into()).is_retryable());
    }
}
