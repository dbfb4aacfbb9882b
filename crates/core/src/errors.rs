use thiserror::Error;

/// Failures raised by the data repository when reading portfolio content
/// from disk. Callers map `NotFound` to HTTP 404 and everything else to 500.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("data file not found for category `{category}`")]
    NotFound { category: String },
    #[error("malformed JSON in category `{category}`: {source}")]
    Malformed { category: String, source: serde_json::Error },
    #[error("could not read data for category `{category}`: {source}")]
    Io { category: String, source: std::io::Error },
}

impl DataError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Failures raised by the AI subsystem.
///
/// `ProviderUnavailable` never escapes the provider manager's fallback loop;
/// the two exhaustion variants abort the calling pipeline and surface as a
/// generic processing error at the HTTP boundary.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("provider `{provider}` is not available: {reason}")]
    ProviderUnavailable { provider: String, reason: String },
    #[error("no LLM providers are available")]
    NoProvidersAvailable,
    #[error("all LLM providers failed, last error: {last_error}")]
    AllProvidersFailed { last_error: String },
    #[error("provider `{provider}` request failed: {message}")]
    Request { provider: String, message: String },
    #[error("provider `{provider}` returned an empty response")]
    EmptyResponse { provider: String },
}

impl AiError {
    /// True when retrying against another provider cannot help.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NoProvidersAvailable | Self::AllProvidersFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::{AiError, DataError};

    #[test]
    fn not_found_is_distinguishable() {
        let error = DataError::NotFound { category: "intro".to_string() };
        assert!(error.is_not_found());
        assert!(error.to_string().contains("intro"));
    }

    #[test]
    fn malformed_reports_category() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = DataError::Malformed { category: "projects".to_string(), source };
        assert!(!error.is_not_found());
        assert!(error.to_string().contains("projects"));
    }

    #[test]
    fn exhaustion_errors_are_terminal() {
        assert!(AiError::NoProvidersAvailable.is_terminal());
        assert!(AiError::AllProvidersFailed { last_error: "timeout".to_string() }.is_terminal());
        assert!(!AiError::ProviderUnavailable {
            provider: "groq".to_string(),
            reason: "missing api key".to_string(),
        }
        .is_terminal());
    }
}
