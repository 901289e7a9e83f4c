//! Error types for marker placement and rendering.

use thiserror::Error;

/// Result type alias using MarkerError.
pub type MarkerResult<T> = Result<T, MarkerError>;

/// Primary error type for marker operations.
#[derive(Debug, Error)]
pub enum MarkerError {
    // === Asset Errors ===
    #[error("Marker not found: {0}")]
    AssetNotFound(String),

    #[error("Failed to load marker '{name}': {message}")]
    AssetLoad { name: String, message: String },

    // === Style Errors ===
    #[error("Failed to evaluate expression '{expression}': {message}")]
    ExpressionEvaluation { expression: String, message: String },

    #[error("Invalid value for property '{key}': {message}")]
    InvalidProperty { key: String, message: String },

    #[error("Invalid transform: {0}")]
    InvalidTransform(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    // === Configuration Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Rendering Errors ===
    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Encoding failed: {0}")]
    Encode(String),
}

impl MarkerError {
    /// Whether the error only affects the current feature.
    ///
    /// Skippable errors are logged and the render continues with the next
    /// feature; everything else is handed back to the caller.
    pub fn is_feature_skippable(&self) -> bool {
        matches!(
            self,
            MarkerError::AssetNotFound(_) | MarkerError::AssetLoad { .. }
        )
    }

    pub(crate) fn expression(expression: impl Into<String>, message: impl Into<String>) -> Self {
        MarkerError::ExpressionEvaluation {
            expression: expression.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for MarkerError {
    fn from(err: std::io::Error) -> Self {
        MarkerError::AssetLoad {
            name: String::new(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for MarkerError {
    fn from(err: serde_json::Error) -> Self {
        MarkerError::InvalidConfig(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skippable_errors() {
        assert!(MarkerError::AssetNotFound("x.svg".into()).is_feature_skippable());
        assert!(!MarkerError::expression("[a]", "missing").is_feature_skippable());
        assert!(!MarkerError::Render("boom".into()).is_feature_skippable());
    }

    #[test]
    fn test_error_messages() {
        let err = MarkerError::AssetNotFound("shape://star".into());
        assert_eq!(err.to_string(), "Marker not found: shape://star");

        let err = MarkerError::InvalidProperty {
            key: "opacity".into(),
            message: "expected a number".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value for property 'opacity': expected a number"
        );
    }
}
