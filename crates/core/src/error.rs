//! Error types for R-Droid Gradle tooling
//! 
//! Centralized application-level error handling using thiserror.

use thiserror::Error;

/// Main error type for R-Droid
#[derive(Error, Debug)]
pub enum RDroidError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Build script error: {0}")]
    BuildScript(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias for R-Droid operations
pub type Result<T> = std::result::Result<T, RDroidError>;

impl RDroidError {
    /// Check if this error was caused by user input rather than the environment
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            RDroidError::BuildScript(_)
                | RDroidError::NotFound(_)
                | RDroidError::TomlParse(_)
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            RDroidError::Io(e) => format!("File operation failed: {}", e),
            RDroidError::Config(msg) => format!("Configuration error: {}", msg),
            RDroidError::TomlParse(e) => format!("Configuration file is not valid TOML: {}", e),
            RDroidError::BuildScript(msg) => format!("Could not update build script: {}", msg),
            RDroidError::NotFound(msg) => format!("Not found: {}", msg),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors() {
        assert!(RDroidError::NotFound("android.compileSdk".into()).is_user_error());
        assert!(!RDroidError::InvalidState("closed".into()).is_user_error());
    }

    #[test]
    fn test_user_message() {
        let err = RDroidError::BuildScript("unbalanced braces".into());
        assert_eq!(err.user_message(), "Could not update build script: unbalanced braces");
    }
}
