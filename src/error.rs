//! Error types for a report run
//!
//! Errors are classified by recoverability:
//! - Retryable: network issues, API hiccups (the next scheduled run may succeed)
//! - NonRetryable: configuration errors, missing resources
//! - RequiresUserAction: expired Google authorization

use std::path::PathBuf;
use thiserror::Error;

use crate::google_api::GoogleApiError;
use crate::platform::PlatformError;

/// Error types for a report run
#[derive(Debug, Error)]
pub enum DigestError {
    // Retryable errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Google API error: {0}")]
    Api(String),

    // Non-retryable errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Config file not found at {0}")]
    ConfigNotFound(PathBuf),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(String),

    // Requires user action
    #[error("Google authorization expired or revoked")]
    AuthExpired,

    #[error("Google credentials missing: {0}")]
    CredentialsMissing(String),
}

impl DigestError {
    /// Returns true if a later run could succeed without intervention
    pub fn is_retryable(&self) -> bool {
        matches!(self, DigestError::Network(_) | DigestError::Api(_))
    }

    /// Returns true if this error requires user action to resolve
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            DigestError::AuthExpired | DigestError::CredentialsMissing(_)
        )
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DigestError::Network(_) => "Check the network connection if this keeps happening.",
            DigestError::Api(_) => "Check the Google Workspace status page if this keeps happening.",
            DigestError::Configuration(_) => {
                "Check the settings in ~/.schooldigest/config.json"
            }
            DigestError::ConfigNotFound(_) => {
                "Create ~/.schooldigest/config.json or pass --config"
            }
            DigestError::NotFound(_) => "Check that the folder and document IDs are still valid.",
            DigestError::Io(_) => "Check file permissions and disk space.",
            DigestError::AuthExpired => "Run 'schooldigest auth' to reconnect the Google account.",
            DigestError::CredentialsMissing(_) => {
                "Place the OAuth client file at ~/.schooldigest/google/credentials.json"
            }
        }
    }

    /// Failure email hint: whether waiting for the next run is enough, then
    /// the recovery suggestion.
    pub fn failure_hint(&self) -> String {
        let outlook = if self.requires_user_action() {
            "Action needed: reports stop until this is fixed."
        } else if self.is_retryable() {
            "The next scheduled run will try again."
        } else {
            "Later runs will fail the same way until the setup is corrected."
        };
        format!("{} {}", outlook, self.recovery_suggestion())
    }
}

impl From<std::io::Error> for DigestError {
    fn from(err: std::io::Error) -> Self {
        DigestError::Io(err.to_string())
    }
}

impl From<GoogleApiError> for DigestError {
    fn from(err: GoogleApiError) -> Self {
        match err {
            GoogleApiError::AuthExpired | GoogleApiError::TokenNotFound(_) => {
                DigestError::AuthExpired
            }
            GoogleApiError::CredentialsNotFound(path) => {
                DigestError::CredentialsMissing(path.display().to_string())
            }
            GoogleApiError::InvalidCredentials(msg) => DigestError::CredentialsMissing(msg),
            GoogleApiError::Http(e) => DigestError::Network(e.to_string()),
            GoogleApiError::Io(e) => DigestError::Io(e.to_string()),
            other => DigestError::Api(other.to_string()),
        }
    }
}

impl From<PlatformError> for DigestError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Google(e) => e.into(),
            PlatformError::NotFound(what) => DigestError::NotFound(what),
            PlatformError::Unsupported(what) => DigestError::Api(what),
        }
    }
}
