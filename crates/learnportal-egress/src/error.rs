//! Error types for backend calls

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EgressError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timeout after {0}s")]
    Timeout(u64),

    /// The backend answered 401. The session has already been wiped and the
    /// navigator sent to the login address.
    #[error("Session expired, login required at {login_url}")]
    SessionExpired { login_url: String },

    #[error("Backend error ({status_code}): {message}")]
    Backend { status_code: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] learnportal_core::Error),
}

impl EgressError {
    /// HTTP status returned by the backend, when there was one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            EgressError::Backend { status_code, .. } => Some(*status_code),
            EgressError::SessionExpired { .. } => Some(401),
            EgressError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Tenant mismatch or insufficient permissions.
    pub fn is_forbidden(&self) -> bool {
        self.status_code() == Some(403)
    }

    /// The session could not supply a tenant context.
    pub fn is_missing_session(&self) -> bool {
        matches!(
            self,
            EgressError::Core(learnportal_core::Error::MissingSessionData(_))
        )
    }

    /// No usable session remains: the backend rejected it or it was never
    /// there. Callers must stop rather than fall back.
    pub fn ends_session(&self) -> bool {
        matches!(self, EgressError::SessionExpired { .. }) || self.is_missing_session()
    }
}

pub type Result<T> = std::result::Result<T, EgressError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        let err = EgressError::Timeout(30);
        assert_eq!(err.to_string(), "Request timeout after 30s");

        let err = EgressError::Backend {
            status_code: 500,
            message: "Internal error".to_string(),
        };
        assert!(err.to_string().contains("500"));

        let err = EgressError::SessionExpired {
            login_url: "http://localhost:3005/login".to_string(),
        };
        assert!(err.to_string().contains("http://localhost:3005/login"));

        let err = EgressError::Config("bad config".to_string());
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[test]
    fn test_status_code_helpers() {
        let forbidden = EgressError::Backend {
            status_code: 403,
            message: String::new(),
        };
        assert!(forbidden.is_forbidden());
        assert_eq!(forbidden.status_code(), Some(403));

        let expired = EgressError::SessionExpired {
            login_url: String::new(),
        };
        assert_eq!(expired.status_code(), Some(401));
        assert!(!expired.is_forbidden());

        assert_eq!(EgressError::Timeout(30).status_code(), None);
    }

    #[test]
    fn test_missing_session_detection() {
        let err = EgressError::from(learnportal_core::Error::MissingSessionData(
            "tenantRealm".to_string(),
        ));
        assert!(err.is_missing_session());
        assert!(err.to_string().contains("tenantRealm"));
    }

    #[test]
    fn test_ends_session() {
        let expired = EgressError::SessionExpired {
            login_url: String::new(),
        };
        assert!(expired.ends_session());

        let missing = EgressError::from(learnportal_core::Error::MissingSessionData(
            "userEmail".to_string(),
        ));
        assert!(missing.ends_session());

        let forbidden = EgressError::Backend {
            status_code: 403,
            message: String::new(),
        };
        assert!(!forbidden.ends_session());
        assert!(!EgressError::Timeout(30).ends_session());
    }
}
