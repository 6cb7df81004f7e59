use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Enumerates the possible errors that can arise while talking to the API.
///
/// The variants separate fatal configuration problems from authentication
/// failures, transport-level failures and malformed server responses, so
/// callers can decide which ones terminate a whole run and which ones only
/// terminate the current walk.
#[derive(Error, Debug)]
pub enum ClientError {
    /// A credential required for the requested operation was never provided.
    /// Fatal; nothing is retried.
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    /// The token endpoint rejected the credentials, or returned a body
    /// without a usable access token.
    #[error("Authentication failed: {detail}")]
    AuthenticationFailure {
        status: Option<u16>,
        detail: String,
    },

    /// A network-level error (connect, timeout, TLS) from the HTTP client.
    #[error("Connection error")]
    Connection(#[from] reqwest::Error),

    /// The server kept answering with an error status until the retry budget
    /// ran out, or answered with a status that is never retried.
    #[error("Request to {path} failed with status {status} after {attempts} attempt(s): {detail}")]
    RequestFailed {
        path: String,
        status: u16,
        attempts: u32,
        detail: String,
    },

    /// The response body was not valid JSON.
    #[error("Error while deserializing JSON response")]
    Decode(#[from] serde_json::Error),

    /// The response body was valid JSON but not the shape the operation
    /// requires (e.g. an object where a status array was expected).
    #[error("Server response was not the expected {expected}")]
    UnexpectedShape { expected: &'static str },

    /// The response body carried an explicit `error` field.
    #[error("API returned an error: {0}")]
    UpstreamApi(String),
}

impl ClientError {
    /// True for errors that abort a pagination or timeline walk without
    /// invalidating pages already handed to the caller.
    #[must_use]
    pub fn is_page_terminal(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::RequestFailed { .. }
                | Self::Decode(_)
                | Self::UnexpectedShape { .. }
                | Self::UpstreamApi(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_failure_formats_detail() {
        let err = ClientError::AuthenticationFailure {
            status: Some(403),
            detail: "invalid_grant".to_string(),
        };
        assert_eq!(format!("{err}"), "Authentication failed: invalid_grant");
    }

    #[test]
    fn configuration_errors_are_not_page_terminal() {
        assert!(!ClientError::MissingCredential("username").is_page_terminal());
        assert!(ClientError::UpstreamApi("gone".to_string()).is_page_terminal());
        assert!(ClientError::UnexpectedShape { expected: "array" }.is_page_terminal());
    }

    #[test]
    fn request_failed_reports_attempts() {
        let err = ClientError::RequestFailed {
            path: "/v1/accounts/lookup".to_string(),
            status: 500,
            attempts: 3,
            detail: "Internal Server Error".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("/v1/accounts/lookup"));
        assert!(msg.contains("3 attempt"));
    }
}
