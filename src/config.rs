//! Credential and proxy configuration, read once at client construction.
use std::env;

use serde::{Deserialize, Serialize};

/// Login material for the API.
///
/// Either a ready-made bearer `token` or a `username`/`password` pair must be
/// present before the first privileged call; the client exchanges the pair
/// for a token lazily and fails with
/// [`ClientError::MissingCredential`](crate::ClientError::MissingCredential)
/// when neither is available.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
}

impl Credentials {
    #[must_use]
    pub fn new(username: Option<String>, password: Option<String>, token: Option<String>) -> Self {
        Self {
            username,
            password,
            token,
        }
    }

    /// Reads `TRUTHSOCIAL_USERNAME`, `TRUTHSOCIAL_PASSWORD` and
    /// `TRUTHSOCIAL_TOKEN` from the environment. Absent variables stay
    /// `None`; presence is only validated when a privileged call is made.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            username: env_non_empty("TRUTHSOCIAL_USERNAME"),
            password: env_non_empty("TRUTHSOCIAL_PASSWORD"),
            token: env_non_empty("TRUTHSOCIAL_TOKEN"),
        }
    }

    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            username: None,
            password: None,
            token: Some(token.into()),
        }
    }
}

/// Optional HTTP/HTTPS proxy URLs, picked up from the conventional
/// environment variables and applied when the HTTP client is built.
#[derive(Debug, Clone, Default)]
pub struct ProxySettings {
    pub http: Option<String>,
    pub https: Option<String>,
}

impl ProxySettings {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            http: env_non_empty("http_proxy"),
            https: env_non_empty("https_proxy"),
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_token_sets_only_token() {
        let creds = Credentials::with_token("abc123");
        assert_eq!(creds.token.as_deref(), Some("abc123"));
        assert!(creds.username.is_none());
        assert!(creds.password.is_none());
    }

    #[test]
    fn default_is_fully_absent() {
        let creds = Credentials::default();
        assert!(creds.username.is_none() && creds.password.is_none() && creds.token.is_none());
    }
}
