//! Lazy OAuth password-grant token acquisition.
//!
//! The bearer token is requested once, on the first privileged call, and
//! cached for the lifetime of the [`Client`]. A token that later goes stale
//! is never refreshed here; callers wanting a fresh token construct a new
//! client.
use log::warn;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::{ClientError, Result};

// Public web-app OAuth client, shipped in the site's JS bundle.
pub(crate) const CLIENT_ID: &str = "9X1Fdd-pxNsAgEDNi_SfhJWi8T-vLuV2WVzKIbkTCw4";
pub(crate) const CLIENT_SECRET: &str = "ozF8jzI4968oTKFkEnsBC-UbLPCdrSv0MkXGQu2o_-M";
const GRANT_TYPE: &str = "password";
const REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";
const SCOPE: &str = "read";

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'static str,
    client_secret: &'static str,
    grant_type: &'static str,
    username: &'a str,
    password: &'a str,
    redirect_uri: &'static str,
    scope: &'static str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

impl Client {
    /// Makes sure a bearer token is cached, exchanging username/password for
    /// one if needed.
    ///
    /// No-op when a token is already present (zero network calls). Fails
    /// with [`ClientError::MissingCredential`] when neither a token nor a
    /// full username/password pair was configured, and with
    /// [`ClientError::AuthenticationFailure`] when the token endpoint
    /// rejects the exchange or returns no usable token.
    pub async fn ensure_authenticated(&mut self) -> Result<()> {
        if self.token().is_some() {
            return Ok(());
        }

        let (username, password) = self.credentials_for_login()?;
        let url = format!("{}/oauth/token", self.base_url());

        let payload = TokenRequest {
            client_id: CLIENT_ID,
            client_secret: CLIENT_SECRET,
            grant_type: GRANT_TYPE,
            username: &username,
            password: &password,
            redirect_uri: REDIRECT_URI,
            scope: SCOPE,
        };

        let response = self.http().post(&url).json(&payload).send().await?;
        let status = response.status();

        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ClientError::AuthenticationFailure {
                status: Some(status.as_u16()),
                detail,
            });
        }

        let body: TokenResponse =
            response
                .json()
                .await
                .map_err(|err| ClientError::AuthenticationFailure {
                    status: None,
                    detail: format!("token response was not valid JSON: {err}"),
                })?;

        match body.access_token {
            Some(token) if !token.is_empty() => {
                warn!("Using freshly issued bearer token");
                self.cache_token(token);
                Ok(())
            }
            _ => Err(ClientError::AuthenticationFailure {
                status: None,
                detail: "token endpoint returned no access token".to_string(),
            }),
        }
    }

    fn credentials_for_login(&self) -> Result<(String, String)> {
        let username = self
            .credentials()
            .username
            .clone()
            .ok_or(ClientError::MissingCredential("username"))?;
        let password = self
            .credentials()
            .password
            .clone()
            .ok_or(ClientError::MissingCredential("password"))?;
        Ok((username, password))
    }
}
