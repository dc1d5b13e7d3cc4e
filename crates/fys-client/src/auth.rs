//! Authentication endpoints for the directory client.

use fys_core::Credential;

use crate::client::DirectoryClient;
use crate::error::ClientError;
use crate::types::{Envelope, LoginRequest, UserProfile};

impl DirectoryClient {
    /// Exchanges email and password for a credential.
    ///
    /// The credential is returned, not stored; persisting it is the caller's
    /// decision.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Unauthorized`] on rejected credentials (this is also
    ///   reported to the auth hook, like any other 401).
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::Deserialize`] if the response shape is unexpected.
    pub async fn login(&self, email: &str, password: &str) -> Result<Credential, ClientError> {
        let url = self.endpoint("auth/login")?;
        let body = LoginRequest { email, password };
        let response = self.execute(self.client_ref().post(url).json(&body)).await?;
        let envelope: Envelope<Credential> = Self::read_json(response, "auth/login").await?;
        tracing::info!(token_type = ?envelope.data.token_type, "login accepted");
        Ok(envelope.data)
    }

    /// Asks the directory to invalidate the current credential.
    ///
    /// # Errors
    ///
    /// Transport and status errors as for any request; the body is ignored.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let url = self.endpoint("auth/logout")?;
        self.execute(self.client_ref().get(url)).await?;
        Ok(())
    }

    /// Fetches the account behind the current credential. Used at startup to
    /// validate a stored token.
    ///
    /// # Errors
    ///
    /// [`ClientError::Unauthorized`] if the token is no longer accepted, plus
    /// the usual transport and decoding errors.
    pub async fn me(&self) -> Result<UserProfile, ClientError> {
        let url = self.endpoint("auth/me")?;
        let response = self.execute(self.client_ref().get(url)).await?;
        let mut body: serde_json::Value = Self::read_json(response, "auth/me").await?;
        // Accept both the `{"data": {...}}` envelope and a bare profile object.
        let profile = if body.get("data").is_some() {
            body["data"].take()
        } else {
            body
        };
        serde_json::from_value(profile).map_err(|source| ClientError::Deserialize {
            context: "auth/me".to_string(),
            source,
        })
    }
}
