//! HTTP client for the service directory REST API.
//!
//! Wraps `reqwest` with bearer-credential handling, typed `{"data": ...}`
//! envelope decoding, and authorization-failure reporting. Every response
//! with status 401, from any endpoint, is reported to the attached
//! [`AuthHook`] before the error is returned.

use std::sync::Arc;
use std::time::Duration;

use fys_core::{AppConfig, AuthHook, GeoPoint, ServiceDraft, ServiceRecord};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::types::{Envelope, ServiceResponse};

/// Client for the service directory.
///
/// Use [`DirectoryClient::new`] with an explicit base URL (a wiremock server
/// in tests) or [`DirectoryClient::from_config`] in the binary.
pub struct DirectoryClient {
    client: Client,
    base_url: Url,
    auth: Option<Arc<dyn AuthHook>>,
}

impl std::fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("base_url", &self.base_url.as_str())
            .field("auth", &self.auth.as_ref().map(|_| "[hook]"))
            .finish_non_exhaustive()
    }
}

impl DirectoryClient {
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ClientError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Endpoint paths are joined onto the base, so it must end in exactly
        // one slash or `Url::join` would replace the last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ClientError::InvalidBaseUrl {
            base_url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            auth: None,
        })
    }

    /// # Errors
    ///
    /// See [`DirectoryClient::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, ClientError> {
        Self::new(
            &config.api_url,
            config.request_timeout_secs,
            &config.user_agent,
        )
    }

    /// Attaches the session hook used for bearer headers and 401 reporting.
    #[must_use]
    pub fn with_auth_hook(mut self, hook: Arc<dyn AuthHook>) -> Self {
        self.auth = Some(hook);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn client_ref(&self) -> &Client {
        &self.client
    }

    /// Lists every service within `distance` of `center`.
    ///
    /// Entries that fail to deserialize or carry no usable position are
    /// skipped with a warning instead of failing the whole listing.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Unauthorized`] if the directory rejects the credential.
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::UnexpectedStatus`] / [`ClientError::NotFound`] on other
    ///   non-2xx statuses.
    /// - [`ClientError::Deserialize`] if the envelope shape is unexpected.
    pub async fn list_services(
        &self,
        distance: u32,
        center: GeoPoint,
    ) -> Result<Vec<ServiceRecord>, ClientError> {
        let url = self.services_url(distance, center)?;
        tracing::debug!(%url, "listing services");
        let response = self.execute(self.client.get(url.clone())).await?;
        let envelope: Envelope<Vec<serde_json::Value>> =
            Self::read_json(response, &format!("services(distance={distance})")).await?;

        let records = envelope
            .data
            .into_iter()
            .filter_map(|raw| {
                let parsed = serde_json::from_value::<ServiceResponse>(raw)
                    .map_err(|e| {
                        tracing::warn!(error = %e, "list_services: skipping malformed entry");
                    })
                    .ok()?;
                let id = parsed.id;
                let record = parsed.into_record();
                if record.is_none() {
                    tracing::warn!(id, "list_services: skipping entry without valid geolocation");
                }
                record
            })
            .collect();
        Ok(records)
    }

    /// Applies `draft` to service `id` and returns the updated listing.
    ///
    /// # Errors
    ///
    /// Same as [`DirectoryClient::list_services`]; additionally
    /// [`ClientError::Deserialize`] if the returned listing has no valid
    /// geolocation.
    pub async fn update_service(
        &self,
        id: i64,
        draft: &ServiceDraft,
    ) -> Result<ServiceRecord, ClientError> {
        let url = self.endpoint(&format!("services/{id}"))?;
        let response = self.execute(self.client.put(url).json(draft)).await?;
        let context = format!("update_service(id={id})");
        let envelope: Envelope<ServiceResponse> = Self::read_json(response, &context).await?;
        envelope.data.into_record().ok_or_else(|| ClientError::Deserialize {
            context,
            source: serde::de::Error::custom("listing has no valid geolocation"),
        })
    }

    /// # Errors
    ///
    /// [`ClientError::NotFound`] if the listing does not exist, plus the
    /// transport errors of [`DirectoryClient::list_services`].
    pub async fn delete_service(&self, id: i64) -> Result<(), ClientError> {
        let url = self.endpoint(&format!("services/{id}"))?;
        self.execute(self.client.delete(url)).await?;
        Ok(())
    }

    /// Builds `{base}/services?distance=..&lat=..&lng=..`.
    pub(crate) fn services_url(&self, distance: u32, center: GeoPoint) -> Result<Url, ClientError> {
        let mut url = self.endpoint("services")?;
        url.query_pairs_mut()
            .append_pair("distance", &distance.to_string())
            .append_pair("lat", &center.lat().to_string())
            .append_pair("lng", &center.lng().to_string());
        Ok(url)
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    /// Adds `Authorization: Bearer ..` and `Accept: application/json` when the
    /// session currently holds a token; leaves the request untouched otherwise.
    pub(crate) fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.auth.as_ref().and_then(|hook| hook.bearer_token()) {
            Some(token) => request
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .header(ACCEPT, "application/json"),
            None => request,
        }
    }

    /// Sends the request and maps non-2xx statuses to typed errors.
    ///
    /// A 401 is reported to the auth hook before returning
    /// [`ClientError::Unauthorized`].
    pub(crate) async fn execute(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        let url = response.url().to_string();

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(%url, "directory rejected credential");
            if let Some(hook) = &self.auth {
                hook.on_unauthorized();
            }
            return Err(ClientError::Unauthorized { url });
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound { url });
        }
        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }
        Ok(response)
    }

    pub(crate) async fn read_json<T: DeserializeOwned>(
        response: Response,
        context: &str,
    ) -> Result<T, ClientError> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| ClientError::Deserialize {
            context: context.to_string(),
            source,
        })
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
