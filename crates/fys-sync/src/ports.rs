//! Seams between the sync core and the directory transport.
//!
//! The engine and session store only see these traits, so tests can drive
//! them with scripted fakes while the binary plugs in [`DirectoryClient`].

use std::future::Future;

use fys_client::{ClientError, DirectoryClient};
use fys_core::{Credential, GeoPoint, ServiceRecord};

pub trait ServiceDirectory: Send + Sync + 'static {
    fn list_services(
        &self,
        distance: u32,
        center: GeoPoint,
    ) -> impl Future<Output = Result<Vec<ServiceRecord>, ClientError>> + Send;
}

pub trait AuthApi: Send + Sync + 'static {
    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Credential, ClientError>> + Send;

    fn logout(&self) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Confirms the stored credential is still accepted.
    fn validate(&self) -> impl Future<Output = Result<(), ClientError>> + Send;
}

impl ServiceDirectory for DirectoryClient {
    async fn list_services(
        &self,
        distance: u32,
        center: GeoPoint,
    ) -> Result<Vec<ServiceRecord>, ClientError> {
        DirectoryClient::list_services(self, distance, center).await
    }
}

impl AuthApi for DirectoryClient {
    async fn login(&self, email: &str, password: &str) -> Result<Credential, ClientError> {
        DirectoryClient::login(self, email, password).await
    }

    async fn logout(&self) -> Result<(), ClientError> {
        DirectoryClient::logout(self).await
    }

    async fn validate(&self) -> Result<(), ClientError> {
        let profile = self.me().await?;
        tracing::debug!(user_id = ?profile.id, "stored credential validated");
        Ok(())
    }
}
