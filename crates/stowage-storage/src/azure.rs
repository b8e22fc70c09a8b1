use async_trait::async_trait;
use object_store::azure::{AzureConfigKey, MicrosoftAzureBuilder};
use std::sync::Arc;
use stowage_core::{AttachmentError, AttachmentResult, StorageBackend};

use crate::container::ObjectStoreContainer;
use crate::credentials::StorageCredentials;
use crate::traits::{ClientFactory, ContainerClient};

/// Azure Blob Storage client factory
///
/// Builds a container-scoped client from the service URI, container name and SAS
/// token of a resolved binding. Plain `http://` URIs (Azurite) are allowed.
#[derive(Debug, Clone, Default)]
pub struct AzureClientFactory;

impl AzureClientFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ClientFactory for AzureClientFactory {
    async fn connect(
        &self,
        credentials: &StorageCredentials,
    ) -> AttachmentResult<Arc<dyn ContainerClient>> {
        let uri = credentials.container_uri.trim_end_matches('/');
        // Tokens are sometimes stored with the leading '?' of a query string
        let sas_token = credentials.sas_token.trim_start_matches('?');

        let store = MicrosoftAzureBuilder::new()
            .with_url(uri)
            .with_container_name(credentials.container_name.clone())
            .with_config(AzureConfigKey::SasKey, sas_token)
            .with_allow_http(uri.starts_with("http://"))
            .build()
            .map_err(|e| {
                AttachmentError::Configuration(format!(
                    "Invalid Azure Blob Storage binding for container {}: {}",
                    credentials.container_name, e
                ))
            })?;

        Ok(Arc::new(ObjectStoreContainer::new(
            Arc::new(store),
            credentials.container_name.clone(),
        )))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Azure
    }
}
