#[cfg(feature = "storage-azure")]
use crate::AzureClientFactory;
#[cfg(feature = "storage-memory")]
use crate::InMemoryClientFactory;
use crate::{AttachmentService, ClientFactory, CredentialResolver, MetadataStore, TenantClientCache};
use std::sync::Arc;
use stowage_core::{AttachmentResult, StorageBackend, StowageConfig};

/// Create the client factory for the configured backend
pub fn create_client_factory(config: &StowageConfig) -> AttachmentResult<Arc<dyn ClientFactory>> {
    match config.storage_backend {
        #[cfg(feature = "storage-azure")]
        StorageBackend::Azure => Ok(Arc::new(AzureClientFactory::new())),

        #[cfg(not(feature = "storage-azure"))]
        StorageBackend::Azure => Err(stowage_core::AttachmentError::Configuration(
            "Azure storage backend not available (storage-azure feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-memory")]
        StorageBackend::Memory => Ok(Arc::new(InMemoryClientFactory::new())),

        #[cfg(not(feature = "storage-memory"))]
        StorageBackend::Memory => Err(stowage_core::AttachmentError::Configuration(
            "In-memory storage backend not available (storage-memory feature not enabled)"
                .to_string(),
        )),
    }
}

/// Wire an [`AttachmentService`] from configuration: backend, integration name
/// and bulk upload bound come from `config`.
pub fn create_attachment_service(
    config: &StowageConfig,
    resolver: Arc<dyn CredentialResolver>,
    metadata: Arc<dyn MetadataStore>,
) -> AttachmentResult<AttachmentService> {
    let factory = create_client_factory(config)?;
    let clients = TenantClientCache::new(resolver, factory, config.integration_name.clone());

    tracing::info!(
        backend = %config.storage_backend,
        integration = %config.integration_name,
        bulk_upload_concurrency = config.bulk_upload_concurrency,
        "Attachment service configured"
    );

    Ok(AttachmentService::new(clients, metadata)
        .with_bulk_upload_concurrency(config.bulk_upload_concurrency))
}
