//! Storage abstraction traits
//!
//! These are the seams between the transfer engine and its collaborators: the blob
//! store backend, the credential resolver and the metadata store.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use http::StatusCode;
use std::pin::Pin;
use std::sync::Arc;
use stowage_core::{
    AttachmentEntity, AttachmentKeys, AttachmentRecord, AttachmentResult, BackendError,
    StorageBackend, TenantId,
};

use crate::credentials::StorageCredentials;

/// Byte stream of a downloaded blob, yielded as the backend delivers it
pub type BlobStream = Pin<Box<dyn Stream<Item = Result<Bytes, BackendError>> + Send>>;

/// Per-blob operations against one container
///
/// Implementations classify every failure into a [`BackendError`] kind so the
/// engine can tell a missing blob from a rejected credential from a network error.
#[async_trait]
pub trait ContainerClient: Send + Sync {
    /// Name of the container this client is bound to
    fn container_name(&self) -> &str;

    /// Write `content` under `blob_key`, replacing any existing blob.
    /// Returns once the backend has acknowledged the write.
    async fn upload(&self, blob_key: &str, content: Bytes) -> Result<(), BackendError>;

    /// Open a download of `blob_key`
    async fn download(&self, blob_key: &str) -> Result<BlobStream, BackendError>;

    /// Delete `blob_key` and report the status the backend answered with
    async fn delete(&self, blob_key: &str) -> Result<StatusCode, BackendError>;
}

/// Builds container clients from resolved credentials
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn connect(
        &self,
        credentials: &StorageCredentials,
    ) -> AttachmentResult<Arc<dyn ContainerClient>>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

/// Looks up the blob store binding for a named integration
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Fails with a configuration error when no binding exists for the integration.
    async fn resolve(
        &self,
        tenant: &TenantId,
        integration: &str,
    ) -> AttachmentResult<StorageCredentials>;
}

/// Relational store holding attachment metadata rows
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Read one column of the row selected by `keys`. `None` when the row or value is absent.
    async fn read_field(
        &self,
        entity: &AttachmentEntity,
        keys: &AttachmentKeys,
        field: &str,
    ) -> AttachmentResult<Option<String>>;

    /// Insert or update the row for `record.id`
    async fn persist(
        &self,
        entity: &AttachmentEntity,
        record: &AttachmentRecord,
    ) -> AttachmentResult<()>;
}
