//! Stowage Storage Library
//!
//! This crate moves attachment content between callers and a tenant's blob store
//! container, and keeps the attachment metadata rows in step with it.
//!
//! # Layers
//!
//! - [`CredentialResolver`] hands out the container binding for an integration.
//! - [`TenantClientCache`] turns a binding into a [`ContainerClient`] once per tenant.
//! - [`AttachmentService`] uploads, streams and deletes blobs, then hands the
//!   finished record to a [`MetadataStore`].
//!
//! Backends implement [`ClientFactory`]/[`ContainerClient`]; Azure Blob Storage and
//! an in-process store are provided, both on top of `object_store`.

#[cfg(feature = "storage-azure")]
pub mod azure;
pub mod cache;
pub(crate) mod container;
pub mod credentials;
pub mod factory;
#[cfg(feature = "storage-memory")]
pub mod memory;
pub mod payload;
pub mod service;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "storage-azure")]
pub use azure::AzureClientFactory;
pub use cache::{TenantClientCache, TenantClientHandle};
pub use credentials::{EnvCredentialResolver, StaticCredentialResolver, StorageCredentials};
pub use factory::{create_attachment_service, create_client_factory};
#[cfg(feature = "storage-memory")]
pub use memory::{InMemoryClientFactory, InMemoryMetadataStore};
pub use payload::{BinaryPayload, ContentReader};
pub use service::{AttachmentService, AttachmentUpload};
pub use stowage_core::StorageBackend;
pub use traits::{BlobStream, ClientFactory, ContainerClient, CredentialResolver, MetadataStore};
