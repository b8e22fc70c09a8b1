//! Stowage Core Library
//!
//! This crate provides the domain types shared by every Stowage component:
//! configuration, the error taxonomy, tenant identifiers, attachment records and
//! the entity model with its composition queries.

pub mod composition;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod tenant;

// Re-export commonly used types
pub use composition::{
    attachment_paths, has_attachment_composition, is_attachment_entity, AttachmentCapabilities,
};
pub use config::StowageConfig;
pub use error::{
    AttachmentError, AttachmentResult, BackendError, BackendErrorKind, ErrorKind, ErrorMetadata,
    LogLevel, Operation, TransferContext,
};
pub use models::{
    AttachmentEntity, AttachmentKeys, AttachmentPath, AttachmentRecord, EntityGraph, EntityId,
    EntityModel,
};
pub use storage_types::StorageBackend;
pub use tenant::TenantId;
