//! Blob transfer engine.
//!
//! [`AttachmentService`] moves attachment content between callers and the
//! tenant's container: it validates and normalizes uploads, writes the blob,
//! fills in the size and content hash, and hands the record to the
//! [`MetadataStore`]. Reads stream straight from the backend.

use bytes::Bytes;
use futures::{stream, StreamExt};
use http::StatusCode;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;
use stowage_core::constants::{DEFAULT_BULK_UPLOAD_CONCURRENCY, URL_FIELD};
use stowage_core::{
    AttachmentEntity, AttachmentError, AttachmentKeys, AttachmentRecord, AttachmentResult,
    ErrorMetadata, LogLevel, Operation, TenantId, TransferContext,
};
use uuid::Uuid;

use crate::cache::TenantClientCache;
use crate::container::blob_location;
use crate::payload::BinaryPayload;
use crate::traits::{BlobStream, MetadataStore};

/// One attachment to store: its metadata row and the content to write.
///
/// `record.url` is the blob key inside the tenant's container.
#[derive(Debug)]
pub struct AttachmentUpload {
    pub record: AttachmentRecord,
    pub content: Option<BinaryPayload>,
}

impl AttachmentUpload {
    pub fn new(record: AttachmentRecord, content: impl Into<BinaryPayload>) -> Self {
        Self {
            record,
            content: Some(content.into()),
        }
    }

    /// An upload carrying no content; rejected by [`AttachmentService::put`]
    pub fn without_content(record: AttachmentRecord) -> Self {
        Self {
            record,
            content: None,
        }
    }
}

/// Attachment transfer service
pub struct AttachmentService {
    clients: TenantClientCache,
    metadata: Arc<dyn MetadataStore>,
    bulk_upload_concurrency: usize,
}

impl AttachmentService {
    pub fn new(clients: TenantClientCache, metadata: Arc<dyn MetadataStore>) -> Self {
        Self {
            clients,
            metadata,
            bulk_upload_concurrency: DEFAULT_BULK_UPLOAD_CONCURRENCY,
        }
    }

    /// Bound the number of uploads [`put_many`](Self::put_many) runs at once
    pub fn with_bulk_upload_concurrency(mut self, limit: usize) -> Self {
        self.bulk_upload_concurrency = limit.max(1);
        self
    }

    pub fn clients(&self) -> &TenantClientCache {
        &self.clients
    }

    /// Store one attachment.
    ///
    /// Validation and content normalization happen before any credential is
    /// resolved, so a rejected upload never touches the network. A blob written
    /// before a later failure is left in place.
    #[tracing::instrument(skip_all, fields(tenant = %tenant, entity = %entity.name))]
    pub async fn put(
        &self,
        tenant: &TenantId,
        entity: &AttachmentEntity,
        upload: AttachmentUpload,
    ) -> AttachmentResult<AttachmentRecord> {
        let start = Instant::now();
        let AttachmentUpload { record, content } = upload;
        let mut context = TransferContext {
            filename: Some(record.filename.clone()),
            attachment_id: Some(record.id),
            blob_key: Some(record.url.clone()),
            ..Default::default()
        };

        tracing::debug!(
            filename = %record.filename,
            blob_key = %record.url,
            "Uploading attachment"
        );

        match self
            .upload(tenant, entity, record, content, &mut context)
            .await
        {
            Ok(record) => {
                tracing::info!(
                    filename = %record.filename,
                    blob_key = %record.url,
                    size = record.size.unwrap_or_default(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Attachment uploaded"
                );
                Ok(record)
            }
            Err(err) => Err(self.fail(tenant, Operation::Upload, err, context, start).await),
        }
    }

    /// Store several attachments concurrently.
    ///
    /// Every upload runs to completion; the first failure in input order is
    /// returned. Uploads that succeeded before that failure stay stored.
    pub async fn put_many(
        &self,
        tenant: &TenantId,
        entity: &AttachmentEntity,
        uploads: Vec<AttachmentUpload>,
    ) -> AttachmentResult<Vec<AttachmentRecord>> {
        let start = Instant::now();
        let total = uploads.len();

        let results: Vec<AttachmentResult<AttachmentRecord>> = stream::iter(uploads)
            .map(|upload| self.put(tenant, entity, upload))
            .buffered(self.bulk_upload_concurrency)
            .collect()
            .await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            tracing::warn!(
                tenant = %tenant,
                entity = %entity.name,
                total = total,
                failed = failed,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Bulk upload finished with failures"
            );
        } else {
            tracing::info!(
                tenant = %tenant,
                entity = %entity.name,
                total = total,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Bulk upload finished"
            );
        }

        results.into_iter().collect()
    }

    /// Open the content of the attachment selected by `keys`.
    ///
    /// Returns `None` when no blob key is recorded for the row. The stream is
    /// handed out as the backend delivers it, without buffering.
    #[tracing::instrument(skip_all, fields(tenant = %tenant, entity = %entity.name))]
    pub async fn get(
        &self,
        tenant: &TenantId,
        entity: &AttachmentEntity,
        keys: &AttachmentKeys,
    ) -> AttachmentResult<Option<BlobStream>> {
        let start = Instant::now();
        let mut context = TransferContext {
            attachment_id: keys.get("id").and_then(|id| Uuid::parse_str(id).ok()),
            ..Default::default()
        };

        match self.download(tenant, entity, keys, &mut context).await {
            Ok(Some(stream)) => {
                tracing::debug!(
                    blob_key = ?context.blob_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Attachment download started"
                );
                Ok(Some(stream))
            }
            Ok(None) => {
                tracing::warn!("No blob key recorded for attachment");
                Ok(None)
            }
            Err(err) => Err(self.fail(tenant, Operation::Download, err, context, start).await),
        }
    }

    /// Delete a blob. `true` only when the backend accepted the deletion.
    #[tracing::instrument(skip_all, fields(tenant = %tenant))]
    pub async fn delete(&self, tenant: &TenantId, blob_key: &str) -> AttachmentResult<bool> {
        let start = Instant::now();
        let mut context = TransferContext {
            blob_key: Some(blob_key.to_string()),
            ..Default::default()
        };

        match self.remove(tenant, blob_key, &mut context).await {
            Ok(status) if status == StatusCode::ACCEPTED => {
                tracing::info!(
                    blob_key = %blob_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Blob deleted"
                );
                Ok(true)
            }
            Ok(status) => {
                tracing::warn!(
                    blob_key = %blob_key,
                    status = %status,
                    "Blob deletion was not accepted"
                );
                Ok(false)
            }
            Err(err) => Err(self.fail(tenant, Operation::Delete, err, context, start).await),
        }
    }

    async fn upload(
        &self,
        tenant: &TenantId,
        entity: &AttachmentEntity,
        record: AttachmentRecord,
        content: Option<BinaryPayload>,
        context: &mut TransferContext,
    ) -> AttachmentResult<AttachmentRecord> {
        validate_blob_key(&record.url)?;
        let content = content.ok_or_else(|| {
            AttachmentError::Validation("Attachment content is required".to_string())
        })?;
        if content.declared_len() == Some(0) {
            return Err(AttachmentError::Validation(
                "Attachment content is empty".to_string(),
            ));
        }

        let bytes = content.into_bytes().await?;
        if bytes.is_empty() {
            return Err(AttachmentError::Validation(
                "Attachment content is empty".to_string(),
            ));
        }

        let handle = self.clients.get_client(tenant).await?;
        context.container = Some(handle.container_name.clone());

        handle.client.upload(&record.url, bytes.clone()).await?;
        tracing::debug!(
            container = %handle.container_name,
            blob_key = %record.url,
            size = bytes.len(),
            "Blob written"
        );

        self.finalize_upload(entity, record, &bytes).await
    }

    /// Record size and SHA-256 of the acknowledged content, then persist the row.
    ///
    /// Runs only after the backend has confirmed the write, so the metadata
    /// store always sees a blob that is already stored.
    async fn finalize_upload(
        &self,
        entity: &AttachmentEntity,
        mut record: AttachmentRecord,
        content: &Bytes,
    ) -> AttachmentResult<AttachmentRecord> {
        record.size = Some(content.len() as u64);
        record.content_hash = Some(hex::encode(Sha256::digest(content)));
        self.metadata.persist(entity, &record).await?;
        Ok(record)
    }

    async fn download(
        &self,
        tenant: &TenantId,
        entity: &AttachmentEntity,
        keys: &AttachmentKeys,
        context: &mut TransferContext,
    ) -> AttachmentResult<Option<BlobStream>> {
        let blob_key = match self.metadata.read_field(entity, keys, URL_FIELD).await? {
            Some(key) if !key.trim().is_empty() => key,
            _ => return Ok(None),
        };
        context.blob_key = Some(blob_key.clone());
        validate_blob_key(&blob_key)?;

        let handle = self.clients.get_client(tenant).await?;
        context.container = Some(handle.container_name.clone());

        let stream = handle.client.download(&blob_key).await?;
        Ok(Some(stream))
    }

    async fn remove(
        &self,
        tenant: &TenantId,
        blob_key: &str,
        context: &mut TransferContext,
    ) -> AttachmentResult<StatusCode> {
        validate_blob_key(blob_key)?;

        let handle = self.clients.get_client(tenant).await?;
        context.container = Some(handle.container_name.clone());

        Ok(handle.client.delete(blob_key).await?)
    }

    /// Log a failed transfer with its hint, drop a rejected credential, and wrap
    /// the error with its context.
    async fn fail(
        &self,
        tenant: &TenantId,
        operation: Operation,
        err: AttachmentError,
        mut context: TransferContext,
        start: Instant,
    ) -> AttachmentError {
        context.elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        if err.is_authentication_failure() {
            self.clients.invalidate(tenant).await;
        }

        let hint = err.suggested_action().unwrap_or_default();
        match err.log_level() {
            LogLevel::Debug => tracing::debug!(
                operation = %operation,
                context = %context,
                error = %err,
                "Attachment {} rejected",
                operation
            ),
            LogLevel::Warn => tracing::warn!(
                operation = %operation,
                context = %context,
                error = %err,
                error_code = err.error_code(),
                hint = hint,
                "Attachment {} failed",
                operation
            ),
            LogLevel::Error => tracing::error!(
                operation = %operation,
                context = %context,
                error = %err,
                error_code = err.error_code(),
                hint = hint,
                "Attachment {} failed",
                operation
            ),
        }

        err.in_transfer(operation, context)
    }
}

/// Reject blank keys and keys the backend would rewrite (`/k1`, `a//b`, `k1/`).
fn validate_blob_key(blob_key: &str) -> AttachmentResult<()> {
    if blob_key.trim().is_empty() {
        return Err(AttachmentError::Validation(
            "Attachment url (blob key) is required".to_string(),
        ));
    }
    blob_location(blob_key)
        .map(|_| ())
        .map_err(AttachmentError::Validation)
}

#[cfg(all(test, feature = "storage-memory"))]
mod tests {
    use super::*;
    use crate::credentials::{StaticCredentialResolver, StorageCredentials};
    use crate::memory::{InMemoryClientFactory, InMemoryMetadataStore};
    use std::io::Cursor;
    use stowage_core::ErrorKind;

    fn service() -> (AttachmentService, Arc<InMemoryMetadataStore>) {
        let resolver = Arc::new(StaticCredentialResolver::new().with_default(
            StorageCredentials::new("attachments", "memory://local", "sv=1&sig=x"),
        ));
        let clients = TenantClientCache::new(
            resolver,
            Arc::new(InMemoryClientFactory::new()),
            "attachments-blob-store",
        );
        let metadata = Arc::new(InMemoryMetadataStore::new());
        (AttachmentService::new(clients, metadata.clone()), metadata)
    }

    fn entity() -> AttachmentEntity {
        AttachmentEntity::new("catalog.Books.attachments")
    }

    #[tokio::test]
    async fn test_put_fills_size_and_hash() {
        let (service, metadata) = service();
        let record = AttachmentRecord::new(Uuid::new_v4(), "k1", "hello.txt");

        let stored = service
            .put(
                &TenantId::default(),
                &entity(),
                AttachmentUpload::new(record.clone(), b"hello".as_slice()),
            )
            .await
            .unwrap();

        assert_eq!(stored.size, Some(5));
        assert_eq!(
            stored.content_hash.as_deref(),
            Some("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
        );
        assert_eq!(metadata.get(&entity(), record.id).await, Some(stored));
    }

    #[tokio::test]
    async fn test_put_accepts_sized_stream() {
        let (service, _) = service();
        let record = AttachmentRecord::new(Uuid::new_v4(), "k1", "a.bin");
        let upload = AttachmentUpload {
            record,
            content: Some(BinaryPayload::sized(3, Cursor::new(vec![1u8, 2, 3]))),
        };

        let stored = service
            .put(&TenantId::default(), &entity(), upload)
            .await
            .unwrap();
        assert_eq!(stored.size, Some(3));
    }

    #[tokio::test]
    async fn test_put_rejects_length_mismatch() {
        let (service, metadata) = service();
        let record = AttachmentRecord::new(Uuid::new_v4(), "k1", "a.bin");
        let upload = AttachmentUpload {
            record,
            content: Some(BinaryPayload::sized(10, Cursor::new(vec![1u8, 2, 3]))),
        };

        let err = service
            .put(&TenantId::default(), &entity(), upload)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.operation(), Some(Operation::Upload));
        assert!(metadata.is_empty().await);
    }

    #[tokio::test]
    async fn test_put_rejects_missing_and_empty_content() {
        let (service, _) = service();
        let tenant = TenantId::default();

        let missing = AttachmentUpload::without_content(AttachmentRecord::new(
            Uuid::new_v4(),
            "k1",
            "a.txt",
        ));
        let err = service.put(&tenant, &entity(), missing).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let empty = AttachmentUpload {
            record: AttachmentRecord::new(Uuid::new_v4(), "k2", "b.txt"),
            content: Some(BinaryPayload::stream(Cursor::new(Vec::new()))),
        };
        let err = service.put(&tenant, &entity(), empty).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!service.clients().contains(&tenant).await);
    }

    #[tokio::test]
    async fn test_error_carries_transfer_context() {
        let (service, _) = service();
        let id = Uuid::new_v4();
        let upload = AttachmentUpload::new(AttachmentRecord::new(id, "", "a.txt"), vec![1u8]);

        let err = service
            .put(&TenantId::default(), &entity(), upload)
            .await
            .unwrap_err();
        let context = err.context().unwrap();
        assert_eq!(context.filename.as_deref(), Some("a.txt"));
        assert_eq!(context.attachment_id, Some(id));
        assert_eq!(context.container, None);
    }

    #[tokio::test]
    async fn test_put_rejects_keys_the_backend_would_rewrite() {
        let (service, metadata) = service();
        let tenant = TenantId::default();

        for key in ["/", "/k1", "k1/", "a//b"] {
            let upload = AttachmentUpload::new(
                AttachmentRecord::new(Uuid::new_v4(), key, "a.txt"),
                vec![1u8, 2, 3],
            );
            let err = service.put(&tenant, &entity(), upload).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{:?}", key);
        }
        assert!(!service.clients().contains(&tenant).await);
        assert!(metadata.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_rejects_blank_key() {
        let (service, _) = service();
        let err = service.delete(&TenantId::default(), " ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.operation(), Some(Operation::Delete));
    }
}
