//! In-process backend and metadata store.
//!
//! [`InMemoryClientFactory`] keeps one `object_store::memory::InMemory` per
//! container binding, so every client built for the same binding sees the same
//! blobs. [`InMemoryMetadataStore`] keeps attachment rows in a map. Both are
//! used for local development and tests.

use async_trait::async_trait;
use object_store::memory::InMemory;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use stowage_core::{
    AttachmentEntity, AttachmentError, AttachmentKeys, AttachmentRecord, AttachmentResult,
    StorageBackend,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::container::ObjectStoreContainer;
use crate::credentials::StorageCredentials;
use crate::traits::{ClientFactory, ContainerClient, MetadataStore};

/// Client factory for in-process containers
#[derive(Default)]
pub struct InMemoryClientFactory {
    containers: Mutex<HashMap<(String, String), Arc<InMemory>>>,
    connections: AtomicUsize,
}

impl InMemoryClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of clients built so far
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientFactory for InMemoryClientFactory {
    async fn connect(
        &self,
        credentials: &StorageCredentials,
    ) -> AttachmentResult<Arc<dyn ContainerClient>> {
        let key = (
            credentials.container_uri.clone(),
            credentials.container_name.clone(),
        );
        let store = self
            .containers
            .lock()
            .await
            .entry(key)
            .or_insert_with(|| Arc::new(InMemory::new()))
            .clone();

        self.connections.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(ObjectStoreContainer::new(
            store,
            credentials.container_name.clone(),
        )))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

/// Metadata store keeping rows in memory, keyed by entity name and attachment id
#[derive(Default)]
pub struct InMemoryMetadataStore {
    rows: Mutex<HashMap<(String, Uuid), AttachmentRecord>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row without going through an upload
    pub async fn insert(&self, entity: &AttachmentEntity, record: AttachmentRecord) {
        self.rows
            .lock()
            .await
            .insert((entity.name.clone(), record.id), record);
    }

    pub async fn get(&self, entity: &AttachmentEntity, id: Uuid) -> Option<AttachmentRecord> {
        self.rows
            .lock()
            .await
            .get(&(entity.name.clone(), id))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

fn field_value(record: &AttachmentRecord, field: &str) -> AttachmentResult<Option<String>> {
    let value = match field {
        "id" => Some(record.id.to_string()),
        "url" => Some(record.url.clone()),
        "filename" => Some(record.filename.clone()),
        "mime_type" => record.mime_type.clone(),
        "size" => record.size.map(|s| s.to_string()),
        "content_hash" => record.content_hash.clone(),
        other => {
            return Err(AttachmentError::Metadata(format!(
                "Unknown attachment field: {}",
                other
            )))
        }
    };
    Ok(value)
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn read_field(
        &self,
        entity: &AttachmentEntity,
        keys: &AttachmentKeys,
        field: &str,
    ) -> AttachmentResult<Option<String>> {
        let id = keys
            .get("id")
            .ok_or_else(|| AttachmentError::Metadata("Attachment keys must include id".to_string()))?;
        let id = Uuid::parse_str(id)
            .map_err(|e| AttachmentError::Metadata(format!("Invalid attachment id: {}", e)))?;

        let rows = self.rows.lock().await;
        match rows.get(&(entity.name.clone(), id)) {
            Some(record) => field_value(record, field),
            None => Ok(None),
        }
    }

    async fn persist(
        &self,
        entity: &AttachmentEntity,
        record: &AttachmentRecord,
    ) -> AttachmentResult<()> {
        self.rows
            .lock()
            .await
            .insert((entity.name.clone(), record.id), record.clone());
        Ok(())
    }
}
