//! Test helpers: services over the in-process backend plus scripted doubles.
//!
//! Run from workspace root: `cargo test -p stowage-storage --test attachment_service_test`.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use http::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use stowage_core::{
    AttachmentEntity, AttachmentKeys, AttachmentRecord, AttachmentResult, BackendError,
    StorageBackend, TenantId,
};
use stowage_storage::{
    AttachmentService, BlobStream, ClientFactory, ContainerClient, InMemoryClientFactory,
    InMemoryMetadataStore, MetadataStore, StaticCredentialResolver, StorageCredentials,
    TenantClientCache,
};
use tokio::sync::Mutex;

pub const INTEGRATION: &str = "attachments-blob-store";

pub fn credentials(container: &str) -> StorageCredentials {
    StorageCredentials::new(container, "memory://local", "sv=2022-11-02&sig=test")
}

pub fn books() -> AttachmentEntity {
    AttachmentEntity::new("catalog.Books.attachments")
}

/// Drain a download into one buffer
pub async fn read_all(mut stream: BlobStream) -> Vec<u8> {
    let mut data = Vec::new();
    while let Some(chunk) = stream.next().await {
        data.extend_from_slice(&chunk.expect("chunk"));
    }
    data
}

pub struct TestService {
    pub service: AttachmentService,
    pub resolver: Arc<StaticCredentialResolver>,
    pub factory: Arc<InMemoryClientFactory>,
    pub metadata: Arc<InMemoryMetadataStore>,
}

impl TestService {
    /// Client on the same in-process container the service writes to
    pub async fn backend(&self, container: &str) -> Arc<dyn ContainerClient> {
        match self.factory.connect(&credentials(container)).await {
            Ok(client) => client,
            Err(err) => panic!("connect failed: {}", err),
        }
    }
}

/// Service over the in-process backend, every tenant bound to container `attachments`
pub fn setup_memory_service() -> TestService {
    let resolver = Arc::new(StaticCredentialResolver::new().with_default(credentials("attachments")));
    let factory = Arc::new(InMemoryClientFactory::new());
    let metadata = Arc::new(InMemoryMetadataStore::new());
    let clients = TenantClientCache::new(resolver.clone(), factory.clone(), INTEGRATION);

    TestService {
        service: AttachmentService::new(clients, metadata.clone()),
        resolver,
        factory,
        metadata,
    }
}

/// Container double answering with fixed results
pub struct ScriptedContainer {
    pub delete_status: StatusCode,
    pub reject_credentials: bool,
    pub uploads: Mutex<Vec<String>>,
}

impl ScriptedContainer {
    pub fn deleting_with(status: StatusCode) -> Self {
        Self {
            delete_status: status,
            reject_credentials: false,
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting_credentials() -> Self {
        Self {
            delete_status: StatusCode::ACCEPTED,
            reject_credentials: true,
            uploads: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ContainerClient for ScriptedContainer {
    fn container_name(&self) -> &str {
        "scripted"
    }

    async fn upload(&self, blob_key: &str, _content: Bytes) -> Result<(), BackendError> {
        if self.reject_credentials {
            return Err(BackendError::authentication("Server failed to authenticate the request"));
        }
        self.uploads.lock().await.push(blob_key.to_string());
        Ok(())
    }

    async fn download(&self, blob_key: &str) -> Result<BlobStream, BackendError> {
        Err(BackendError::not_found(format!("{} does not exist", blob_key)))
    }

    async fn delete(&self, _blob_key: &str) -> Result<StatusCode, BackendError> {
        if self.reject_credentials {
            return Err(BackendError::authentication("Server failed to authenticate the request"));
        }
        Ok(self.delete_status)
    }
}

/// Factory handing out one shared scripted container, counting connects
pub struct ScriptedFactory {
    pub container: Arc<ScriptedContainer>,
    pub connects: AtomicUsize,
}

impl ScriptedFactory {
    pub fn new(container: ScriptedContainer) -> Self {
        Self {
            container: Arc::new(container),
            connects: AtomicUsize::new(0),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientFactory for ScriptedFactory {
    async fn connect(
        &self,
        _credentials: &StorageCredentials,
    ) -> AttachmentResult<Arc<dyn ContainerClient>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.container.clone())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

pub fn setup_scripted_service(
    container: ScriptedContainer,
) -> (AttachmentService, Arc<ScriptedFactory>, Arc<StaticCredentialResolver>) {
    let resolver = Arc::new(StaticCredentialResolver::new().with_default(credentials("scripted")));
    let factory = Arc::new(ScriptedFactory::new(container));
    let clients = TenantClientCache::new(resolver.clone(), factory.clone(), INTEGRATION);
    let service = AttachmentService::new(clients, Arc::new(InMemoryMetadataStore::new()));
    (service, factory, resolver)
}

/// Metadata store that checks, at persist time, whether the blob is already stored
pub struct ProbingMetadataStore {
    pub backend: Arc<dyn ContainerClient>,
    pub observed: Mutex<Vec<(String, bool)>>,
}

#[async_trait]
impl MetadataStore for ProbingMetadataStore {
    async fn read_field(
        &self,
        _entity: &AttachmentEntity,
        _keys: &AttachmentKeys,
        _field: &str,
    ) -> AttachmentResult<Option<String>> {
        Ok(None)
    }

    async fn persist(
        &self,
        _entity: &AttachmentEntity,
        record: &AttachmentRecord,
    ) -> AttachmentResult<()> {
        let stored = self.backend.download(&record.url).await.is_ok();
        self.observed.lock().await.push((record.url.clone(), stored));
        Ok(())
    }
}

pub fn tenant(name: &str) -> TenantId {
    TenantId::new(name)
}
