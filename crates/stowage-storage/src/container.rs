//! `ContainerClient` over an `object_store` backend.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use http::StatusCode;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload};
use std::sync::Arc;
use stowage_core::BackendError;

use crate::traits::{BlobStream, ContainerClient};

/// Container-scoped client backed by any `object_store` implementation
pub(crate) struct ObjectStoreContainer {
    store: Arc<dyn object_store::ObjectStore>,
    container: String,
}

impl ObjectStoreContainer {
    pub(crate) fn new(store: Arc<dyn object_store::ObjectStore>, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
        }
    }
}

/// Object location for `blob_key`.
///
/// Keys must already be in canonical form: no leading or trailing `/`, no empty
/// segments. `Path` would otherwise normalize `/k1` and `k1` to the same object.
pub(crate) fn blob_location(blob_key: &str) -> Result<Path, String> {
    let location =
        Path::parse(blob_key).map_err(|e| format!("Invalid blob key {:?}: {}", blob_key, e))?;
    let raw: &str = location.as_ref();
    if blob_key.is_empty() || raw != blob_key {
        return Err(format!(
            "Invalid blob key {:?}: must be non-empty without leading or trailing '/'",
            blob_key
        ));
    }
    Ok(location)
}

/// Map an `object_store` failure onto the three backend categories.
pub(crate) fn classify(err: ObjectStoreError) -> BackendError {
    match err {
        ObjectStoreError::NotFound { .. } => BackendError::not_found(err.to_string()),
        ObjectStoreError::Unauthenticated { .. } | ObjectStoreError::PermissionDenied { .. } => {
            BackendError::authentication(err.to_string())
        }
        other => BackendError::connectivity(other.to_string()),
    }
}

#[async_trait]
impl ContainerClient for ObjectStoreContainer {
    fn container_name(&self) -> &str {
        &self.container
    }

    async fn upload(&self, blob_key: &str, content: Bytes) -> Result<(), BackendError> {
        let location = blob_location(blob_key).map_err(BackendError::not_found)?;
        self.store
            .put(&location, PutPayload::from(content))
            .await
            .map(|_| ())
            .map_err(classify)
    }

    async fn download(&self, blob_key: &str) -> Result<BlobStream, BackendError> {
        let location = blob_location(blob_key).map_err(BackendError::not_found)?;
        let result = self.store.get(&location).await.map_err(classify)?;

        let stream = result
            .into_stream()
            .map(|chunk| chunk.map_err(classify));
        Ok(Box::pin(stream))
    }

    async fn delete(&self, blob_key: &str) -> Result<StatusCode, BackendError> {
        let location = blob_location(blob_key).map_err(BackendError::not_found)?;

        // Some stores answer Ok for a missing path, so check existence first
        match self.store.head(&location).await {
            Ok(_) => {}
            Err(ObjectStoreError::NotFound { .. }) => return Ok(StatusCode::NOT_FOUND),
            Err(e) => return Err(classify(e)),
        }

        match self.store.delete(&location).await {
            // Delete Blob answers 202 Accepted on success
            Ok(()) => Ok(StatusCode::ACCEPTED),
            Err(ObjectStoreError::NotFound { .. }) => Ok(StatusCode::NOT_FOUND),
            Err(e) => Err(classify(e)),
        }
    }
}
