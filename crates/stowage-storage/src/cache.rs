//! Per-tenant container client cache.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use stowage_core::{AttachmentResult, TenantId};
use tokio::sync::{OnceCell, RwLock};

use crate::traits::{ClientFactory, ContainerClient, CredentialResolver};

/// A ready container client for one tenant
#[derive(Clone)]
pub struct TenantClientHandle {
    pub tenant: TenantId,
    pub container_name: String,
    pub client: Arc<dyn ContainerClient>,
    pub created_at: DateTime<Utc>,
}

impl TenantClientHandle {
    /// Whether both handles wrap the same client instance
    pub fn shares_client(&self, other: &TenantClientHandle) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.client) as *const (),
            Arc::as_ptr(&other.client) as *const (),
        )
    }
}

impl fmt::Debug for TenantClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantClientHandle")
            .field("tenant", &self.tenant)
            .field("container_name", &self.container_name)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

type Slot = Arc<OnceCell<TenantClientHandle>>;

/// Lazily builds and caches one container client per tenant.
///
/// Each tenant gets a `OnceCell` slot, so concurrent first requests for the same
/// tenant share a single resolution. The map lock is released before the slot is
/// initialized; a failed initialization drops the empty slot and the next call
/// retries.
pub struct TenantClientCache {
    resolver: Arc<dyn CredentialResolver>,
    factory: Arc<dyn ClientFactory>,
    integration_name: String,
    slots: RwLock<HashMap<TenantId, Slot>>,
}

impl TenantClientCache {
    pub fn new(
        resolver: Arc<dyn CredentialResolver>,
        factory: Arc<dyn ClientFactory>,
        integration_name: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            factory,
            integration_name: integration_name.into(),
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub fn integration_name(&self) -> &str {
        &self.integration_name
    }

    /// Get the tenant's client, resolving credentials and connecting on first use.
    pub async fn get_client(&self, tenant: &TenantId) -> AttachmentResult<TenantClientHandle> {
        let slot = self.slot(tenant).await;
        match slot.get_or_try_init(|| self.connect(tenant)).await {
            Ok(handle) => Ok(handle.clone()),
            Err(err) => {
                self.discard_empty(tenant, &slot).await;
                Err(err)
            }
        }
    }

    /// Drop the tenant's cached client. Returns whether one was cached.
    pub async fn invalidate(&self, tenant: &TenantId) -> bool {
        let removed = self.slots.write().await.remove(tenant);
        let was_cached = removed.is_some_and(|slot| slot.initialized());
        if was_cached {
            tracing::info!(tenant = %tenant, "Blob store client invalidated");
        }
        was_cached
    }

    pub async fn clear(&self) {
        self.slots.write().await.clear();
    }

    /// Number of tenants with a ready client
    pub async fn len(&self) -> usize {
        self.slots
            .read()
            .await
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, tenant: &TenantId) -> bool {
        self.slots
            .read()
            .await
            .get(tenant)
            .is_some_and(|slot| slot.initialized())
    }

    async fn slot(&self, tenant: &TenantId) -> Slot {
        if let Some(slot) = self.slots.read().await.get(tenant) {
            return slot.clone();
        }

        self.slots
            .write()
            .await
            .entry(tenant.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Remove `slot` if it is still the tenant's entry and was never filled
    async fn discard_empty(&self, tenant: &TenantId, slot: &Slot) {
        let mut slots = self.slots.write().await;
        let stale = slots
            .get(tenant)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && !current.initialized());
        if stale {
            slots.remove(tenant);
        }
    }

    async fn connect(&self, tenant: &TenantId) -> AttachmentResult<TenantClientHandle> {
        let start = Instant::now();
        tracing::debug!(
            tenant = %tenant,
            integration = %self.integration_name,
            "Resolving blob store binding"
        );

        let credentials = self
            .resolver
            .resolve(tenant, &self.integration_name)
            .await?;
        credentials.validate(&self.integration_name)?;

        let client = self.factory.connect(&credentials).await?;

        tracing::info!(
            tenant = %tenant,
            container = %credentials.container_name,
            backend = %self.factory.backend_type(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Blob store client created"
        );

        Ok(TenantClientHandle {
            tenant: tenant.clone(),
            container_name: client.container_name().to_string(),
            client,
            created_at: Utc::now(),
        })
    }
}
