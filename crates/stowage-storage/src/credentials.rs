//! Blob store credentials and resolvers.

use async_trait::async_trait;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use stowage_core::{AttachmentError, AttachmentResult, TenantId};

use crate::traits::CredentialResolver;

/// Container binding for one tenant: where the container lives and a
/// time-bounded token authorizing access to it.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageCredentials {
    pub container_name: String,
    /// Base URI of the blob service, e.g. `https://account.blob.core.windows.net`
    pub container_uri: String,
    /// Shared access signature in query-string form (`sv=...&sig=...`)
    pub sas_token: String,
}

impl StorageCredentials {
    pub fn new(
        container_name: impl Into<String>,
        container_uri: impl Into<String>,
        sas_token: impl Into<String>,
    ) -> Self {
        Self {
            container_name: container_name.into(),
            container_uri: container_uri.into(),
            sas_token: sas_token.into(),
        }
    }

    /// Reject bindings with any blank field, naming every missing one.
    pub fn validate(&self, integration: &str) -> AttachmentResult<()> {
        let missing: Vec<&str> = [
            ("container_name", &self.container_name),
            ("container_uri", &self.container_uri),
            ("sas_token", &self.sas_token),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AttachmentError::Configuration(format!(
                "Blob store configuration fields are missing in integration {}: {}",
                integration,
                missing.join(", ")
            )))
        }
    }
}

impl fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("container_name", &self.container_name)
            .field("container_uri", &self.container_uri)
            .field("sas_token", &"<redacted>")
            .finish()
    }
}

/// Resolves bindings from environment variables at call time.
///
/// For integration `attachments-blob-store` it reads
/// `ATTACHMENTS_BLOB_STORE_CONTAINER_NAME`, `ATTACHMENTS_BLOB_STORE_CONTAINER_URI`
/// and `ATTACHMENTS_BLOB_STORE_SAS_TOKEN`. A tenant-specific variable
/// (`..._<TENANT>_...` suffix before the field) takes precedence when present.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentialResolver;

impl EnvCredentialResolver {
    pub fn new() -> Self {
        Self
    }

    fn env_prefix(name: &str) -> String {
        name.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    }

    fn lookup(prefix: &str, tenant: &TenantId, field: &str) -> Option<String> {
        let tenant_var = format!(
            "{}_{}_{}",
            prefix,
            Self::env_prefix(tenant.as_str()),
            field
        );
        env::var(tenant_var)
            .or_else(|_| env::var(format!("{}_{}", prefix, field)))
            .ok()
    }
}

#[async_trait]
impl CredentialResolver for EnvCredentialResolver {
    async fn resolve(
        &self,
        tenant: &TenantId,
        integration: &str,
    ) -> AttachmentResult<StorageCredentials> {
        let prefix = Self::env_prefix(integration);
        let container_name = Self::lookup(&prefix, tenant, "CONTAINER_NAME");
        let container_uri = Self::lookup(&prefix, tenant, "CONTAINER_URI");
        let sas_token = Self::lookup(&prefix, tenant, "SAS_TOKEN");

        if container_name.is_none() && container_uri.is_none() && sas_token.is_none() {
            return Err(AttachmentError::Configuration(format!(
                "Integration {} not found ({}_* variables are unset)",
                integration, prefix
            )));
        }

        Ok(StorageCredentials {
            container_name: container_name.unwrap_or_default(),
            container_uri: container_uri.unwrap_or_default(),
            sas_token: sas_token.unwrap_or_default(),
        })
    }
}

/// Fixed bindings held in memory, keyed by tenant with an optional fallback.
///
/// Counts resolutions so callers can observe cache behaviour.
#[derive(Debug, Default)]
pub struct StaticCredentialResolver {
    integration: Option<String>,
    by_tenant: HashMap<TenantId, StorageCredentials>,
    fallback: Option<StorageCredentials>,
    resolutions: AtomicUsize,
}

impl StaticCredentialResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binding used for every tenant without its own entry
    pub fn with_default(mut self, credentials: StorageCredentials) -> Self {
        self.fallback = Some(credentials);
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<TenantId>, credentials: StorageCredentials) -> Self {
        self.by_tenant.insert(tenant.into(), credentials);
        self
    }

    /// Only answer for this integration name
    pub fn for_integration(mut self, integration: impl Into<String>) -> Self {
        self.integration = Some(integration.into());
        self
    }

    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialResolver for StaticCredentialResolver {
    async fn resolve(
        &self,
        tenant: &TenantId,
        integration: &str,
    ) -> AttachmentResult<StorageCredentials> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);

        if let Some(expected) = &self.integration {
            if expected != integration {
                return Err(AttachmentError::Configuration(format!(
                    "Integration {} not found",
                    integration
                )));
            }
        }

        self.by_tenant
            .get(tenant)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| {
                AttachmentError::Configuration(format!(
                    "No blob store binding for integration {} (tenant {})",
                    integration, tenant
                ))
            })
    }
}
