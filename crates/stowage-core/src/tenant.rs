//! Tenant identifiers.
//!
//! Every storage call takes the tenant explicitly. Requests without a tenant
//! context use [`TenantId::default`], which maps to the `"default"` tenant.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::constants::DEFAULT_TENANT;

/// Isolation boundary selecting which credentials and container a call uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Build a tenant id. Blank input falls back to the default tenant.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        if id.trim().is_empty() {
            Self::default()
        } else {
            Self(id)
        }
    }

    /// Resolve an optional tenant context.
    pub fn from_context(tenant: Option<&str>) -> Self {
        tenant.map(Self::new).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_TENANT
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self(DEFAULT_TENANT.to_string())
    }
}

impl Display for TenantId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TenantId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}
