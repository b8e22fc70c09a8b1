//! Application-wide constants.

/// Tenant identifier used when a request carries no tenant context.
pub const DEFAULT_TENANT: &str = "default";

/// Integration name handed to the credential resolver when none is configured.
pub const DEFAULT_INTEGRATION_NAME: &str = "attachments-blob-store";

/// Metadata column holding the blob key of an attachment row.
pub const URL_FIELD: &str = "url";

/// Upper bound on concurrent uploads in a single bulk put.
pub const DEFAULT_BULK_UPLOAD_CONCURRENCY: usize = 8;
