//! Database access for attachment metadata
//!
//! Attachment tables are owned by the host application; their names are derived
//! from the entity name at runtime, so queries are built dynamically with
//! validated, quoted identifiers and bound values.

pub mod attachment;
pub mod identifier;
pub mod pool;

pub use attachment::PgMetadataStore;
pub use pool::connect_pool;
