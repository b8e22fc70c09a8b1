//! Stowage Database Library
//!
//! PostgreSQL implementation of the attachment [`MetadataStore`](stowage_storage::MetadataStore)
//! and connection pool setup.

pub mod db;

pub use db::{connect_pool, PgMetadataStore};
