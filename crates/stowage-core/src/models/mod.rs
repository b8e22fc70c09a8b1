//! Data models
//!
//! `entity` holds the application data model the composition queries run over;
//! `attachment` holds the descriptors and metadata rows of stored attachments.

mod attachment;
mod entity;

pub use attachment::*;
pub use entity::*;
