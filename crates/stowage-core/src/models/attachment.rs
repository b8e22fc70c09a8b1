//! Attachment metadata models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Descriptor of an attachment entity (the entity whose rows point at blobs).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentEntity {
    /// Qualified entity name, e.g. `catalog.Books.attachments`
    pub name: String,
}

impl AttachmentEntity {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Relational table backing this entity: dots in the qualified name become underscores.
    pub fn table_name(&self) -> String {
        self.name.replace('.', "_")
    }
}

/// Key columns selecting a single attachment row, ordered by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentKeys(BTreeMap<String, String>);

impl AttachmentKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys for an attachment addressed by its `id` column.
    pub fn id(id: Uuid) -> Self {
        Self::new().with("id", id.to_string())
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Metadata row for one stored blob.
///
/// `url` holds the blob key inside the tenant's container. `size` and
/// `content_hash` are filled in once the blob has been written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub id: Uuid,
    pub url: String,
    pub filename: String,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
    pub content_hash: Option<String>,
}

impl AttachmentRecord {
    pub fn new(id: Uuid, url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            filename: filename.into(),
            mime_type: None,
            size: None,
            content_hash: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn keys(&self) -> AttachmentKeys {
        AttachmentKeys::id(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_replaces_dots() {
        let entity = AttachmentEntity::new("catalog.Books.attachments");
        assert_eq!(entity.table_name(), "catalog_Books_attachments");
    }

    #[test]
    fn test_keys_are_ordered_by_column() {
        let keys = AttachmentKeys::new().with("up_id", "42").with("id", "7");
        let columns: Vec<_> = keys.iter().map(|(k, _)| k).collect();
        assert_eq!(columns, vec!["id", "up_id"]);
        assert_eq!(keys.get("up_id"), Some("42"));
    }

    #[test]
    fn test_record_keys_use_id() {
        let id = Uuid::new_v4();
        let record = AttachmentRecord::new(id, "k1", "a.txt").with_mime_type("text/plain");
        assert_eq!(record.keys().get("id"), Some(id.to_string().as_str()));
        assert_eq!(record.mime_type.as_deref(), Some("text/plain"));
        assert!(record.size.is_none());
    }
}
