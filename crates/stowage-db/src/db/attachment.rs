//! Attachment metadata repository: reads and upserts rows of attachment tables.

use async_trait::async_trait;
use sqlx::PgPool;
use stowage_core::{
    AttachmentEntity, AttachmentError, AttachmentKeys, AttachmentRecord, AttachmentResult,
};
use stowage_storage::MetadataStore;

use super::identifier::quote_identifier;

/// Columns written on persist, in bind order
const RECORD_COLUMNS: [&str; 6] = ["id", "url", "filename", "mime_type", "size", "content_hash"];

/// `SELECT <field>::text FROM <table> WHERE <k1>::text = $1 AND ... LIMIT 1`
///
/// Key columns are compared as text so any key type can be bound as a string.
pub fn select_field_sql(
    entity: &AttachmentEntity,
    keys: &AttachmentKeys,
    field: &str,
) -> AttachmentResult<String> {
    if keys.is_empty() {
        return Err(AttachmentError::Metadata(format!(
            "No key columns given for {}",
            entity.name
        )));
    }

    let table = quote_identifier(&entity.table_name())?;
    let field = quote_identifier(field)?;
    let conditions = keys
        .iter()
        .enumerate()
        .map(|(i, (column, _))| Ok(format!("{}::text = ${}", quote_identifier(column)?, i + 1)))
        .collect::<AttachmentResult<Vec<_>>>()?;

    Ok(format!(
        "SELECT {}::text FROM {} WHERE {} LIMIT 1",
        field,
        table,
        conditions.join(" AND ")
    ))
}

/// Insert-or-update of one attachment row keyed by `id`
pub fn upsert_record_sql(entity: &AttachmentEntity) -> AttachmentResult<String> {
    let table = quote_identifier(&entity.table_name())?;
    let columns = RECORD_COLUMNS
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<AttachmentResult<Vec<_>>>()?;

    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
    let updates: Vec<String> = columns
        .iter()
        .skip(1)
        .map(|c| format!("{} = EXCLUDED.{}", c, c))
        .collect();

    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO UPDATE SET {}",
        table,
        columns.join(", "),
        placeholders.join(", "),
        columns[0],
        updates.join(", ")
    ))
}

/// PostgreSQL-backed metadata store
#[derive(Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    #[tracing::instrument(skip(self, keys), fields(db.table = %entity.table_name()))]
    async fn read_field(
        &self,
        entity: &AttachmentEntity,
        keys: &AttachmentKeys,
        field: &str,
    ) -> AttachmentResult<Option<String>> {
        let sql = select_field_sql(entity, keys, field)?;

        let mut query = sqlx::query_scalar::<_, Option<String>>(&sql);
        for (_, value) in keys.iter() {
            query = query.bind(value);
        }

        let value = query.fetch_optional(&self.pool).await?;
        Ok(value.flatten())
    }

    #[tracing::instrument(skip(self, record), fields(db.table = %entity.table_name(), id = %record.id))]
    async fn persist(
        &self,
        entity: &AttachmentEntity,
        record: &AttachmentRecord,
    ) -> AttachmentResult<()> {
        let sql = upsert_record_sql(entity)?;
        let size = record
            .size
            .map(i64::try_from)
            .transpose()
            .map_err(|_| AttachmentError::Metadata("Attachment size exceeds BIGINT".to_string()))?;

        sqlx::query(&sql)
            .bind(record.id)
            .bind(&record.url)
            .bind(&record.filename)
            .bind(&record.mime_type)
            .bind(size)
            .bind(&record.content_hash)
            .execute(&self.pool)
            .await?;

        tracing::debug!(url = %record.url, "Attachment metadata persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn books() -> AttachmentEntity {
        AttachmentEntity::new("catalog.Books.attachments")
    }

    #[test]
    fn test_select_field_sql() {
        let keys = AttachmentKeys::new().with("up__ID", "7").with("ID", "42");
        let sql = select_field_sql(&books(), &keys, "url").unwrap();
        assert_eq!(
            sql,
            "SELECT \"url\"::text FROM \"catalog_Books_attachments\" \
             WHERE \"ID\"::text = $1 AND \"up__ID\"::text = $2 LIMIT 1"
        );
    }

    #[test]
    fn test_select_field_sql_by_id() {
        let keys = AttachmentKeys::id(Uuid::nil());
        let sql = select_field_sql(&books(), &keys, "url").unwrap();
        assert!(sql.ends_with("WHERE \"id\"::text = $1 LIMIT 1"));
    }

    #[test]
    fn test_select_field_sql_rejects_bad_identifiers() {
        let keys = AttachmentKeys::id(Uuid::nil());
        assert!(select_field_sql(&books(), &keys, "url; --").is_err());

        let keys = AttachmentKeys::new().with("id = id OR 1", "1");
        assert!(select_field_sql(&books(), &keys, "url").is_err());

        assert!(select_field_sql(&books(), &AttachmentKeys::new(), "url").is_err());
    }

    #[test]
    fn test_upsert_record_sql() {
        let sql = upsert_record_sql(&books()).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"catalog_Books_attachments\" \
             (\"id\", \"url\", \"filename\", \"mime_type\", \"size\", \"content_hash\") \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (\"id\") DO UPDATE SET \
             \"url\" = EXCLUDED.\"url\", \"filename\" = EXCLUDED.\"filename\", \
             \"mime_type\" = EXCLUDED.\"mime_type\", \"size\" = EXCLUDED.\"size\", \
             \"content_hash\" = EXCLUDED.\"content_hash\""
        );
    }

    #[test]
    fn test_upsert_rejects_unsafe_entity_name() {
        let entity = AttachmentEntity::new("catalog.Books\"; DROP TABLE x; --");
        assert!(upsert_record_sql(&entity).is_err());
    }
}
