/// Row type for the `kv_store` table (see migrations/0001_kv_store.sql).
#[derive(Debug, sqlx::FromRow)]
pub struct BlobRow {
    pub key: String,
    pub value: String,
    /// Unix epoch milliseconds of the last write.
    pub updated_at: i64,
}
