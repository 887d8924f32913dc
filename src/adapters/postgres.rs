//! PostgreSQL implementation for the document store.
//!
//! Every collection shares the `documents` table; fields live in a JSONB
//! column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::distributions::{Alphanumeric, DistString};
use rand::rngs::OsRng;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgQueryResult};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::domain::{
    CollectionRef, DocumentRef, DocumentSnapshot, Fields, QuerySnapshot,
};
use crate::ports::store::{DocumentStore, Result, StoreError, ToBackend};

pub const DEFAULT_CREDENTIALS: &str = "postgres";
pub const DEFAULT_DATABASE_NAME: &str = "postwall";
pub const DEFAULT_POOL_SIZE: u32 = 10;
const DOCUMENT_ID_LENGTH: usize = 20;

/// Document record as stored in the database.
#[derive(Debug, Clone, FromRow)]
pub struct DocumentRecord {
    pub id: String,
    pub fields: Json<Value>,
    pub created_at: DateTime<Utc>,
}

impl DocumentRecord {
    fn into_snapshot(
        self,
        collection: &CollectionRef,
    ) -> Result<DocumentSnapshot> {
        let fields: Fields = serde_json::from_value(self.fields.0)?;
        Ok(DocumentSnapshot::new(collection.doc(self.id), Some(fields)))
    }
}

/// PostgreSQL document store.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Create a new [`PgDocumentStore`] on an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool.
    pub async fn connect(
        hostname: &str,
        username: &str,
        password: &str,
        db: &str,
        pool: u32,
    ) -> std::result::Result<Self, sqlx::Error> {
        let addr = format!("postgres://{username}:{password}@{hostname}/{db}");
        let pool = PgPoolOptions::new().max_connections(pool);
        let postgres = pool.connect(&addr).await?;

        tracing::info!(%hostname, %db, "postgres connected");

        Ok(Self::new(postgres))
    }

    /// Run the bundled migrations.
    pub async fn migrate(
        &self,
    ) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.pool).await
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn add(
        &self,
        collection: &CollectionRef,
        fields: Fields,
    ) -> Result<DocumentRef> {
        let id = Alphanumeric.sample_string(&mut OsRng, DOCUMENT_ID_LENGTH);
        let reference = collection.doc(id);

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, fields)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&reference.collection)
        .bind(&reference.id)
        .bind(Json(Value::Object(fields)))
        .execute(&self.pool)
        .await
        .catch()?;

        tracing::debug!(%reference, "document added");
        Ok(reference)
    }

    async fn update(
        &self,
        reference: &DocumentRef,
        fields: Fields,
    ) -> Result<()> {
        let result: PgQueryResult = sqlx::query(
            r#"
            UPDATE documents
            SET
                fields = fields || $3,
                updated_at = NOW()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(&reference.collection)
        .bind(&reference.id)
        .bind(Json(Value::Object(fields)))
        .execute(&self.pool)
        .await
        .catch()?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(reference));
        }

        Ok(())
    }

    async fn delete(&self, reference: &DocumentRef) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(&reference.collection)
        .bind(&reference.id)
        .execute(&self.pool)
        .await
        .catch()?;

        Ok(())
    }

    async fn get(&self, reference: &DocumentRef) -> Result<DocumentSnapshot> {
        let record = sqlx::query_as::<_, DocumentRecord>(
            r#"
            SELECT id, fields, created_at
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(&reference.collection)
        .bind(&reference.id)
        .fetch_optional(&self.pool)
        .await
        .catch()?;

        match record {
            Some(record) => {
                let collection =
                    CollectionRef::new(reference.collection.clone());
                record.into_snapshot(&collection)
            },
            _ => Ok(DocumentSnapshot::missing(reference.clone())),
        }
    }

    async fn get_all(
        &self,
        collection: &CollectionRef,
    ) -> Result<QuerySnapshot> {
        let records = sqlx::query_as::<_, DocumentRecord>(
            r#"
            SELECT id, fields, created_at
            FROM documents
            WHERE collection = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await
        .catch()?;

        let docs = records
            .into_iter()
            .map(|record| record.into_snapshot(collection))
            .collect::<Result<Vec<_>>>()?;

        Ok(QuerySnapshot::new(docs))
    }
}
