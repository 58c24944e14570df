//! PostgreSQL repository. Documents are stored as JSONB.

use super::{Pool, Repository};
use crate::error::Result;
use async_trait::async_trait;
use repairdesk_engine::{OrderRecord, ReferenceDetails, ReferenceKind, RemoteReference};
use sqlx::types::Json;
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: Pool,
}

impl PgRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn reference_from_row(row: &sqlx::postgres::PgRow) -> std::result::Result<RemoteReference, sqlx::Error> {
    let Json(details): Json<ReferenceDetails> = row.try_get("document")?;
    Ok(RemoteReference {
        id: row.try_get("id")?,
        details,
    })
}

#[async_trait]
impl Repository for PgRepository {
    async fn list_orders(&self) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query("SELECT document FROM orders ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<OrderRecord> {
                let Json(order): Json<OrderRecord> = row.try_get("document")?;
                Ok(order)
            })
            .collect()
    }

    async fn get_order(&self, id: &str) -> Result<Option<OrderRecord>> {
        let row = sqlx::query_scalar::<_, Json<OrderRecord>>("SELECT document FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(order)| order))
    }

    async fn insert_order(&self, order: &OrderRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO orders (id, document)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&order.id)
        .bind(Json(order))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn replace_order(&self, order: &OrderRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET document = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(&order.id)
        .bind(Json(order))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_order(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_references(&self, kind: ReferenceKind) -> Result<Vec<RemoteReference>> {
        let rows = sqlx::query(
            r#"
            SELECT id, document
            FROM reference_entities
            WHERE kind = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(kind.path())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(reference_from_row)
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?)
    }

    async fn insert_reference(&self, kind: ReferenceKind, reference: &RemoteReference) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reference_entities (kind, id, document)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(kind.path())
        .bind(&reference.id)
        .bind(Json(&reference.details))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_reference(&self, kind: ReferenceKind, reference: &RemoteReference) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reference_entities
            SET document = $3, updated_at = now()
            WHERE kind = $1 AND id = $2
            "#,
        )
        .bind(kind.path())
        .bind(&reference.id)
        .bind(Json(&reference.details))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
