use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::calculator::Macros;

/// Catalog record. Macro values are per 100 grams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub user_id: Uuid, // owner
    pub product_name: String,
    pub kcal: f64,
    pub fat: f64,
    pub saturated_fat: f64,
    pub carbs: f64,
    pub protein: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Product {
    pub fn macros(&self) -> Macros {
        Macros {
            kcal: self.kcal,
            fat: self.fat,
            saturated_fat: self.saturated_fat,
            carbs: self.carbs,
            protein: self.protein,
        }
    }
}

/// Validated mutable fields of a product. Only `ProductForm::validate` builds these.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFields {
    pub product_name: String,
    pub kcal: f64,
    pub fat: f64,
    pub saturated_fat: f64,
    pub carbs: f64,
    pub protein: f64,
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All products of `owner_id`, oldest first.
    async fn list(&self, owner_id: Uuid) -> anyhow::Result<Vec<Product>>;
    async fn insert(&self, owner_id: Uuid, fields: &ProductFields) -> anyhow::Result<Product>;
    /// Replaces every mutable field; `None` when the owner has no such product.
    async fn replace(
        &self,
        owner_id: Uuid,
        id: Uuid,
        fields: &ProductFields,
    ) -> anyhow::Result<Option<Product>>;
    /// Returns whether a row was actually removed.
    async fn remove(&self, owner_id: Uuid, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgProductStore {
    db: PgPool,
}

impl PgProductStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn list(&self, owner_id: Uuid) -> anyhow::Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, user_id, product_name, kcal, fat, saturated_fat, carbs, protein,
                   created_at, updated_at
            FROM products
            WHERE user_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await
        .context("list products")?;
        Ok(rows)
    }

    async fn insert(&self, owner_id: Uuid, fields: &ProductFields) -> anyhow::Result<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (id, user_id, product_name, kcal, fat, saturated_fat, carbs, protein)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, product_name, kcal, fat, saturated_fat, carbs, protein,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(&fields.product_name)
        .bind(fields.kcal)
        .bind(fields.fat)
        .bind(fields.saturated_fat)
        .bind(fields.carbs)
        .bind(fields.protein)
        .fetch_one(&self.db)
        .await
        .context("insert product")?;
        Ok(product)
    }

    async fn replace(
        &self,
        owner_id: Uuid,
        id: Uuid,
        fields: &ProductFields,
    ) -> anyhow::Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET product_name = $3, kcal = $4, fat = $5, saturated_fat = $6,
                carbs = $7, protein = $8, updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, product_name, kcal, fat, saturated_fat, carbs, protein,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(&fields.product_name)
        .bind(fields.kcal)
        .bind(fields.fat)
        .bind(fields.saturated_fat)
        .bind(fields.carbs)
        .bind(fields.protein)
        .fetch_optional(&self.db)
        .await
        .context("update product")?;
        Ok(product)
    }

    async fn remove(&self, owner_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"DELETE FROM products WHERE id = $1 AND user_id = $2"#)
            .bind(id)
            .bind(owner_id)
            .execute(&self.db)
            .await
            .context("delete product")?;
        Ok(res.rows_affected() > 0)
    }
}
