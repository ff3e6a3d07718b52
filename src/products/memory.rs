use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo::{Product, ProductFields, ProductStore};

/// In-process store used by tests in place of Postgres.
#[derive(Default)]
pub struct MemoryProductStore {
    rows: RwLock<Vec<Product>>,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn list(&self, owner_id: Uuid) -> anyhow::Result<Vec<Product>> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|p| p.user_id == owner_id).cloned().collect())
    }

    async fn insert(&self, owner_id: Uuid, fields: &ProductFields) -> anyhow::Result<Product> {
        let now = OffsetDateTime::now_utc();
        let product = Product {
            id: Uuid::new_v4(),
            user_id: owner_id,
            product_name: fields.product_name.clone(),
            kcal: fields.kcal,
            fat: fields.fat,
            saturated_fat: fields.saturated_fat,
            carbs: fields.carbs,
            protein: fields.protein,
            created_at: now,
            updated_at: now,
        };
        self.rows.write().await.push(product.clone());
        Ok(product)
    }

    async fn replace(
        &self,
        owner_id: Uuid,
        id: Uuid,
        fields: &ProductFields,
    ) -> anyhow::Result<Option<Product>> {
        let mut rows = self.rows.write().await;
        let Some(row) = rows.iter_mut().find(|p| p.id == id && p.user_id == owner_id) else {
            return Ok(None);
        };
        row.product_name = fields.product_name.clone();
        row.kcal = fields.kcal;
        row.fat = fields.fat;
        row.saturated_fat = fields.saturated_fat;
        row.carbs = fields.carbs;
        row.protein = fields.protein;
        row.updated_at = OffsetDateTime::now_utc();
        Ok(Some(row.clone()))
    }

    async fn remove(&self, owner_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|p| !(p.id == id && p.user_id == owner_id));
        Ok(rows.len() != before)
    }
}
