use tracing::{debug, info, warn};
use uuid::Uuid;

use super::dto::ProductForm;
use super::repo::{Product, ProductFields, ProductStore};
use crate::error::AppError;

fn validated(form: &ProductForm) -> Result<ProductFields, AppError> {
    form.validate().map_err(|errors| {
        warn!(fields = ?errors, "product validation failed");
        AppError::validation(errors, form.old_input())
    })
}

pub async fn list(store: &dyn ProductStore, owner_id: Uuid) -> Result<Vec<Product>, AppError> {
    Ok(store.list(owner_id).await?)
}

pub async fn create(
    store: &dyn ProductStore,
    owner_id: Uuid,
    form: &ProductForm,
) -> Result<Product, AppError> {
    let fields = validated(form)?;
    let product = store.insert(owner_id, &fields).await?;
    info!(%owner_id, product_id = %product.id, "product created");
    Ok(product)
}

/// Replaces all mutable fields. Validation runs before the lookup so a bad
/// request never reaches the store.
pub async fn update(
    store: &dyn ProductStore,
    owner_id: Uuid,
    id: Uuid,
    form: &ProductForm,
) -> Result<Product, AppError> {
    let fields = validated(form)?;
    match store.replace(owner_id, id, &fields).await? {
        Some(product) => {
            info!(%owner_id, product_id = %id, "product updated");
            Ok(product)
        }
        None => {
            warn!(%owner_id, product_id = %id, "update of unknown product");
            Err(AppError::NotFound("Product not found".into()))
        }
    }
}

/// Idempotent: removing a missing product is not an error.
pub async fn delete(store: &dyn ProductStore, owner_id: Uuid, id: Uuid) -> Result<(), AppError> {
    if store.remove(owner_id, id).await? {
        info!(%owner_id, product_id = %id, "product deleted");
    } else {
        debug!(%owner_id, product_id = %id, "delete of unknown product ignored");
    }
    Ok(())
}
