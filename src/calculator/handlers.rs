use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, instrument};

use super::{
    aggregator::{AggregatorError, CatalogSnapshot, NutritionAggregator},
    dto::{CatalogResponse, TotalsRequest, TotalsResponse},
};
use crate::{
    auth::jwt::AuthUser,
    error::{AppError, FieldErrors},
    products::services,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/calculator", get(get_catalog))
        .route("/calculator/totals", post(calculate_totals))
}

/// Products the caller can pick from.
#[instrument(skip(state))]
pub async fn get_catalog(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
) -> Result<Json<CatalogResponse>, AppError> {
    let products = services::list(state.products.as_ref(), owner_id).await?;
    Ok(Json(CatalogResponse { products }))
}

/// Replays the submitted selection on a fresh aggregator. Entries are applied
/// in order, so a repeated product keeps one entry and its last quantity.
#[instrument(skip(state, body))]
pub async fn calculate_totals(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Json(body): Json<TotalsRequest>,
) -> Result<Json<TotalsResponse>, AppError> {
    let catalog = CatalogSnapshot::new(services::list(state.products.as_ref(), owner_id).await?);
    let mut aggregator = NutritionAggregator::new(catalog.clone());

    for (idx, entry) in body.entries.iter().enumerate() {
        let product = catalog
            .get(entry.product_id)
            .ok_or(AggregatorError::UnknownProduct(entry.product_id))?;
        aggregator.add_product(product)?;
        aggregator
            .update_grams(entry.product_id, entry.grams)
            .map_err(|e| quantity_error(idx, e, &body))?;
    }

    let totals = aggregator.totals();
    debug!(%owner_id, selected = aggregator.len(), kcal = totals.kcal, "totals computed");

    Ok(Json(TotalsResponse {
        lines: aggregator.lines().iter().map(|l| l.rounded()).collect(),
        totals: totals.rounded(),
    }))
}

fn quantity_error(idx: usize, err: AggregatorError, body: &TotalsRequest) -> AppError {
    let mut errors = FieldErrors::new();
    errors.add(&format!("entries.{idx}.grams"), err.to_string());
    AppError::validation(errors, serde_json::to_value(body).unwrap_or_default())
}

impl From<AggregatorError> for AppError {
    fn from(err: AggregatorError) -> Self {
        match err {
            AggregatorError::UnknownProduct(_) => AppError::NotFound(err.to_string()),
            AggregatorError::InvalidQuantity(_) => {
                let mut errors = FieldErrors::new();
                errors.add("grams", err.to_string());
                AppError::validation(errors, serde_json::Value::Null)
            }
        }
    }
}
