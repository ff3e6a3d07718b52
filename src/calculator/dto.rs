use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::aggregator::{NutritionLine, NutritionTotals, DEFAULT_GRAMS};
use crate::products::Product;

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub product_id: Uuid,
    #[serde(default = "default_grams")]
    pub grams: f64,
}

fn default_grams() -> f64 {
    DEFAULT_GRAMS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalsRequest {
    #[serde(default)]
    pub entries: Vec<SelectionRequest>,
}

#[derive(Debug, Serialize)]
pub struct TotalsResponse {
    pub lines: Vec<NutritionLine>,
    pub totals: NutritionTotals,
}
