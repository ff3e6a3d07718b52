//! Nutrition aggregation for one calculator session.
//!
//! The selection only stores product ids and gram quantities. Macro values are
//! joined from an immutable [`CatalogSnapshot`] every time totals are read, so a
//! refetched catalog can never leave stale values behind.

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::products::Product;

/// Quantity assigned to a product when it is first selected.
pub const DEFAULT_GRAMS: f64 = 1.0;

/// Macro values, either per 100 g (catalog) or absolute (scaled).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    pub kcal: f64,
    pub fat: f64,
    pub saturated_fat: f64,
    pub carbs: f64,
    pub protein: f64,
}

impl Macros {
    /// Scales per-100 g values to `grams`: `value * grams / 100`.
    pub fn for_grams(&self, grams: f64) -> Macros {
        let scale = |value: f64| value * grams / 100.0;
        Macros {
            kcal: scale(self.kcal),
            fat: scale(self.fat),
            saturated_fat: scale(self.saturated_fat),
            carbs: scale(self.carbs),
            protein: scale(self.protein),
        }
    }

    pub fn rounded(&self) -> Macros {
        Macros {
            kcal: round2(self.kcal),
            fat: round2(self.fat),
            saturated_fat: round2(self.saturated_fat),
            carbs: round2(self.carbs),
            protein: round2(self.protein),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Derived sums over the whole selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NutritionTotals {
    pub grams: f64,
    pub kcal: f64,
    pub fat: f64,
    pub saturated_fat: f64,
    pub carbs: f64,
    pub protein: f64,
}

impl NutritionTotals {
    fn accumulate(self, grams: f64, macros: Macros) -> Self {
        NutritionTotals {
            grams: self.grams + grams,
            kcal: self.kcal + macros.kcal,
            fat: self.fat + macros.fat,
            saturated_fat: self.saturated_fat + macros.saturated_fat,
            carbs: self.carbs + macros.carbs,
            protein: self.protein + macros.protein,
        }
    }

    /// Two-decimal copy for display. Never feed it back into a computation.
    pub fn rounded(&self) -> Self {
        NutritionTotals {
            grams: round2(self.grams),
            kcal: round2(self.kcal),
            fat: round2(self.fat),
            saturated_fat: round2(self.saturated_fat),
            carbs: round2(self.carbs),
            protein: round2(self.protein),
        }
    }
}

/// One selected product's contribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub grams: f64,
    #[serde(flatten)]
    pub nutrition: Macros,
}

impl NutritionLine {
    pub fn rounded(&self) -> Self {
        NutritionLine {
            nutrition: self.nutrition.rounded(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SelectionEntry {
    pub product_id: Uuid,
    pub grams: f64,
}

/// Immutable, cheaply clonable view of an owner's catalog keyed by product id.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    products: Arc<HashMap<Uuid, Product>>,
}

impl CatalogSnapshot {
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        products.into_iter().collect()
    }

    pub fn get(&self, id: Uuid) -> Option<&Product> {
        self.products.get(&id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.products.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl FromIterator<Product> for CatalogSnapshot {
    fn from_iter<I: IntoIterator<Item = Product>>(iter: I) -> Self {
        CatalogSnapshot {
            products: Arc::new(iter.into_iter().map(|p| (p.id, p)).collect()),
        }
    }
}

#[derive(Debug, Error)]
pub enum AggregatorError {
    /// Negative, NaN or infinite quantity. The previous quantity is kept.
    #[error("grams must be a non-negative number, got {0}")]
    InvalidQuantity(f64),

    #[error("product {0} is not in the catalog")]
    UnknownProduct(Uuid),
}

/// Selected products with gram quantities, plus the catalog they are joined against.
#[derive(Debug, Clone, Default)]
pub struct NutritionAggregator {
    catalog: CatalogSnapshot,
    entries: Vec<SelectionEntry>,
}

impl NutritionAggregator {
    pub fn new(catalog: CatalogSnapshot) -> Self {
        NutritionAggregator {
            catalog,
            entries: Vec::new(),
        }
    }

    /// Selects `product` with [`DEFAULT_GRAMS`]. Returns `false` if it was already selected.
    ///
    /// # Errors
    ///
    /// `UnknownProduct` if the product is not part of this session's catalog.
    pub fn add_product(&mut self, product: &Product) -> Result<bool, AggregatorError> {
        if !self.catalog.contains(product.id) {
            return Err(AggregatorError::UnknownProduct(product.id));
        }
        if self.contains(product.id) {
            return Ok(false);
        }
        self.entries.push(SelectionEntry {
            product_id: product.id,
            grams: DEFAULT_GRAMS,
        });
        Ok(true)
    }

    /// Returns whether an entry was removed.
    pub fn remove_product(&mut self, product_id: Uuid) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.product_id != product_id);
        self.entries.len() != before
    }

    /// Sets the quantity of a selected product. Unselected ids are ignored
    /// (returns `Ok(false)`); quantities are never set implicitly.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity` for negative or non-finite `grams`.
    pub fn update_grams(&mut self, product_id: Uuid, grams: f64) -> Result<bool, AggregatorError> {
        if !grams.is_finite() || grams < 0.0 {
            return Err(AggregatorError::InvalidQuantity(grams));
        }
        match self.entries.iter_mut().find(|e| e.product_id == product_id) {
            Some(entry) => {
                entry.grams = grams;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Swaps in a refetched catalog and drops entries whose product is gone.
    /// Returns how many entries were dropped.
    pub fn replace_catalog(&mut self, catalog: CatalogSnapshot) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| catalog.contains(e.product_id));
        self.catalog = catalog;
        before - self.entries.len()
    }

    /// Recomputed from scratch on every call.
    pub fn totals(&self) -> NutritionTotals {
        self.joined()
            .fold(NutritionTotals::default(), |acc, (entry, product)| {
                acc.accumulate(entry.grams, product.macros().for_grams(entry.grams))
            })
    }

    /// Per-product contributions in selection order.
    pub fn lines(&self) -> Vec<NutritionLine> {
        self.joined()
            .map(|(entry, product)| NutritionLine {
                product_id: product.id,
                product_name: product.product_name.clone(),
                grams: entry.grams,
                nutrition: product.macros().for_grams(entry.grams),
            })
            .collect()
    }

    pub fn entries(&self) -> &[SelectionEntry] {
        &self.entries
    }

    pub fn grams_of(&self, product_id: Uuid) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.product_id == product_id)
            .map(|e| e.grams)
    }

    pub fn contains(&self, product_id: Uuid) -> bool {
        self.entries.iter().any(|e| e.product_id == product_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn catalog(&self) -> &CatalogSnapshot {
        &self.catalog
    }

    fn joined(&self) -> impl Iterator<Item = (&SelectionEntry, &Product)> + '_ {
        self.entries
            .iter()
            .filter_map(|e| self.catalog.get(e.product_id).map(|p| (e, p)))
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use time::OffsetDateTime;

    use super::*;

    fn product(name: &str, kcal: f64, fat: f64, saturated_fat: f64, carbs: f64, protein: f64) -> Product {
        Product {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            product_name: name.to_string(),
            kcal,
            fat,
            saturated_fat,
            carbs,
            protein,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn session(products: &[Product]) -> NutritionAggregator {
        NutritionAggregator::new(CatalogSnapshot::new(products.iter().cloned()))
    }

    #[test]
    fn new_session_has_zero_totals() {
        let agg = session(&[]);
        assert!(agg.is_empty());
        assert_eq!(agg.totals(), NutritionTotals::default());
    }

    #[test]
    fn add_defaults_to_one_gram() {
        let p = product("Butter", 717.0, 81.0, 51.0, 0.1, 0.9);
        let mut agg = session(&[p.clone()]);

        assert!(agg.add_product(&p).expect("known product"));
        assert_eq!(agg.grams_of(p.id), Some(DEFAULT_GRAMS));
        assert_eq!(agg.totals().grams, 1.0);
        assert_eq!(agg.totals().kcal, 717.0 * 1.0 / 100.0);
    }

    #[test]
    fn add_twice_keeps_single_entry() {
        let p = product("Rice", 130.0, 0.3, 0.1, 28.0, 2.7);
        let mut agg = session(&[p.clone()]);

        assert!(agg.add_product(&p).expect("first add"));
        agg.update_grams(p.id, 80.0).expect("valid grams");
        assert!(!agg.add_product(&p).expect("second add"));

        assert_eq!(agg.len(), 1);
        assert_eq!(agg.grams_of(p.id), Some(80.0));
    }

    #[test]
    fn add_unknown_product_fails() {
        let known = product("Egg", 155.0, 11.0, 3.3, 1.1, 13.0);
        let stranger = product("Ghost", 1.0, 1.0, 1.0, 1.0, 1.0);
        let mut agg = session(&[known]);

        let err = agg.add_product(&stranger).unwrap_err();
        assert!(matches!(err, AggregatorError::UnknownProduct(id) if id == stranger.id));
        assert!(agg.is_empty());
    }

    #[test]
    fn fifty_grams_halves_the_per_100g_values() {
        let p = product("Mix", 200.0, 10.0, 2.0, 20.0, 5.0);
        let mut agg = session(&[p.clone()]);
        agg.add_product(&p).expect("add");
        agg.update_grams(p.id, 50.0).expect("grams");

        let totals = agg.totals();
        assert_eq!(totals.grams, 50.0);
        assert_eq!(totals.kcal, 100.0);
        assert_eq!(totals.fat, 5.0);
        assert_eq!(totals.saturated_fat, 1.0);
        assert_eq!(totals.carbs, 10.0);
        assert_eq!(totals.protein, 2.5);
    }

    #[test]
    fn removing_a_product_drops_its_contribution() {
        let a = product("A", 200.0, 0.0, 0.0, 0.0, 0.0);
        let b = product("B", 100.0, 0.0, 0.0, 0.0, 0.0);
        let mut agg = session(&[a.clone(), b.clone()]);
        for p in [&a, &b] {
            agg.add_product(p).expect("add");
            agg.update_grams(p.id, 100.0).expect("grams");
        }
        assert_eq!(agg.totals().kcal, 300.0);

        assert!(agg.remove_product(a.id));
        assert_eq!(agg.totals().kcal, 100.0);
        assert_eq!(agg.totals().grams, 100.0);

        assert!(!agg.remove_product(a.id));
    }

    #[test]
    fn clear_zeroes_totals() {
        let a = product("A", 50.0, 1.0, 1.0, 1.0, 1.0);
        let b = product("B", 70.0, 2.0, 2.0, 2.0, 2.0);
        let mut agg = session(&[a.clone(), b.clone()]);
        agg.add_product(&a).expect("add a");
        agg.add_product(&b).expect("add b");
        agg.update_grams(b.id, 250.0).expect("grams");

        agg.clear();

        assert!(agg.is_empty());
        assert_eq!(agg.totals(), NutritionTotals::default());
    }

    #[test]
    fn invalid_quantity_keeps_previous_value() {
        let p = product("Milk", 64.0, 3.6, 2.3, 4.8, 3.3);
        let mut agg = session(&[p.clone()]);
        agg.add_product(&p).expect("add");
        agg.update_grams(p.id, 200.0).expect("grams");

        for bad in [-1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = agg.update_grams(p.id, bad).unwrap_err();
            assert!(matches!(err, AggregatorError::InvalidQuantity(_)));
        }

        assert_eq!(agg.grams_of(p.id), Some(200.0));
    }

    #[test]
    fn zero_grams_is_valid() {
        let p = product("Salt", 0.0, 0.0, 0.0, 0.0, 0.0);
        let mut agg = session(&[p.clone()]);
        agg.add_product(&p).expect("add");

        assert!(agg.update_grams(p.id, 0.0).expect("zero is allowed"));
        assert_eq!(agg.totals().grams, 0.0);
    }

    #[test]
    fn update_grams_on_unselected_product_is_noop() {
        let p = product("Bread", 265.0, 3.2, 0.7, 49.0, 9.0);
        let mut agg = session(&[p.clone()]);

        assert!(!agg.update_grams(p.id, 120.0).expect("valid grams"));
        assert!(agg.is_empty());
        assert_eq!(agg.totals(), NutritionTotals::default());
    }

    #[test]
    fn lines_follow_selection_order() {
        let a = product("Oats", 389.0, 6.9, 1.2, 66.3, 16.9);
        let b = product("Banana", 89.0, 0.3, 0.1, 22.8, 1.1);
        let mut agg = session(&[a.clone(), b.clone()]);
        agg.add_product(&b).expect("add b");
        agg.add_product(&a).expect("add a");
        agg.update_grams(a.id, 40.0).expect("grams");

        let lines = agg.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_name, "Banana");
        assert_eq!(lines[1].product_name, "Oats");
        assert_eq!(lines[1].grams, 40.0);
        assert_eq!(lines[1].nutrition, a.macros().for_grams(40.0));
    }

    #[test]
    fn replace_catalog_prunes_vanished_products() {
        let a = product("A", 100.0, 0.0, 0.0, 0.0, 0.0);
        let b = product("B", 300.0, 0.0, 0.0, 0.0, 0.0);
        let mut agg = session(&[a.clone(), b.clone()]);
        agg.add_product(&a).expect("add a");
        agg.add_product(&b).expect("add b");

        let mut edited = b.clone();
        edited.kcal = 500.0;
        let dropped = agg.replace_catalog(CatalogSnapshot::new([edited]));

        assert_eq!(dropped, 1);
        assert_eq!(agg.catalog().len(), 1);
        assert!(!agg.catalog().is_empty());
        assert!(!agg.contains(a.id));
        assert_eq!(agg.totals().kcal, 5.0);
    }

    #[test]
    fn rounding_is_presentation_only() {
        let p = product("Third", 100.0 / 3.0, 0.0, 0.0, 0.0, 0.0);
        let mut agg = session(&[p.clone()]);
        agg.add_product(&p).expect("add");
        agg.update_grams(p.id, 100.0).expect("grams");

        let totals = agg.totals();
        assert_eq!(totals.rounded().kcal, 33.33);
        assert_eq!(totals.kcal, 100.0 / 3.0 * 100.0 / 100.0);
    }

    #[test]
    fn totals_match_formula_after_random_edits() {
        let products: Vec<Product> = (0..6)
            .map(|i| {
                let f = f64::from(i);
                product(&format!("p{i}"), 37.5 * f + 1.0, 0.7 * f, 0.3 * f, 11.1 * f, 2.9 * f)
            })
            .collect();
        let mut agg = session(&products);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..500 {
            let p = &products[rng.gen_range(0..products.len())];
            match rng.gen_range(0..4) {
                0 => {
                    agg.add_product(p).expect("known product");
                }
                1 => {
                    agg.remove_product(p.id);
                }
                2 => {
                    let grams = rng.gen_range(0.0..500.0);
                    agg.update_grams(p.id, grams).expect("valid grams");
                }
                _ => {
                    let _ = agg.update_grams(p.id, -rng.gen_range(0.1..10.0));
                }
            }

            let expected_kcal: f64 = agg
                .entries()
                .iter()
                .map(|e| {
                    let p = products.iter().find(|p| p.id == e.product_id).expect("selected product exists");
                    p.kcal * e.grams / 100.0
                })
                .sum();
            let expected_grams: f64 = agg.entries().iter().map(|e| e.grams).sum();

            let totals = agg.totals();
            assert!((totals.kcal - expected_kcal).abs() <= 1e-9 * expected_kcal.max(1.0));
            assert!((totals.grams - expected_grams).abs() <= 1e-9 * expected_grams.max(1.0));
        }
    }
}
