use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::repo::ProductFields;
use crate::error::FieldErrors;

/// Raw create/update body. Fields stay untyped so that a wrong type becomes a
/// per-field message instead of a whole-body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub product_name: Option<Value>,
    #[serde(default)]
    pub kcal: Option<Value>,
    #[serde(default)]
    pub fat: Option<Value>,
    #[serde(default)]
    pub saturated_fat: Option<Value>,
    #[serde(default)]
    pub carbs: Option<Value>,
    #[serde(default)]
    pub protein: Option<Value>,
}

impl ProductForm {
    /// Checks every field and collects all failures at once.
    ///
    /// `product_name` must be a non-blank string (stored trimmed). Macro fields must be
    /// present, numeric (JSON number or numeric string), finite and `>= 0`.
    pub fn validate(&self) -> Result<ProductFields, FieldErrors> {
        let mut errors = FieldErrors::new();

        let product_name = match &self.product_name {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            None | Some(Value::Null) | Some(Value::String(_)) => {
                errors.add("product_name", required("product_name"));
                None
            }
            Some(_) => {
                errors.add("product_name", "The product name field must be a string.");
                None
            }
        };

        let kcal = non_negative("kcal", self.kcal.as_ref(), &mut errors);
        let fat = non_negative("fat", self.fat.as_ref(), &mut errors);
        let saturated_fat = non_negative("saturated_fat", self.saturated_fat.as_ref(), &mut errors);
        let carbs = non_negative("carbs", self.carbs.as_ref(), &mut errors);
        let protein = non_negative("protein", self.protein.as_ref(), &mut errors);

        match (product_name, kcal, fat, saturated_fat, carbs, protein) {
            (Some(product_name), Some(kcal), Some(fat), Some(saturated_fat), Some(carbs), Some(protein))
                if errors.is_empty() =>
            {
                Ok(ProductFields {
                    product_name,
                    kcal,
                    fat,
                    saturated_fat,
                    carbs,
                    protein,
                })
            }
            _ => Err(errors),
        }
    }

    /// The submitted input, echoed back on validation failure.
    pub fn old_input(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn label(field: &str) -> String {
    field.replace('_', " ")
}

fn required(field: &str) -> String {
    format!("The {} field is required.", label(field))
}

fn non_negative(field: &str, value: Option<&Value>, errors: &mut FieldErrors) -> Option<f64> {
    let parsed = match value {
        None | Some(Value::Null) => {
            errors.add(field, required(field));
            return None;
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.add(field, required(field));
            return None;
        }
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match parsed {
        Some(v) if v.is_finite() && v >= 0.0 => Some(v),
        Some(v) if v.is_finite() => {
            errors.add(field, format!("The {} field must be at least 0.", label(field)));
            None
        }
        _ => {
            errors.add(field, format!("The {} field must be a number.", label(field)));
            None
        }
    }
}
