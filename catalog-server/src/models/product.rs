//! Product entity and the payloads that create or modify it
//!
//! `Product` is what the store holds. `ProductInput` carries every writable
//! field (create and full replace), `ProductPatch` carries only the fields a
//! caller wants to change.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::validation::{self, ValidationError};

/// Maximum length for product names (matches the VARCHAR(255) column)
pub const MAX_PRODUCT_NAME_LEN: usize = 255;

/// A stored product row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    /// Assigned by the store on insert; `None` when the store has no default.
    pub created_at: Option<NaiveDateTime>,
}

impl Product {
    /// Build the full-replace record for `id` from an input payload.
    ///
    /// `created_at` is left empty: updates never touch it.
    pub fn from_input(id: i64, input: ProductInput) -> Self {
        Self {
            id,
            name: input.name,
            description: input.description,
            price: input.price,
            quantity: input.quantity,
            created_at: None,
        }
    }
}

/// Writable product fields, used by create and full update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
}

impl ProductInput {
    /// Check the fields the store would otherwise reject.
    ///
    /// Negative prices and quantities are accepted as-is.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)
    }
}

/// Partial update payload
///
/// Text and price fields count as present when they are non-null. Quantity
/// counts as present only when strictly positive: a patch cannot set the
/// stored quantity to zero. That rule is kept from the existing API
/// contract and lives in [`ProductPatch::effective_quantity`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<i32>,
}

impl ProductPatch {
    /// Validate only the fields that are present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.name {
            Some(name) => validate_name(name),
            None => Ok(()),
        }
    }

    /// Quantity to apply, or `None` when the patch leaves quantity alone.
    pub fn effective_quantity(&self) -> Option<i32> {
        self.quantity.filter(|q| *q > 0)
    }

    /// Merge this patch over `current`, keeping `id` and `created_at`.
    pub fn apply_to(&self, current: Product) -> Product {
        Product {
            name: self.name.clone().unwrap_or(current.name),
            description: self.description.clone().or(current.description),
            price: self.price.unwrap_or(current.price),
            quantity: self.effective_quantity().unwrap_or(current.quantity),
            ..current
        }
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    validation::require_text("name", name, MAX_PRODUCT_NAME_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn stored() -> Product {
        Product {
            id: 7,
            name: "Widget".into(),
            description: Some("Blue".into()),
            price: Decimal::from_str("9.99").unwrap(),
            quantity: 3,
            created_at: None,
        }
    }

    #[test]
    fn patch_overwrites_present_fields_only() {
        let patch = ProductPatch {
            name: Some("Gadget".into()),
            price: Some(Decimal::from_str("12.50").unwrap()),
            ..Default::default()
        };

        let merged = patch.apply_to(stored());
        assert_eq!(merged.id, 7);
        assert_eq!(merged.name, "Gadget");
        assert_eq!(merged.description.as_deref(), Some("Blue"));
        assert_eq!(merged.price, Decimal::from_str("12.5").unwrap());
        assert_eq!(merged.quantity, 3);
    }

    #[test]
    fn zero_or_negative_quantity_is_absent() {
        for q in [0, -4] {
            let patch = ProductPatch {
                quantity: Some(q),
                ..Default::default()
            };
            assert_eq!(patch.effective_quantity(), None);
            assert_eq!(patch.apply_to(stored()).quantity, 3);
        }

        let patch = ProductPatch {
            quantity: Some(5),
            ..Default::default()
        };
        assert_eq!(patch.apply_to(stored()).quantity, 5);
    }

    #[test]
    fn null_description_does_not_clear() {
        let patch: ProductPatch = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(
            patch.apply_to(stored()).description.as_deref(),
            Some("Blue")
        );
    }

    #[test]
    fn input_requires_name() {
        let input = ProductInput {
            name: "   ".into(),
            description: None,
            price: Decimal::ZERO,
            quantity: 1,
        };
        assert!(matches!(
            input.validate(),
            Err(ValidationError::Empty { field: "name" })
        ));
    }

    #[test]
    fn input_accepts_numeric_or_string_price() {
        let a: ProductInput =
            serde_json::from_str(r#"{"name": "a", "price": "1.10", "quantity": 1}"#).unwrap();
        let b: ProductInput =
            serde_json::from_str(r#"{"name": "a", "price": 1.10, "quantity": 1}"#).unwrap();
        assert_eq!(a.price, b.price);
        assert_eq!(a.description, None);
    }

    #[test]
    fn name_length_is_bounded() {
        let patch = ProductPatch {
            name: Some("x".repeat(MAX_PRODUCT_NAME_LEN + 1)),
            ..Default::default()
        };
        assert!(matches!(
            patch.validate(),
            Err(ValidationError::TooLong { max: 255, .. })
        ));
    }
}
