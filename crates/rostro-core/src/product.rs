//! Product records and the form payload used to create or edit them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One inventory item.
///
/// Serialized with camelCase keys (`createdAt`) so persisted collections
/// match what the mobile client writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    /// Natural lookup key. Not unique by construction; fixed after creation.
    pub barcode: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub quantity: i64,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Product fields a caller supplies: everything except `id` and `createdAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductForm {
    pub barcode: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub quantity: i64,
    pub category: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("barcode is required")]
    MissingBarcode,
    #[error("name is required")]
    MissingName,
    #[error("category is required")]
    MissingCategory,
    #[error("price must be greater than 0")]
    NonPositivePrice,
    #[error("quantity cannot be negative")]
    NegativeQuantity,
}

impl ProductForm {
    /// Collect every failed field check, in form order.
    pub fn violations(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.barcode.trim().is_empty() {
            errors.push(ValidationError::MissingBarcode);
        }
        if self.name.trim().is_empty() {
            errors.push(ValidationError::MissingName);
        }
        // NaN must fail here as well.
        if !(self.price > 0.0) {
            errors.push(ValidationError::NonPositivePrice);
        }
        if self.quantity < 0 {
            errors.push(ValidationError::NegativeQuantity);
        }
        if self.category.trim().is_empty() {
            errors.push(ValidationError::MissingCategory);
        }
        errors
    }

    /// Fail on the first violated check.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.violations().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Product {
    /// Build a new record from form data with a caller-assigned identity.
    pub fn from_form(id: String, form: ProductForm, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            barcode: form.barcode,
            name: form.name,
            description: form.description,
            price: form.price,
            quantity: form.quantity,
            category: form.category,
            created_at,
        }
    }

    /// Overwrite the editable fields. `id`, `created_at` and `barcode` are kept.
    pub fn apply(&mut self, form: ProductForm) {
        self.name = form.name;
        self.description = form.description;
        self.price = form.price;
        self.quantity = form.quantity;
        self.category = form.category;
    }

    /// The editable view of this record.
    pub fn to_form(&self) -> ProductForm {
        ProductForm {
            barcode: self.barcode.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
            quantity: self.quantity,
            category: self.category.clone(),
        }
    }
}

/// The two sample records used when nothing has been persisted yet.
pub fn seed_products(created_at: DateTime<Utc>) -> Vec<Product> {
    vec![
        Product {
            id: "1".into(),
            barcode: "1234567890123".into(),
            name: "Laptop Gaming".into(),
            description: "Laptop para gaming de alta performance".into(),
            price: 1200.0,
            quantity: 5,
            category: "Electrónicos".into(),
            created_at,
        },
        Product {
            id: "2".into(),
            barcode: "9876543210987".into(),
            name: "Smartphone".into(),
            description: "Teléfono inteligente última generación".into(),
            price: 800.0,
            quantity: 10,
            category: "Electrónicos".into(),
            created_at,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            barcode: "111".into(),
            name: "Mouse".into(),
            description: String::new(),
            price: 20.0,
            quantity: 3,
            category: "Accesorios".into(),
        }
    }

    #[test]
    fn test_valid_form_passes() {
        assert!(form().validate().is_ok());
        assert!(form().violations().is_empty());
    }

    #[test]
    fn test_zero_quantity_is_allowed() {
        let f = ProductForm { quantity: 0, ..form() };
        assert!(f.validate().is_ok());
    }

    #[test]
    fn test_price_must_be_positive() {
        let f = ProductForm { price: 0.0, ..form() };
        assert_eq!(f.validate(), Err(ValidationError::NonPositivePrice));
        let f = ProductForm { price: f64::NAN, ..form() };
        assert_eq!(f.validate(), Err(ValidationError::NonPositivePrice));
    }

    #[test]
    fn test_violations_reports_every_field() {
        let f = ProductForm {
            barcode: "  ".into(),
            name: String::new(),
            description: String::new(),
            price: -1.0,
            quantity: -2,
            category: String::new(),
        };
        assert_eq!(
            f.violations(),
            vec![
                ValidationError::MissingBarcode,
                ValidationError::MissingName,
                ValidationError::NonPositivePrice,
                ValidationError::NegativeQuantity,
                ValidationError::MissingCategory,
            ]
        );
    }

    #[test]
    fn test_apply_keeps_identity_and_barcode() {
        let created = Utc::now();
        let mut p = Product::from_form("abc".into(), form(), created);
        p.apply(ProductForm {
            barcode: "999".into(),
            name: "Mouse Pro".into(),
            price: 35.5,
            ..form()
        });
        assert_eq!(p.id, "abc");
        assert_eq!(p.barcode, "111");
        assert_eq!(p.name, "Mouse Pro");
        assert_eq!(p.price, 35.5);
        assert_eq!(p.created_at, created);
    }

    #[test]
    fn test_json_uses_camel_case() {
        let p = Product::from_form("1".into(), form(), Utc::now());
        let json = serde_json::to_value(&p).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn test_decodes_mobile_client_payload() {
        let raw = r#"[{"id":"1700000000000","barcode":"111","name":"Mouse",
            "description":"","price":20,"quantity":3,"category":"Accesorios",
            "createdAt":"2024-03-01T12:00:00.000Z"}]"#;
        let products: Vec<Product> = serde_json::from_str(raw).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].price, 20.0);
        assert_eq!(products[0].created_at.to_rfc3339(), "2024-03-01T12:00:00+00:00");
    }

    #[test]
    fn test_seed_products() {
        let seeds = seed_products(Utc::now());
        let names: Vec<_> = seeds.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Laptop Gaming", "Smartphone"]);
        assert!(seeds.iter().all(|p| p.to_form().validate().is_ok()));
    }
}
