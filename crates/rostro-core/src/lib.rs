//! rostro-core — Domain types shared by the inventory and facial-login crates.
//!
//! Product records and their form payload, field validation, and the
//! uniform result shapes handed back to callers.

pub mod product;
pub mod types;

pub use product::{seed_products, Product, ProductForm, ValidationError};
pub use types::{FacialAuthResponse, OperationResult};
