//! rostro-inventory — Product repository for the barcode inventory screens.
//!
//! A single task owns the product collection and its persisted mirror;
//! [`ProductRepository`] handles queue mutations to it and read published
//! snapshots without waiting.

pub mod repository;

pub use repository::{
    spawn_repository, ProductRepository, RepositoryConfig, RepositoryError, RepositoryState,
    PRODUCTS_KEY,
};
