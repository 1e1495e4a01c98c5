//! Catalog administration (productos / proveedores)

pub mod service;

pub use service::{CatalogEntry, CatalogService, ProductFields, Section, SupplierFields};
