//! Catalog CRUD over the document store
//!
//! Products and suppliers live in their own collections. Every successful
//! mutation issues a fire-and-forget activity row; the mutation's outcome
//! never depends on the ledger write.

use crate::ledger::SessionLedger;
use crate::models::ActivityKind;
use crate::store::{Document, DocumentStore, Query, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Catalog sections and their backing collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Products,
    Suppliers,
}

impl Section {
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Section::Products => "productos",
            Section::Suppliers => "proveedores",
        }
    }

    #[must_use]
    pub const fn singular(self) -> &'static str {
        match self {
            Section::Products => "Producto",
            Section::Suppliers => "Proveedor",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "productos" => Some(Section::Products),
            "proveedores" => Some(Section::Suppliers),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductFields {
    pub nombre: String,
    pub precio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierFields {
    pub nombre: String,
    pub contacto: String,
}

/// A typed catalog entry; the variant decides the target collection.
#[derive(Debug, Clone)]
pub enum CatalogEntry {
    Product(ProductFields),
    Supplier(SupplierFields),
}

impl CatalogEntry {
    #[must_use]
    pub const fn section(&self) -> Section {
        match self {
            CatalogEntry::Product(_) => Section::Products,
            CatalogEntry::Supplier(_) => Section::Suppliers,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            CatalogEntry::Product(p) => &p.nombre,
            CatalogEntry::Supplier(s) => &s.nombre,
        }
    }

    fn fields(&self) -> Value {
        match self {
            CatalogEntry::Product(p) => serde_json::to_value(p),
            CatalogEntry::Supplier(s) => serde_json::to_value(s),
        }
        .expect("catalog fields serialize to JSON objects")
    }
}

pub struct CatalogService {
    store: Arc<dyn DocumentStore>,
    ledger: Arc<SessionLedger>,
}

impl CatalogService {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, ledger: Arc<SessionLedger>) -> Self {
        Self { store, ledger }
    }

    /// List a section's entries in insertion order.
    ///
    /// # Errors
    /// Propagates store read failures.
    pub async fn list(&self, section: Section) -> Result<Vec<Document>, StoreError> {
        self.store.get_docs(section.collection(), &Query::new()).await
    }

    /// Create an entry; returns the store-assigned id.
    ///
    /// # Errors
    /// Propagates store write failures. The activity row is issued after the
    /// write succeeds and is not awaited.
    pub async fn create(&self, entry: &CatalogEntry) -> Result<String, StoreError> {
        let section = entry.section();
        let id = self
            .store
            .add_doc(section.collection(), entry.fields())
            .await?;
        self.log_activity(
            ActivityKind::Create,
            section,
            format!("{} creado: {}", section.singular(), entry.name()),
        );
        Ok(id)
    }

    /// Replace an entry's fields.
    ///
    /// # Errors
    /// `NotFound` if the id does not exist in the entry's section.
    pub async fn update(&self, id: &str, entry: &CatalogEntry) -> Result<(), StoreError> {
        let section = entry.section();
        self.store
            .update_doc(section.collection(), id, entry.fields())
            .await?;
        self.log_activity(
            ActivityKind::Update,
            section,
            format!("{} actualizado: {}", section.singular(), entry.name()),
        );
        Ok(())
    }

    /// Delete an entry.
    ///
    /// # Errors
    /// `NotFound` if the id does not exist.
    pub async fn delete(&self, section: Section, id: &str) -> Result<(), StoreError> {
        self.store.delete_doc(section.collection(), id).await?;
        self.log_activity(
            ActivityKind::Delete,
            section,
            format!("{} eliminado: {id}", section.singular()),
        );
        Ok(())
    }

    fn log_activity(&self, action: ActivityKind, section: Section, description: String) {
        let ledger = self.ledger.clone();
        let category = section.collection();
        tokio::spawn(async move {
            ledger.record_activity(action, category, &description).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::LocalDirectory;
    use crate::ledger::MemoryLocalStore;
    use crate::store::MemoryStore;
    use std::time::Duration;

    fn service() -> (CatalogService, Arc<MemoryStore>, Arc<MemoryStore>) {
        let catalog_store = Arc::new(MemoryStore::new());
        let audit_store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(SessionLedger::new(
            audit_store.clone(),
            Arc::new(MemoryLocalStore::new()),
            Arc::new(LocalDirectory::new()),
            "auditoria",
        ));
        (
            CatalogService::new(catalog_store.clone(), ledger),
            catalog_store,
            audit_store,
        )
    }

    async fn wait_for_audit_rows(store: &MemoryStore, count: usize) -> Vec<Document> {
        for _ in 0..100 {
            let rows = store.get_docs("auditoria", &Query::new()).await.unwrap();
            if rows.len() >= count {
                return rows;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        store.get_docs("auditoria", &Query::new()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_product_writes_row_and_activity() {
        let (catalog, catalog_store, audit_store) = service();
        let entry = CatalogEntry::Product(ProductFields {
            nombre: "Teclado".to_string(),
            precio: 25.0,
        });
        let id = catalog.create(&entry).await.unwrap();

        let products = catalog_store.get_docs("productos", &Query::new()).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, id);

        let audit = wait_for_audit_rows(&audit_store, 1).await;
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].fields["accion"], "crear");
        assert_eq!(audit[0].fields["tipo"], "productos");
        assert_eq!(audit[0].fields["descripcion"], "Producto creado: Teclado");
    }

    #[tokio::test]
    async fn test_update_and_delete_supplier() {
        let (catalog, catalog_store, audit_store) = service();
        let entry = CatalogEntry::Supplier(SupplierFields {
            nombre: "ACME".to_string(),
            contacto: "acme@example.com".to_string(),
        });
        let id = catalog.create(&entry).await.unwrap();

        let updated = CatalogEntry::Supplier(SupplierFields {
            nombre: "ACME SA".to_string(),
            contacto: "ventas@acme.example".to_string(),
        });
        catalog.update(&id, &updated).await.unwrap();
        let suppliers = catalog_store
            .get_docs("proveedores", &Query::new())
            .await
            .unwrap();
        assert_eq!(suppliers[0].fields["nombre"], "ACME SA");

        catalog.delete(Section::Suppliers, &id).await.unwrap();
        let suppliers = catalog_store
            .get_docs("proveedores", &Query::new())
            .await
            .unwrap();
        assert!(suppliers.is_empty());

        let audit = wait_for_audit_rows(&audit_store, 3).await;
        assert_eq!(audit.len(), 3);
    }

    #[tokio::test]
    async fn test_update_missing_entry_is_not_found() {
        let (catalog, _, _) = service();
        let entry = CatalogEntry::Product(ProductFields {
            nombre: "Teclado".to_string(),
            precio: 25.0,
        });
        assert!(matches!(
            catalog.update("nope", &entry).await,
            Err(StoreError::NotFound { .. })
        ));
    }
}
