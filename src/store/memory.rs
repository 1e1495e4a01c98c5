//! In-memory document store
//!
//! Preserves insertion order per collection, substitutes server-timestamp
//! sentinels at write time, and applies ordering/limit on read.

use super::{Direction, Document, DocumentStore, Query, StoreError, SERVER_TIMESTAMP};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn stamp(fields: &mut Value) {
        if let Value::Object(map) = fields {
            let now = Value::String(Utc::now().to_rfc3339());
            for value in map.values_mut() {
                if value.as_str() == Some(SERVER_TIMESTAMP) {
                    *value = now.clone();
                }
            }
        }
    }

    fn compare(a: &Value, b: &Value) -> Ordering {
        match (a, b) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            _ => Ordering::Equal,
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn add_doc(&self, collection: &str, mut fields: Value) -> Result<String, StoreError> {
        Self::stamp(&mut fields);
        let id = Uuid::new_v4().to_string();
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                fields,
            });
        Ok(id)
    }

    async fn update_doc(
        &self,
        collection: &str,
        id: &str,
        mut fields: Value,
    ) -> Result<(), StoreError> {
        Self::stamp(&mut fields);
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let document = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        if let (Value::Object(target), Value::Object(updates)) = (&mut document.fields, fields) {
            for (key, value) in updates {
                target.insert(key, value);
            }
        }
        Ok(())
    }

    async fn get_docs(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut documents = collections.get(collection).cloned().unwrap_or_default();

        if let Some((field, direction)) = &query.order_by {
            documents.sort_by(|a, b| {
                let ordering = Self::compare(&a.fields[field.as_str()], &b.fields[field.as_str()]);
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            documents.truncate(limit);
        }
        Ok(documents)
    }

    async fn delete_doc(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        let before = docs.len();
        docs.retain(|d| d.id != id);
        if docs.len() == before {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::server_timestamp;
    use serde_json::json;

    #[tokio::test]
    async fn test_add_and_read_back() {
        let store = MemoryStore::new();
        let id = store
            .add_doc("productos", json!({ "nombre": "Teclado", "precio": 25.0 }))
            .await
            .unwrap();
        let docs = store.get_docs("productos", &Query::new()).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, id);
        assert_eq!(docs[0].fields["nombre"], "Teclado");
    }

    #[tokio::test]
    async fn test_server_timestamp_substitution() {
        let store = MemoryStore::new();
        store
            .add_doc("auditoria", json!({ "fecha": server_timestamp(), "accion": "login" }))
            .await
            .unwrap();
        let docs = store.get_docs("auditoria", &Query::new()).await.unwrap();
        let stamped = docs[0].fields["fecha"].as_str().unwrap();
        assert_ne!(stamped, SERVER_TIMESTAMP);
        assert!(chrono::DateTime::parse_from_rfc3339(stamped).is_ok());
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MemoryStore::new();
        let id = store
            .add_doc("productos", json!({ "nombre": "Teclado", "precio": 25.0 }))
            .await
            .unwrap();
        store
            .update_doc("productos", &id, json!({ "precio": 30.0 }))
            .await
            .unwrap();
        let docs = store.get_docs("productos", &Query::new()).await.unwrap();
        assert_eq!(docs[0].fields["precio"], 30.0);
        assert_eq!(docs[0].fields["nombre"], "Teclado");

        let missing = store
            .update_doc("productos", "nope", json!({ "precio": 1.0 }))
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_order_by_and_limit() {
        let store = MemoryStore::new();
        for (name, ts) in [
            ("a", "2024-01-01T00:00:00Z"),
            ("c", "2024-03-01T00:00:00Z"),
            ("b", "2024-02-01T00:00:00Z"),
        ] {
            store
                .add_doc("auditoria", json!({ "usuario": name, "fecha": ts }))
                .await
                .unwrap();
        }
        let query = Query::new()
            .order_by("fecha", Direction::Descending)
            .limit(2);
        let docs = store.get_docs("auditoria", &query).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].fields["usuario"], "c");
        assert_eq!(docs[1].fields["usuario"], "b");
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        let id = store
            .add_doc("proveedores", json!({ "nombre": "ACME" }))
            .await
            .unwrap();
        store.delete_doc("proveedores", &id).await.unwrap();
        let docs = store.get_docs("proveedores", &Query::new()).await.unwrap();
        assert!(docs.is_empty());
        assert!(matches!(
            store.delete_doc("proveedores", &id).await,
            Err(StoreError::NotFound { .. })
        ));
    }
}
