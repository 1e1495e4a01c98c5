// Catalog CRUD handlers
use crate::catalog::{CatalogEntry, CatalogService, ProductFields, Section, SupplierFields};
use crate::store::StoreError;
use actix_web::{web, HttpResponse, Result};
use serde_json::json;

/// List a section.
///
/// # Errors
/// Never fails at the actix level
pub async fn list_section(
    path: web::Path<String>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse> {
    let Some(section) = Section::from_name(&path) else {
        return Ok(unknown_section(&path));
    };
    match catalog.list(section).await {
        Ok(docs) => {
            let rows: Vec<serde_json::Value> = docs
                .into_iter()
                .map(|mut doc| {
                    let id = std::mem::take(&mut doc.id);
                    if let Some(object) = doc.fields.as_object_mut() {
                        object.insert("id".to_string(), serde_json::Value::String(id));
                    }
                    doc.fields
                })
                .collect();
            Ok(HttpResponse::Ok().json(rows))
        }
        Err(err) => Ok(store_error_response(&err)),
    }
}

/// Create an entry in a section.
///
/// # Errors
/// Never fails at the actix level
pub async fn create_entry(
    path: web::Path<String>,
    body: web::Json<serde_json::Value>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse> {
    let Some(section) = Section::from_name(&path) else {
        return Ok(unknown_section(&path));
    };
    let entry = match parse_entry(section, body.into_inner()) {
        Ok(entry) => entry,
        Err(response) => return Ok(response),
    };
    match catalog.create(&entry).await {
        Ok(id) => Ok(HttpResponse::Created().json(json!({ "id": id }))),
        Err(err) => Ok(store_error_response(&err)),
    }
}

/// Replace an entry's fields.
///
/// # Errors
/// Never fails at the actix level
pub async fn update_entry(
    path: web::Path<(String, String)>,
    body: web::Json<serde_json::Value>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse> {
    let (section_name, id) = path.into_inner();
    let Some(section) = Section::from_name(&section_name) else {
        return Ok(unknown_section(&section_name));
    };
    let entry = match parse_entry(section, body.into_inner()) {
        Ok(entry) => entry,
        Err(response) => return Ok(response),
    };
    match catalog.update(&id, &entry).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "id": id }))),
        Err(err) => Ok(store_error_response(&err)),
    }
}

/// Delete an entry.
///
/// # Errors
/// Never fails at the actix level
pub async fn delete_entry(
    path: web::Path<(String, String)>,
    catalog: web::Data<CatalogService>,
) -> Result<HttpResponse> {
    let (section_name, id) = path.into_inner();
    let Some(section) = Section::from_name(&section_name) else {
        return Ok(unknown_section(&section_name));
    };
    match catalog.delete(section, &id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(err) => Ok(store_error_response(&err)),
    }
}

fn parse_entry(section: Section, body: serde_json::Value) -> Result<CatalogEntry, HttpResponse> {
    let parsed = match section {
        Section::Products => {
            serde_json::from_value::<ProductFields>(body).map(CatalogEntry::Product)
        }
        Section::Suppliers => {
            serde_json::from_value::<SupplierFields>(body).map(CatalogEntry::Supplier)
        }
    };
    parsed.map_err(|err| {
        HttpResponse::BadRequest().json(json!({
            "error": "invalid_request",
            "error_description": format!("invalid {} fields: {err}", section.collection()),
        }))
    })
}

fn unknown_section(name: &str) -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "error": "unknown_section",
        "error_description": format!("no catalog section named {name}"),
    }))
}

fn store_error_response(err: &StoreError) -> HttpResponse {
    match err {
        StoreError::NotFound { collection, id } => HttpResponse::NotFound().json(json!({
            "error": "not_found",
            "error_description": format!("no document {id} in {collection}"),
        })),
        StoreError::Backend(message) => HttpResponse::InternalServerError().json(json!({
            "error": "server_error",
            "error_description": message,
        })),
    }
}
