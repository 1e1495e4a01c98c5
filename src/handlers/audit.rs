// Audit history handler
use crate::ledger::{session_duration_label, SessionLedger};
use crate::settings::TenderoSettings;
use actix_web::{web, HttpResponse, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

/// Most recent audit rows, newest first. Session rows carry a computed
/// `duracion` label; rows still open report `in progress`.
///
/// # Errors
/// Never fails at the actix level
pub async fn audit_history(
    query: web::Query<AuditQuery>,
    ledger: web::Data<SessionLedger>,
    settings: web::Data<TenderoSettings>,
) -> Result<HttpResponse> {
    let limit = query.limit.unwrap_or(settings.audit.history_limit);
    match ledger.audit_trail(limit).await {
        Ok(docs) => {
            let rows: Vec<Value> = docs.into_iter().map(|doc| present(doc.id, doc.fields)).collect();
            Ok(HttpResponse::Ok().json(rows))
        }
        Err(err) => Ok(HttpResponse::InternalServerError().json(json!({
            "error": "server_error",
            "error_description": err.to_string(),
        }))),
    }
}

fn present(id: String, mut fields: Value) -> Value {
    if let Some(object) = fields.as_object_mut() {
        object.insert("id".to_string(), Value::String(id));
        if object.get("tipo").and_then(Value::as_str) == Some("sesion") {
            let start = timestamp(object.get("inicioSesion"));
            let end = timestamp(object.get("finSesion"));
            object.insert(
                "duracion".to_string(),
                Value::String(session_duration_label(start, end)),
            );
        }
    }
    fields
}

fn timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_row_gets_duration_label() {
        let fields = json!({
            "tipo": "sesion",
            "inicioSesion": "2024-05-01T10:00:00+00:00",
            "finSesion": "2024-05-01T11:23:45+00:00",
        });
        let row = present("r1".to_string(), fields);
        assert_eq!(row["id"], "r1");
        assert_eq!(row["duracion"], "1h 23m 45s");
    }

    #[test]
    fn test_open_session_row_is_in_progress() {
        let fields = json!({
            "tipo": "sesion",
            "inicioSesion": "2024-05-01T10:00:00+00:00",
            "finSesion": null,
        });
        let row = present("r1".to_string(), fields);
        assert_eq!(row["duracion"], "in progress");
    }

    #[test]
    fn test_activity_row_has_no_duration() {
        let fields = json!({
            "tipo": "productos",
            "descripcion": "Producto creado: Teclado",
        });
        let row = present("r2".to_string(), fields);
        assert!(row.get("duracion").is_none());
    }
}
