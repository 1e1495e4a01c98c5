// Authentication handlers: registration, sign-in, conflict resolution, sign-out
use crate::identity::client::{AuthError, AuthErrorCode, IdentityClient};
use crate::identity::provider::Provider;
use crate::ledger::{format_session_duration, SessionLedger};
use crate::linking::{AccountLinkResolver, LinkError};
use actix_web::{web, HttpResponse, Result};
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Register a password account and open a session for it.
///
/// # Errors
/// Never fails at the actix level; backend failures map to error responses
pub async fn register(
    body: web::Json<RegisterRequest>,
    client: web::Data<dyn IdentityClient>,
    ledger: web::Data<SessionLedger>,
) -> Result<HttpResponse> {
    match client
        .register_with_email_and_password(
            &body.email,
            &body.password,
            body.display_name.as_deref(),
        )
        .await
    {
        Ok(identity) => {
            ledger.start_session().await;
            Ok(HttpResponse::Created().json(identity))
        }
        Err(err) => Ok(auth_error_response(&err)),
    }
}

/// Email/password sign-in.
///
/// # Errors
/// Never fails at the actix level
pub async fn login(
    body: web::Json<LoginRequest>,
    client: web::Data<dyn IdentityClient>,
    ledger: web::Data<SessionLedger>,
) -> Result<HttpResponse> {
    match client
        .sign_in_with_email_and_password(&body.email, &body.password)
        .await
    {
        Ok(identity) => {
            ledger.start_session().await;
            Ok(HttpResponse::Ok().json(identity))
        }
        Err(err) => Ok(auth_error_response(&err)),
    }
}

/// Federated sign-in. A provider conflict is handed to the resolver, which
/// either merges the accounts or reports why it could not.
///
/// # Errors
/// Never fails at the actix level
pub async fn oauth_sign_in(
    path: web::Path<String>,
    client: web::Data<dyn IdentityClient>,
    resolver: web::Data<AccountLinkResolver>,
    ledger: web::Data<SessionLedger>,
) -> Result<HttpResponse> {
    let Some(provider) = Provider::from_id(&path) else {
        return Ok(unsupported_provider(&path));
    };

    match client.sign_in_interactive(provider).await {
        Ok(identity) => {
            ledger.start_session().await;
            Ok(HttpResponse::Ok().json(identity))
        }
        Err(err) if err.code == AuthErrorCode::AccountExistsWithDifferentCredential => {
            info!("sign-in with {provider} hit an existing account, resolving");
            match resolver.resolve_provider_conflict(&err, provider).await {
                Ok(identity) => {
                    ledger.start_session().await;
                    Ok(HttpResponse::Ok().json(identity))
                }
                Err(link_err) => Ok(link_error_response(&link_err)),
            }
        }
        Err(err) => Ok(auth_error_response(&err)),
    }
}

/// Voluntarily link another provider to the signed-in account.
///
/// # Errors
/// Never fails at the actix level
pub async fn link_provider(
    path: web::Path<String>,
    client: web::Data<dyn IdentityClient>,
    resolver: web::Data<AccountLinkResolver>,
) -> Result<HttpResponse> {
    let Some(provider) = Provider::from_id(&path) else {
        return Ok(unsupported_provider(&path));
    };
    let Some(identity) = client.current_user().await else {
        return Ok(HttpResponse::Unauthorized().json(json!({
            "error": "unauthorized",
            "error_description": "sign in before linking another provider",
        })));
    };

    match resolver
        .link_provider_to_current_user(&identity, provider)
        .await
    {
        Ok(linked) => Ok(HttpResponse::Ok().json(linked)),
        Err(err) => Ok(link_error_response(&err)),
    }
}

/// Deliberate sign-out: close the session row, then clear the identity.
///
/// # Errors
/// Never fails at the actix level
pub async fn sign_out(
    client: web::Data<dyn IdentityClient>,
    ledger: web::Data<SessionLedger>,
) -> Result<HttpResponse> {
    let elapsed = ledger.end_session().await;
    client.sign_out().await;

    let duration = elapsed.map(format_session_duration);
    Ok(HttpResponse::Ok().json(json!({ "duracion": duration })))
}

/// Beacon endpoint hit when the client goes away without signing out. Always
/// answers 204: the sender cannot read the response anyway.
pub async fn session_end(ledger: web::Data<SessionLedger>) -> HttpResponse {
    if ledger.end_session().await.is_none() {
        warn!("session-end beacon arrived with no open session");
    }
    HttpResponse::NoContent().finish()
}

fn unsupported_provider(name: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({
        "error": "unsupported_provider",
        "error_description": format!("unknown provider: {name}"),
    }))
}

fn auth_error_response(err: &AuthError) -> HttpResponse {
    let body = json!({
        "error": err.code.as_str(),
        "error_description": err.message,
    });
    match err.code {
        AuthErrorCode::WrongPassword
        | AuthErrorCode::UserNotFound
        | AuthErrorCode::PopupClosed => HttpResponse::Unauthorized().json(body),
        AuthErrorCode::EmailAlreadyInUse
        | AuthErrorCode::AccountExistsWithDifferentCredential => {
            HttpResponse::Conflict().json(body)
        }
        AuthErrorCode::Network => HttpResponse::BadGateway().json(body),
        _ => HttpResponse::BadRequest().json(body),
    }
}

/// Each resolution outcome keeps its own wire shape so clients can branch on
/// `error` without parsing the description.
fn link_error_response(err: &LinkError) -> HttpResponse {
    match err {
        LinkError::Provider { code, message } => HttpResponse::BadGateway().json(json!({
            "error": code,
            "error_description": message,
        })),
        LinkError::ConflictUnresolvable(guidance) => HttpResponse::Conflict().json(json!({
            "error": "conflict_unresolvable",
            "error_description": guidance,
        })),
        LinkError::ManualStepRequired(guidance) => HttpResponse::Conflict().json(json!({
            "error": "manual_step_required",
            "error_description": guidance,
        })),
        LinkError::UnsupportedMethod(method) => HttpResponse::BadRequest().json(json!({
            "error": "unsupported_method",
            "error_description": format!("existing sign-in method is not supported: {method}"),
        })),
        LinkError::AlreadyLinked => HttpResponse::Conflict().json(json!({
            "error": "already_linked",
            "error_description": "the credential is already linked to an account",
        })),
    }
}
