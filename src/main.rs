#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::sync::Arc;
use tendero::{
    handlers::{
        audit_history, create_entry, delete_entry, health, link_provider, list_section, login,
        oauth_sign_in, register, session_end, sign_out, update_entry,
    },
    identity::IdentityClient,
    ledger::FileLocalStore,
    linking::{GithubUserApi, ProviderUserApi},
    store::MemoryStore,
    AccountLinkResolver, CatalogService, LocalDirectory, SessionLedger, TenderoSettings,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = TenderoSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    start_server(settings).await
}

/// Start the server with an in-process directory and document store
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(settings: TenderoSettings) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings);

    let directory = Arc::new(LocalDirectory::new());
    let client: Arc<dyn IdentityClient> = directory.clone();
    let user_api: Arc<dyn ProviderUserApi> = match settings.recovery.source.as_str() {
        "github" => Arc::new(
            GithubUserApi::new(&settings.recovery.github_api_base)
                .map_err(|e| std::io::Error::other(format!("Invalid GitHub API base: {e}")))?,
        ),
        _ => directory,
    };
    let resolver = Arc::new(AccountLinkResolver::new(client.clone(), user_api));

    let store = Arc::new(MemoryStore::new());
    let local = Arc::new(FileLocalStore::open(&settings.storage.session_marker_path));
    let ledger = Arc::new(SessionLedger::new(
        store.clone(),
        local,
        client.clone(),
        &settings.audit.collection,
    ));

    // Adopt a session an earlier run left open before serving traffic
    if let Some(marker) = ledger.recover_session().await {
        println!("✓ Adopted open session {} for {}", marker.record_id, marker.user);
    }

    let catalog = Arc::new(CatalogService::new(store, ledger.clone()));

    // Configure CORS for SPAs
    let cors_origins = settings.get_cors_origins();

    HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec!["Authorization", "Content-Type", "Accept"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(web::Data::from(client.clone()))
            .app_data(web::Data::from(resolver.clone()))
            .app_data(web::Data::from(ledger.clone()))
            .app_data(web::Data::from(catalog.clone()))
            .app_data(web::Data::new(settings.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg
        // Authentication endpoints
        .route("/auth/register", web::post().to(register))
        .route("/auth/login", web::post().to(login))
        .route("/auth/oauth/{provider}", web::post().to(oauth_sign_in))
        .route("/auth/link/{provider}", web::post().to(link_provider))
        .route("/auth/sign_out", web::post().to(sign_out))
        .route("/auth/session_end", web::post().to(session_end))
        // Catalog endpoints
        .route("/catalog/{section}", web::get().to(list_section))
        .route("/catalog/{section}", web::post().to(create_entry))
        .route("/catalog/{section}/{id}", web::put().to(update_entry))
        .route("/catalog/{section}/{id}", web::delete().to(delete_entry))
        // Audit endpoint
        .route("/audit", web::get().to(audit_history))
        // Health endpoint
        .route("/ping", web::get().to(health));
}

fn print_startup_info(bind_address: &str, settings: &TenderoSettings) {
    println!("Starting Tendero storefront admin on http://{bind_address}");
    println!();
    println!("Authentication endpoints:");
    println!("  POST /auth/register          - Create a password account");
    println!("  POST /auth/login             - Email/password sign-in");
    println!("  POST /auth/oauth/{{provider}}  - Federated sign-in (resolves conflicts)");
    println!("  POST /auth/link/{{provider}}   - Link another provider to the account");
    println!("  POST /auth/sign_out          - Close the session");
    println!("  POST /auth/session_end       - Session-end beacon");
    println!();
    println!("Catalog endpoints:");
    println!("  GET|POST /catalog/{{section}}       - List/create (productos, proveedores)");
    println!("  PUT|DELETE /catalog/{{section}}/{{id}} - Update/delete an entry");
    println!();
    println!("System endpoints:");
    println!("  GET  /audit - Audit history (collection: {})", settings.audit.collection);
    println!("  GET  /ping  - Health check");
    println!();
    println!(
        "Session marker file: {}",
        settings.storage.session_marker_path
    );
}
