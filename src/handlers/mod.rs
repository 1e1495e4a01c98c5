// HTTP request handlers for the storefront admin
pub mod audit;
pub mod auth;
pub mod catalog;
pub mod health;

// Re-export the main handler functions
pub use audit::audit_history;
pub use auth::{link_provider, login, oauth_sign_in, register, session_end, sign_out};
pub use catalog::{create_entry, delete_entry, list_section, update_entry};
pub use health::health;
