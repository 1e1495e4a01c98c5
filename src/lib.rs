#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the tendero application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod catalog;
pub mod handlers;
pub mod identity;
pub mod ledger;
pub mod linking;
pub mod models;
pub mod settings;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use catalog::CatalogService;
pub use identity::{IdentityClient, LocalDirectory, Provider};
pub use ledger::SessionLedger;
pub use linking::{AccountLinkResolver, LinkError};
pub use models::Identity;
pub use settings::TenderoSettings;
