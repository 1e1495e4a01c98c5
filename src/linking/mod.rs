//! Account-link resolution
//!
//! - [`resolver`] - The conflict-resolution and voluntary-linking flows
//! - [`email_recovery`] - Provider user API probes for undisclosed emails

pub mod email_recovery;
pub mod resolver;

pub use email_recovery::{
    pick_address, recover_email, AuthHeaderStyle, EmailEntry, GithubUserApi, ProviderUserApi,
    UserProfile,
};
pub use resolver::{AccountLinkResolver, LinkError};
