//! Identity backend contract and local implementation
//!
//! - [`provider`] - Capability-polymorphic provider abstraction
//! - [`client`] - The external identity backend contract and its errors
//! - [`directory`] - In-memory backend implementing the contract

pub mod client;
pub mod directory;
pub mod provider;

pub use client::{AuthError, AuthErrorCode, IdentityClient, PendingCredential};
pub use directory::{FederatedProfile, LocalDirectory};
pub use provider::{Provider, SignInMethod};
