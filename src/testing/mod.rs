//! Test support: mocks and fixtures
//!
//! Compiled only for tests and behind the `testing` feature so integration
//! tests can share the same scripted backends the unit tests use.

pub mod fixtures;
pub mod mock;

pub use fixtures::{conflict_error, federated_identity, password_identity, wired_ledger};
pub use mock::{FailingCollectionStore, MockIdentityClient, MockUserApi};
