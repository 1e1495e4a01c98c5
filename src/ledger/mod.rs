//! Session Ledger
//!
//! - [`manager`] - The injected ledger service (session lifecycle + activity rows)
//! - [`local`] - Local persistent storage for the open-session marker
//! - [`duration`] - Elapsed-session duration reporting

pub mod duration;
pub mod local;
pub mod manager;

pub use duration::{format_session_duration, session_duration_label, IN_PROGRESS};
pub use local::{
    FileLocalStore, LocalStore, MemoryLocalStore, SESSION_ID_KEY, SESSION_START_KEY,
    SESSION_USER_KEY,
};
pub use manager::{SessionLedger, SessionMarker};
