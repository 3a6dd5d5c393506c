//! Guestbook message ledger domain module.
//!
//! Accepts short text messages, validates them, keeps them in append order and
//! serves bounded "most recent" windows. Pure domain logic: no IO, no clocks,
//! no storage. Caller identity and time are always passed in.

pub mod error;
pub mod ledger;
pub mod message;

pub use error::PostError;
pub use ledger::{LedgerCreated, LedgerEvent, MessageLedger, MessagePosted, PostMessage};
pub use message::{MAX_LENGTH, Message, validate_text};
