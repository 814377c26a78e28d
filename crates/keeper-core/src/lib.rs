// Library root: the keeper-eligibility engine and the normalizers that feed it.
//
// Everything in this crate is synchronous and free of network or filesystem
// access; collaborators hand in already-deserialized records.

pub mod draft;
pub mod engine;
pub mod error;
pub mod history;
pub mod picks;
pub mod player;
pub mod report;
pub mod roster;
pub mod transactions;

pub use error::{ErrorKind, KeeperError};
