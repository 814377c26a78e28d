// Library root: re-exports all modules so integration tests and the binary
// share one public API.

pub mod config;
pub mod export;
pub mod pipeline;
pub mod sleeper;
pub mod store;
