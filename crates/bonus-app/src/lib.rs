// Library root: re-exports all modules so integration tests and the binary
// share one implementation of the webhook service.

pub mod app;
pub mod config;
pub mod line;
pub mod protocol;
pub mod server;
