pub mod admin;
pub mod error;
pub mod gate;
pub mod hiding;
pub mod hooks;
pub mod memory;
pub mod nonce;
pub mod page;
pub mod query;
pub mod redirection;
pub mod settings;
pub mod store;
pub mod time;
pub mod uninstall;

// Shared with the api crate's integration tests, so not cfg(test).
pub mod test_utils;
