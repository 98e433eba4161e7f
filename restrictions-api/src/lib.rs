pub mod admin;
pub mod api;
pub mod config;
pub mod context;
pub mod router;
pub mod server;
pub mod site;
