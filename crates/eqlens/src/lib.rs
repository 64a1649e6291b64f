pub mod api;
pub mod config;
pub mod filter;
pub mod server;
