pub mod config;
pub mod error;
pub mod handlers;
pub mod ids;
pub mod kv;
pub mod middleware;
pub mod models;
pub mod random;
pub mod server;
pub mod session;
pub mod share;
pub mod simulator;
pub mod state;
pub mod store;
pub mod uploads;
pub mod utils;
pub mod validation;
