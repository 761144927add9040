pub mod auth;
pub mod chain;
pub mod config;
pub mod geo;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;
