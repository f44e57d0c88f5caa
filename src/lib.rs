pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extract;
pub mod listing;
pub mod models;
pub mod rate_limit;
pub mod ratings;
pub mod response;
pub mod routes;
pub mod schema;
pub mod state;
pub mod store;
pub mod utils;
