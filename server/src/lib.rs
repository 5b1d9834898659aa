pub mod config;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod schema;
pub mod services;
pub mod state;
pub mod utils;
