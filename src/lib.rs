pub mod config;
pub mod db;
pub mod duration;
pub mod error;
pub mod models;
pub mod money;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
