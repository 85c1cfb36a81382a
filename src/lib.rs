pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod schedule;
pub mod services;
pub mod state;
pub mod store;
