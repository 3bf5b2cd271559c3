pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod store;
