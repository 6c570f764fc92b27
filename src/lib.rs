pub mod auth;
pub mod config;
pub mod fetch;
pub mod gemini;
pub mod models;
pub mod sanitize;
pub mod server;
