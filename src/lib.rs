pub mod app;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod search;
