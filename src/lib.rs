pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod http;
pub mod model;
pub mod rate_limit;
pub mod views;
