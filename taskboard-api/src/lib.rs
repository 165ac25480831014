//! # Taskboard API Server Library
//!
//! HTTP layer of the taskboard: routing, configuration, error mapping and
//! the JSON views returned to clients.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration from the environment
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers
//! - `routes`: API route handlers
//! - `views`: Nested response objects

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod views;
