//! ApkHub API Library
//!
//! This crate provides the HTTP API handlers, middleware, and application
//! setup for the APK hosting service, including the domain-lock download
//! verification protocol.

// Module declarations
mod api_doc;
mod handlers;
pub mod setup;
mod telemetry;

// Public modules
pub mod auth;
pub mod domain_lock;
pub mod error;
pub mod state;

// Re-exports
pub use error::ErrorResponse;
