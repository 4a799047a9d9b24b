//! pesantren_api Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod handlers;
pub mod store;

pub mod error;

pub use config::Config;
pub use error::{AppError, AppResult, ErrorResponse};
