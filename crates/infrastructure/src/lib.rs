//! Shelfscan Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer, plus configuration loading
//! and reading upload candidates from disk.

pub mod adapters;
pub mod config;
pub mod files;
pub mod http;

pub use adapters::ReqwestTransport;
pub use config::{ClientConfig, ConfigError};
pub use files::{UploadError, load_image, load_images};
pub use http::build_form;
