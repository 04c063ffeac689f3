//! # hirehub-core
//!
//! Core crate for HireHub. Contains the configuration schemas and the
//! unified error system shared by the host and the plugin framework.
//!
//! This crate has **no** internal dependencies on other HireHub crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
