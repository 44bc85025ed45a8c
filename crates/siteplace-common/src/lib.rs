//! Siteplace Common - Shared types and utilities
//!
//! This crate provides identifiers, the byte-capacity model, error
//! definitions and configuration used across all Siteplace components.

pub mod config;
pub mod error;
pub mod types;

pub use config::SelectorConfig;
pub use error::{Error, Result};
pub use types::*;
