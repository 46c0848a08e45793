//! # tgbridge Common Library
//!
//! Shared code for the tgbridge services:
//! - Error types
//! - Configuration file loading and resolution
//! - UUID-named file helpers

pub mod config;
pub mod error;
pub mod uuid_utils;

pub use error::{Error, Result};
