//! # NCOS Common Library
//!
//! Shared code for NCOS services:
//! - Error type and result alias
//! - Service configuration resolution (CLI → ENV → TOML → defaults)
//! - SQLite initialization and schema
//! - Timestamp and identifier helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
