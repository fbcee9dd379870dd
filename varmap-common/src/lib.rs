//! # varmap common library
//!
//! Shared code for the varmap crates:
//! - Error type and result alias
//! - TOML bootstrap configuration loading
//! - Configuration file resolution (CLI → ENV → user config dir → defaults)

pub mod config;
pub mod error;

pub use error::{Error, Result};
