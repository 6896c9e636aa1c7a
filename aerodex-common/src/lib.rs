//! # Aerodex Common Library
//!
//! Shared code for the Aerodex catalog crates including:
//! - Error and result types
//! - Configuration loading (CLI → ENV → TOML → compiled defaults)
//! - Catalog event types and the broadcast EventBus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
