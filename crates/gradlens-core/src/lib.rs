//! Core domain layer for gradlens.
//!
//! Data model, sentinel-aware cell conversion, declarative sheet schemas,
//! the statistics/correlation engine, error taxonomy, and configuration.

pub mod cells;
pub mod error;
pub mod formatting;
pub mod models;
pub mod schema;
pub mod settings;
pub mod stats;
