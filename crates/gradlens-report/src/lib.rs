//! Report emission layer for gradlens.
//!
//! Renders analysis results as Markdown. This crate sits outside the core
//! pipeline: results flow in, documents flow out.

pub mod markdown;
