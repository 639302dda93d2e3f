//! # qf-core
//!
//! Core types, errors, and configuration for QueryForge.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - The condition-building error taxonomy (`QfError`)
//! - Result type alias (`QfResult`)
//! - Opaque operand values carried from call site to renderer
//! - Configuration types

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::*;
pub use result::*;
pub use types::*;
