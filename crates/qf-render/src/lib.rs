//! # qf-render
//!
//! Turns a sealed [`Filter`](qf_conditions::Filter) into the native predicate
//! of a storage backend.
//!
//! ## Structure
//!
//! - `backend` - Backend selection and the `Renderer` dispatch enum
//! - `sql` - `WHERE` clause text with positional binds
//! - `document` - Mongo-style filter documents

pub mod backend;
pub mod document;
pub mod sql;

pub use backend::{NativePredicate, Parameters, Renderer};
pub use document::DocumentRenderer;
pub use sql::{Bind, SqlPredicate, SqlRenderer};

#[cfg(test)]
pub(crate) mod fixtures;
