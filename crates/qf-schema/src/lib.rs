//! # qf-schema
//!
//! Document metadata and field reference resolution for QueryForge.
//!
//! Field metadata is declared once per document type (in code or in a schema
//! file) instead of being discovered through runtime reflection. The resolver
//! validates dotted field paths against that metadata and memoizes every
//! resolution for the lifetime of the process.
//!
//! ## Structure
//!
//! - `document` - Document and field metadata tables
//! - `registry` - Discovery front door with at-most-once population per document
//! - `resolver` - Path resolution with a shared, race-free cache
//! - `reference` - The resolved field handle consumed by conditions and renderers
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use qf_schema::{DocumentSchema, FieldMeta, FieldResolver, StaticSchemaSource, ValueType};
//!
//! let mut source = StaticSchemaSource::new();
//! source.register(
//!     DocumentSchema::new("Order", "orders")
//!         .with_field(FieldMeta::new("id", ValueType::Int))
//!         .with_field(FieldMeta::new("note", ValueType::Text).nullable()),
//! );
//!
//! let resolver = FieldResolver::from_source(Arc::new(source));
//! let note = resolver.resolve("Order", "note").unwrap();
//! assert!(note.nullable);
//! ```

pub mod document;
pub mod reference;
pub mod registry;
pub mod resolver;

pub use document::{DocumentSchema, FieldMeta, SchemaFile, ValueType};
pub use reference::FieldReference;
pub use registry::{SchemaRegistry, SchemaSource, StaticSchemaSource};
pub use resolver::{FieldResolver, ResolvedPath};
