//! # qf-conditions
//!
//! Condition building for QueryForge.
//!
//! Conditions are added one call at a time to a [`ConditionBuilder`]. Each call
//! appends one token; connectives and groups are resolved into a minimal
//! expression tree where `AND` binds tighter than `OR`.
//!
//! ## Structure
//!
//! - `operators` - Comparison operators, flags, and connectives
//! - `atom` - Validated single comparisons and their operands
//! - `containers` - Main and joined document containers, addressed by alias
//! - `token` - The recorded call stream
//! - `node` - Expression trees and the sealed `Filter`
//! - `normalize` - Per-scope precedence normalization
//! - `builder` - The fluent builder state machine
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use qf_conditions::{ConditionBuilder, ExpressionNode};
//! use qf_schema::{DocumentSchema, FieldMeta, FieldResolver, StaticSchemaSource, ValueType};
//!
//! let source = StaticSchemaSource::new().with(
//!     DocumentSchema::new("Order", "orders")
//!         .with_field(FieldMeta::new("status", ValueType::Text))
//!         .with_field(FieldMeta::new("total", ValueType::Float)),
//! );
//! let resolver = Arc::new(FieldResolver::from_source(Arc::new(source)));
//!
//! let mut builder = ConditionBuilder::new(resolver, "Order").unwrap();
//! builder
//!     .equal("status", "open").unwrap()
//!     .or().unwrap()
//!     .greater("total", 100.0).unwrap();
//!
//! let filter = builder.seal().unwrap();
//! assert!(matches!(filter.root().map(|n| &**n), Some(ExpressionNode::Or(_))));
//! ```

pub mod atom;
pub mod builder;
pub mod containers;
pub mod node;
pub mod normalize;
pub mod operators;
pub mod token;

#[cfg(test)]
pub(crate) mod fixtures;

pub use atom::{ConditionAtom, Operand, OperandSpec};
pub use builder::{BuilderState, ConditionBuilder, DEFAULT_MAIN_ALIAS};
pub use containers::{Container, ContainerSet};
pub use node::{ExpressionNode, Filter};
pub use normalize::{normalize_scope, normalize_tokens, ScopeTerm};
pub use operators::{ComparisonOperator, Connective, Operator};
pub use token::Token;
