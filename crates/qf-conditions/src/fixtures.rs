//! Shared test fixtures

use qf_schema::{
    DocumentSchema, FieldMeta, FieldReference, FieldResolver, ResolvedPath, StaticSchemaSource,
    ValueType,
};
use std::sync::Arc;

use crate::atom::ConditionAtom;
use crate::node::ExpressionNode;
use crate::operators::ComparisonOperator;

/// `c{n} is null` on a synthetic main-container field
pub fn atom(n: usize) -> ConditionAtom {
    let name = format!("c{}", n);
    let left = FieldReference::new(
        None,
        Arc::new(ResolvedPath {
            document: "Row".into(),
            segments: vec![name.clone()],
            physical: vec![name],
            declared_type: ValueType::Bool,
            nullable: true,
        }),
    );
    match ConditionAtom::new(left, ComparisonOperator::IsNull.into(), None) {
        Ok(atom) => atom,
        Err(e) => panic!("fixture atom: {}", e),
    }
}

pub fn leaf(n: usize) -> ExpressionNode {
    ExpressionNode::Atom(atom(n))
}

/// Index `n` of an atom built by [`atom`]
pub fn index_of(atom: &ConditionAtom) -> usize {
    atom.left().path()[0][1..].parse().unwrap_or(usize::MAX)
}

pub fn order_schemas() -> StaticSchemaSource {
    StaticSchemaSource::new()
        .with(
            DocumentSchema::new("Order", "orders")
                .with_field(FieldMeta::new("id", ValueType::Int))
                .with_field(FieldMeta::new("status", ValueType::Text))
                .with_field(FieldMeta::new("total", ValueType::Float).stored_as("total_amount"))
                .with_field(FieldMeta::new("flags", ValueType::Int))
                .with_field(FieldMeta::new("note", ValueType::Text).nullable())
                .with_field(FieldMeta::new("customer_id", ValueType::Int))
                .with_field(FieldMeta::new("customer", ValueType::Document("Customer".into()))),
        )
        .with(
            DocumentSchema::new("Customer", "customers")
                .with_field(FieldMeta::new("id", ValueType::Int))
                .with_field(FieldMeta::new("name", ValueType::Text))
                .with_field(FieldMeta::new("city", ValueType::Text).nullable()),
        )
}

pub fn resolver() -> Arc<FieldResolver> {
    Arc::new(FieldResolver::from_source(Arc::new(order_schemas())))
}
