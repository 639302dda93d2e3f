//! Shared test fixtures

use qf_conditions::ConditionBuilder;
use qf_schema::{DocumentSchema, FieldMeta, FieldResolver, StaticSchemaSource, ValueType};
use std::sync::Arc;

pub fn schemas() -> StaticSchemaSource {
    StaticSchemaSource::new()
        .with(
            DocumentSchema::new("Order", "orders")
                .with_field(FieldMeta::new("id", ValueType::Int))
                .with_field(FieldMeta::new("status", ValueType::Text))
                .with_field(FieldMeta::new("total", ValueType::Float).stored_as("total_amount"))
                .with_field(FieldMeta::new("flags", ValueType::Int))
                .with_field(FieldMeta::new("note", ValueType::Text).nullable())
                .with_field(FieldMeta::new("customer_id", ValueType::Int))
                .with_field(
                    FieldMeta::new("shipping", ValueType::Document("Address".into())).nullable(),
                ),
        )
        .with(
            DocumentSchema::new("Customer", "customers")
                .with_field(FieldMeta::new("id", ValueType::Int))
                .with_field(FieldMeta::new("name", ValueType::Text)),
        )
        .with(
            DocumentSchema::new("Address", "addresses")
                .with_field(FieldMeta::new("city", ValueType::Text).stored_as("city_name")),
        )
}

/// Builder over `Order` (alias `t0`) with `Customer` joined as `c`
pub fn builder() -> ConditionBuilder {
    let resolver = Arc::new(FieldResolver::from_source(Arc::new(schemas())));
    let mut builder = match ConditionBuilder::new(resolver, "Order") {
        Ok(builder) => builder,
        Err(e) => panic!("fixture builder: {}", e),
    };
    if let Err(e) = builder.join("c", "Customer") {
        panic!("fixture join: {}", e);
    }
    builder
}
