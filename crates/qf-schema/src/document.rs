//! Document Metadata
//!
//! A document type is described by an ordered table of fields, each with a
//! physical (stored) name, a value type, and a nullability flag.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a document field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Text,
    DateTime,
    Uuid,
    Bytes,
    /// Embedded or referenced document of the named type
    Document(String),
    /// Array of values
    List(Box<ValueType>),
}

impl ValueType {
    /// Document type whose members a path may step into through this field
    pub fn member_document(&self) -> Option<&str> {
        match self {
            ValueType::Document(name) => Some(name),
            ValueType::List(inner) => inner.member_document(),
            _ => None,
        }
    }

    /// Whether bitwise operators make sense on this type
    pub fn is_integral(&self) -> bool {
        matches!(self, ValueType::Int)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => write!(f, "bool"),
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::Text => write!(f, "text"),
            ValueType::DateTime => write!(f, "datetime"),
            ValueType::Uuid => write!(f, "uuid"),
            ValueType::Bytes => write!(f, "bytes"),
            ValueType::Document(name) => write!(f, "{}", name),
            ValueType::List(inner) => write!(f, "list<{}>", inner),
        }
    }
}

/// A field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    /// Member name used in field paths
    pub name: String,
    /// Stored name (column or element); defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_as: Option<String>,
    /// Declared value type, written as `int` or `{ document: Address }`
    #[serde(rename = "type", with = "serde_yaml::with::singleton_map_recursive")]
    pub value_type: ValueType,
    /// Whether the stored value may be null or missing
    #[serde(default)]
    pub nullable: bool,
}

impl FieldMeta {
    /// Create a non-nullable field stored under its own name
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            stored_as: None,
            value_type,
            nullable: false,
        }
    }

    /// Mark the field nullable
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Set the stored name
    pub fn stored_as(mut self, physical: impl Into<String>) -> Self {
        self.stored_as = Some(physical.into());
        self
    }

    /// Name of the field in the store
    pub fn physical_name(&self) -> &str {
        self.stored_as.as_deref().unwrap_or(&self.name)
    }
}

/// Metadata table of one document type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSchema {
    /// Document type name
    pub name: String,
    /// Physical container (table or collection)
    pub container: String,
    /// Fields in declaration order
    #[serde(default)]
    pub fields: Vec<FieldMeta>,
}

impl DocumentSchema {
    pub fn new(name: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            container: container.into(),
            fields: vec![],
        }
    }

    /// Add a field (builder pattern)
    pub fn with_field(mut self, field: FieldMeta) -> Self {
        self.fields.push(field);
        self
    }

    /// Look up a field by member name
    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// On-disk form of a set of document schemas
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaFile {
    #[serde(default)]
    pub documents: Vec<DocumentSchema>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> DocumentSchema {
        let addresses = ValueType::List(Box::new(ValueType::Document("Address".into())));
        DocumentSchema::new("Customer", "customers")
            .with_field(FieldMeta::new("id", ValueType::Int))
            .with_field(FieldMeta::new("name", ValueType::Text).stored_as("full_name"))
            .with_field(FieldMeta::new("addresses", addresses).nullable())
    }

    #[test]
    fn test_field_lookup() {
        let schema = customer();
        assert!(schema.has_field("id"));
        assert!(!schema.has_field("email"));
        assert_eq!(schema.field("name").unwrap().physical_name(), "full_name");
        assert_eq!(schema.field("id").unwrap().physical_name(), "id");
        assert_eq!(schema.field_names().collect::<Vec<_>>(), vec!["id", "name", "addresses"]);
    }

    #[test]
    fn test_member_document() {
        assert_eq!(ValueType::Document("Address".into()).member_document(), Some("Address"));
        assert_eq!(
            ValueType::List(Box::new(ValueType::Document("Address".into()))).member_document(),
            Some("Address")
        );
        assert_eq!(ValueType::Text.member_document(), None);
        assert_eq!(ValueType::List(Box::new(ValueType::Int)).member_document(), None);
    }

    #[test]
    fn test_schema_file_yaml() {
        let yaml = r#"
documents:
  - name: Customer
    container: customers
    fields:
      - { name: id, type: int }
      - { name: name, type: text, stored_as: full_name }
      - { name: address, type: { document: Address }, nullable: true }
      - { name: tags, type: { list: text } }
"#;
        let file: SchemaFile = serde_yaml::from_str(yaml).unwrap();
        let schema = &file.documents[0];
        assert_eq!(schema.container, "customers");
        assert_eq!(schema.field("name").unwrap().physical_name(), "full_name");
        assert_eq!(
            schema.field("address").unwrap().value_type,
            ValueType::Document("Address".into())
        );
        assert!(schema.field("address").unwrap().nullable);
        assert_eq!(
            schema.field("tags").unwrap().value_type,
            ValueType::List(Box::new(ValueType::Text))
        );
    }

    #[test]
    fn test_value_type_display() {
        assert_eq!(ValueType::List(Box::new(ValueType::Int)).to_string(), "list<int>");
        assert_eq!(ValueType::Document("Address".into()).to_string(), "Address");
    }
}
