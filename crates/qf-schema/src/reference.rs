//! Field References
//!
//! A field reference is a resolved path qualified by the container it belongs
//! to. References to the main container carry no alias.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::document::ValueType;
use crate::resolver::ResolvedPath;

#[derive(Debug, Clone)]
pub struct FieldReference {
    container_alias: Option<String>,
    resolved: Arc<ResolvedPath>,
}

impl FieldReference {
    pub fn new(container_alias: Option<&str>, resolved: Arc<ResolvedPath>) -> Self {
        Self {
            container_alias: container_alias.map(str::to_string),
            resolved,
        }
    }

    /// Alias of the joined container, `None` for the main container
    pub fn container_alias(&self) -> Option<&str> {
        self.container_alias.as_deref()
    }

    /// Member names along the path
    pub fn path(&self) -> &[String] {
        &self.resolved.segments
    }

    /// Stored names along the path
    pub fn physical_path(&self) -> &[String] {
        &self.resolved.physical
    }

    pub fn declared_type(&self) -> &ValueType {
        &self.resolved.declared_type
    }

    pub fn is_nullable(&self) -> bool {
        self.resolved.nullable
    }

    /// Document type the path was resolved against
    pub fn document(&self) -> &str {
        &self.resolved.document
    }

    pub fn resolved(&self) -> &Arc<ResolvedPath> {
        &self.resolved
    }
}

impl PartialEq for FieldReference {
    fn eq(&self, other: &Self) -> bool {
        self.container_alias == other.container_alias
            && self.resolved.segments == other.resolved.segments
    }
}

impl Eq for FieldReference {}

impl Hash for FieldReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.container_alias.hash(state);
        self.resolved.segments.hash(state);
    }
}

impl fmt::Display for FieldReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.container_alias {
            Some(alias) => write!(f, "{}.{}", alias, self.resolved),
            None => write!(f, "{}", self.resolved),
        }
    }
}

impl Serialize for FieldReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FieldReference", 4)?;
        state.serialize_field("container", &self.container_alias)?;
        state.serialize_field("path", &self.resolved.segments)?;
        state.serialize_field("type", &self.resolved.declared_type)?;
        state.serialize_field("nullable", &self.resolved.nullable)?;
        state.end()
    }
}
