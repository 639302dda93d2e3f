//! Field Path Resolution
//!
//! Resolves dotted member paths (`customer.address.city`) against document
//! metadata. Every `(document, path)` pair is resolved once per process and
//! shared afterwards; concurrent first callers for the same pair block on a
//! single resolution.

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use qf_core::{QfError, QfResult};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{instrument, trace};

use crate::document::ValueType;
use crate::reference::FieldReference;
use crate::registry::{SchemaRegistry, SchemaSource};

/// A validated member path of one document type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPath {
    /// Document type the path starts from
    pub document: String,
    /// Member names, one per segment
    pub segments: Vec<String>,
    /// Stored names, one per segment
    pub physical: Vec<String>,
    /// Declared type of the last segment
    pub declared_type: ValueType,
    /// Whether any segment along the path may be null
    pub nullable: bool,
}

impl ResolvedPath {
    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

type PathKey = (String, String);

/// Resolver with a process-lifetime cache, shared between builders
pub struct FieldResolver {
    registry: Arc<SchemaRegistry>,
    paths: DashMap<PathKey, Arc<OnceCell<Arc<ResolvedPath>>>>,
}

impl FieldResolver {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            paths: DashMap::new(),
        }
    }

    /// Create a resolver with its own registry over `source`
    pub fn from_source(source: Arc<dyn SchemaSource>) -> Self {
        Self::new(Arc::new(SchemaRegistry::new(source)))
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Resolve `path` against `document`
    #[instrument(level = "trace", skip(self))]
    pub fn resolve(&self, document: &str, path: &str) -> QfResult<Arc<ResolvedPath>> {
        let key = (document.to_string(), path.to_string());

        if let Some(resolved) = self
            .paths
            .get(&key)
            .and_then(|cell| cell.value().get().cloned())
        {
            return Ok(resolved);
        }

        let cell = Arc::clone(self.paths.entry(key.clone()).or_default().value());
        match cell.get_or_try_init(|| self.walk(document, path).map(Arc::new)) {
            Ok(resolved) => Ok(Arc::clone(resolved)),
            Err(e) => {
                // Unresolvable paths are not kept
                self.paths
                    .remove_if(&key, |_, entry| Arc::ptr_eq(entry, &cell) && entry.get().is_none());
                Err(e)
            }
        }
    }

    /// Resolve a path into a reference qualified by `container_alias`
    ///
    /// With `allow_self_join` false, a result equal to `defining` (the field on
    /// the other side of the condition being built) is rejected.
    pub fn resolve_reference(
        &self,
        container_alias: Option<&str>,
        document: &str,
        path: &str,
        allow_self_join: bool,
        defining: Option<&FieldReference>,
    ) -> QfResult<FieldReference> {
        let reference = FieldReference::new(container_alias, self.resolve(document, path)?);

        if !allow_self_join && defining == Some(&reference) {
            return Err(QfError::InvalidSelfReference {
                path: reference.to_string(),
            });
        }

        Ok(reference)
    }

    /// Number of distinct paths resolved so far
    pub fn cached_paths(&self) -> usize {
        self.paths
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .count()
    }

    fn walk(&self, document: &str, path: &str) -> QfResult<ResolvedPath> {
        trace!(document, path, "Resolving field path");

        let mut schema = self.registry.document(document)?;
        let names: Vec<&str> = path.split('.').collect();

        let mut segments = Vec::with_capacity(names.len());
        let mut physical = Vec::with_capacity(names.len());
        let mut nullable = false;
        let mut declared_type = None;

        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(QfError::unknown_field(&schema.name, path, *name));
            }

            let field = schema
                .field(name)
                .ok_or_else(|| QfError::unknown_field(&schema.name, path, *name))?;

            segments.push(field.name.clone());
            physical.push(field.physical_name().to_string());
            nullable |= field.nullable;

            if let Some(next) = names.get(i + 1) {
                let member_document = field.value_type.member_document().ok_or_else(|| {
                    QfError::unknown_field(field.value_type.to_string(), path, *next)
                })?;
                schema = self.registry.document(member_document)?;
            } else {
                declared_type = Some(field.value_type.clone());
            }
        }

        let declared_type =
            declared_type.ok_or_else(|| QfError::unknown_field(document, path, ""))?;

        Ok(ResolvedPath {
            document: document.to_string(),
            segments,
            physical,
            declared_type,
            nullable,
        })
    }
}

impl fmt::Debug for FieldResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldResolver")
            .field("registry", &self.registry)
            .field("cached_paths", &self.cached_paths())
            .finish()
    }
}
