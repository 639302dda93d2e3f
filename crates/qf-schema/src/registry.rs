//! Schema Registry
//!
//! The registry is the shared front door to metadata discovery. Each document
//! type is discovered at most once per process: concurrent first callers for the
//! same document wait on a single initializer instead of running discovery again.

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use qf_core::{QfError, QfResult};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::document::{DocumentSchema, SchemaFile};

/// Source of document metadata
///
/// Returns `Ok(None)` when the document type is not known to the source.
#[cfg_attr(test, mockall::automock)]
pub trait SchemaSource: Send + Sync {
    fn discover(&self, document: &str) -> QfResult<Option<DocumentSchema>>;
}

/// Schema source backed by tables registered up front
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaSource {
    documents: HashMap<String, DocumentSchema>,
}

impl StaticSchemaSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document schema, replacing any previous one with the same name
    pub fn register(&mut self, schema: DocumentSchema) -> &mut Self {
        self.documents.insert(schema.name.clone(), schema);
        self
    }

    /// Register a document schema (builder pattern)
    pub fn with(mut self, schema: DocumentSchema) -> Self {
        self.register(schema);
        self
    }

    /// Build a source from a YAML (or JSON) schema file body
    pub fn from_yaml_str(body: &str) -> QfResult<Self> {
        let file: SchemaFile = serde_yaml::from_str(body)
            .map_err(|e| QfError::Config(format!("invalid schema file: {}", e)))?;
        let mut source = Self::new();
        for schema in file.documents {
            source.register(schema);
        }
        Ok(source)
    }

    /// Load a source from a schema file on disk
    pub fn from_path(path: &Path) -> QfResult<Self> {
        let body = std::fs::read_to_string(path)
            .map_err(|e| QfError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let source = Self::from_yaml_str(&body)?;
        info!(path = %path.display(), documents = source.len(), "Schema file loaded");
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl SchemaSource for StaticSchemaSource {
    fn discover(&self, document: &str) -> QfResult<Option<DocumentSchema>> {
        Ok(self.documents.get(document).cloned())
    }
}

/// Process-lifetime cache of discovered document schemas
pub struct SchemaRegistry {
    source: Arc<dyn SchemaSource>,
    documents: DashMap<String, Arc<OnceCell<Arc<DocumentSchema>>>>,
}

impl SchemaRegistry {
    pub fn new(source: Arc<dyn SchemaSource>) -> Self {
        Self {
            source,
            documents: DashMap::new(),
        }
    }

    /// Get the schema of a document type, discovering it on first use
    ///
    /// A failed discovery is not memoized. The failing caller gets the error;
    /// a caller blocked on the same cell then runs discovery itself, and so
    /// does any later call.
    pub fn document(&self, name: &str) -> QfResult<Arc<DocumentSchema>> {
        if let Some(schema) = self
            .documents
            .get(name)
            .and_then(|cell| cell.value().get().cloned())
        {
            return Ok(schema);
        }

        // The shard guard is released before discovery runs.
        let cell = Arc::clone(self.documents.entry(name.to_string()).or_default().value());

        let result = cell.get_or_try_init(|| {
            debug!(document = name, "Discovering document metadata");
            let schema = self
                .source
                .discover(name)
                .map_err(|e| match e {
                    QfError::Discovery { .. } | QfError::UnknownDocument { .. } => e,
                    other => QfError::Discovery {
                        document: name.to_string(),
                        source: Box::new(other),
                    },
                })?
                .ok_or_else(|| QfError::UnknownDocument {
                    document: name.to_string(),
                })?;
            Ok(Arc::new(schema))
        });

        match result {
            Ok(schema) => Ok(Arc::clone(schema)),
            Err(e) => {
                self.documents
                    .remove_if(name, |_, entry| Arc::ptr_eq(entry, &cell) && entry.get().is_none());
                Err(e)
            }
        }
    }

    /// Discover a list of documents eagerly
    pub fn preload<S: AsRef<str>>(&self, names: &[S]) -> QfResult<()> {
        for name in names {
            self.document(name.as_ref())?;
        }
        Ok(())
    }

    /// Number of document types discovered so far
    pub fn discovered(&self) -> usize {
        self.documents
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .count()
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("discovered", &self.discovered())
            .finish()
    }
}
