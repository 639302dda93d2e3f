//! Backend Dispatch
//!
//! The backend is chosen once when a query is set up; after that every filter
//! is rendered through the same `Renderer` value.

use qf_conditions::Filter;
use qf_core::config::{BackendKind, RenderConfig};
use qf_core::{QfResult, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::document::DocumentRenderer;
use crate::sql::{SqlPredicate, SqlRenderer};

/// Values for named parameters, keyed by parameter name
pub type Parameters = BTreeMap<String, Value>;

/// A rendered predicate in the backend's own form
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NativePredicate {
    Sql(SqlPredicate),
    Document(serde_json::Value),
}

impl NativePredicate {
    pub fn as_sql(&self) -> Option<&SqlPredicate> {
        match self {
            NativePredicate::Sql(predicate) => Some(predicate),
            NativePredicate::Document(_) => None,
        }
    }

    pub fn as_document(&self) -> Option<&serde_json::Value> {
        match self {
            NativePredicate::Document(document) => Some(document),
            NativePredicate::Sql(_) => None,
        }
    }
}

impl fmt::Display for NativePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativePredicate::Sql(predicate) => write!(f, "{}", predicate.sql),
            NativePredicate::Document(document) => write!(f, "{}", document),
        }
    }
}

/// Renderer for one backend
#[derive(Debug, Clone)]
pub enum Renderer {
    Sql(SqlRenderer),
    Document(DocumentRenderer),
}

impl Renderer {
    pub fn for_backend(backend: BackendKind, config: &RenderConfig) -> Self {
        match backend {
            BackendKind::Sql => Renderer::Sql(SqlRenderer::new(config)),
            BackendKind::Document => Renderer::Document(DocumentRenderer::new()),
        }
    }

    /// Renderer for the backend named in `config`
    pub fn from_config(config: &RenderConfig) -> Self {
        Self::for_backend(config.backend, config)
    }

    /// Bind parameter values
    pub fn with_parameters(self, parameters: Parameters) -> Self {
        match self {
            Renderer::Sql(renderer) => Renderer::Sql(renderer.with_parameters(parameters)),
            Renderer::Document(renderer) => {
                Renderer::Document(renderer.with_parameters(parameters))
            }
        }
    }

    pub fn backend(&self) -> BackendKind {
        match self {
            Renderer::Sql(_) => BackendKind::Sql,
            Renderer::Document(_) => BackendKind::Document,
        }
    }

    /// Render a sealed filter; a filter without conditions renders to `None`
    pub fn render(&self, filter: &Filter) -> QfResult<Option<NativePredicate>> {
        let Some(root) = filter.root() else {
            debug!(backend = ?self.backend(), "Filter has no conditions");
            return Ok(None);
        };

        debug!(
            backend = ?self.backend(),
            atoms = root.atoms().len(),
            depth = root.depth(),
            "Rendering filter"
        );

        let predicate = match self {
            Renderer::Sql(renderer) => {
                NativePredicate::Sql(renderer.render(root, filter.containers())?)
            }
            Renderer::Document(renderer) => {
                NativePredicate::Document(renderer.render(root, filter.containers())?)
            }
        };
        Ok(Some(predicate))
    }
}
