//! Core error types for QueryForge
//!
//! Every failure of a builder, resolver, or renderer call is a programming error
//! in the query definition, so each variant carries enough context (path, call)
//! to fix the call site. Nothing here is retried.

use thiserror::Error;

/// Boxed error produced by a metadata discovery source
pub type DiscoveryError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error type for all QueryForge operations
#[derive(Error, Debug)]
pub enum QfError {
    #[error("Unknown field: segment '{segment}' of path '{path}' does not exist on {document}")]
    UnknownField {
        document: String,
        path: String,
        segment: String,
    },

    #[error("Ambiguous condition: field '{path}' is compared to itself")]
    InvalidSelfReference { path: String },

    #[error("Dangling connective: {call}() has no term to connect")]
    DanglingConnective { call: &'static str },

    #[error("Empty group: end() closed a group at depth {depth} without conditions")]
    EmptyGroup { depth: usize },

    #[error("Unbalanced group: {open} group(s) open")]
    UnbalancedGroup { open: usize },

    #[error("Filter already sealed: {call}() is not allowed after seal()")]
    AlreadySealed { call: &'static str },

    #[error("Invalid operand for {operator} on '{path}': {reason}")]
    InvalidOperand {
        path: String,
        operator: String,
        reason: String,
    },

    #[error("Unknown container alias: {alias}")]
    UnknownContainer { alias: String },

    #[error("Invalid container alias '{alias}': {reason}")]
    InvalidAlias { alias: String, reason: &'static str },

    #[error("Container alias already registered: {alias}")]
    DuplicateAlias { alias: String },

    #[error("Unknown document type: {document}")]
    UnknownDocument { document: String },

    #[error("Metadata discovery failed for {document}: {source}")]
    Discovery {
        document: String,
        #[source]
        source: DiscoveryError,
    },

    #[error("Parameter not bound: {name}")]
    UnboundParameter { name: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl QfError {
    pub fn unknown_field(
        document: impl Into<String>,
        path: impl Into<String>,
        segment: impl Into<String>,
    ) -> Self {
        QfError::UnknownField {
            document: document.into(),
            path: path.into(),
            segment: segment.into(),
        }
    }

    pub fn invalid_operand(
        path: impl Into<String>,
        operator: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        QfError::InvalidOperand {
            path: path.into(),
            operator: operator.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code for the error
    pub fn error_code(&self) -> &'static str {
        match self {
            QfError::UnknownField { .. } => "unknown_field",
            QfError::InvalidSelfReference { .. } => "invalid_self_reference",
            QfError::DanglingConnective { .. } => "dangling_connective",
            QfError::EmptyGroup { .. } => "empty_group",
            QfError::UnbalancedGroup { .. } => "unbalanced_group",
            QfError::AlreadySealed { .. } => "already_sealed",
            QfError::InvalidOperand { .. } => "invalid_operand",
            QfError::UnknownContainer { .. } => "unknown_container",
            QfError::InvalidAlias { .. } => "invalid_alias",
            QfError::DuplicateAlias { .. } => "duplicate_alias",
            QfError::UnknownDocument { .. } => "unknown_document",
            QfError::Discovery { .. } => "discovery_failed",
            QfError::UnboundParameter { .. } => "unbound_parameter",
            QfError::Config(_) => "configuration_error",
        }
    }

    /// Whether the error comes from the builder's call sequence rather than from
    /// metadata or rendering
    pub fn is_sequence_error(&self) -> bool {
        matches!(
            self,
            QfError::DanglingConnective { .. }
                | QfError::EmptyGroup { .. }
                | QfError::UnbalancedGroup { .. }
                | QfError::AlreadySealed { .. }
        )
    }
}
