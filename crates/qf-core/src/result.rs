//! Result type alias

use crate::error::QfError;

/// Standard Result type for QueryForge operations
pub type QfResult<T> = Result<T, QfError>;
