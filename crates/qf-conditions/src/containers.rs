//! Containers
//!
//! A filter is built against one main container and any number of joined
//! containers. Field paths may be prefixed with a container alias
//! (`c.name`); unprefixed paths belong to the main container.

use qf_core::{QfError, QfResult};
use qf_schema::DocumentSchema;
use serde::Serialize;

/// A document type bound to an alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Container {
    pub alias: String,
    /// Document type name
    pub document: String,
    /// Stored name (table or collection)
    pub physical: String,
}

impl Container {
    fn new(alias: &str, schema: &DocumentSchema) -> Self {
        Self {
            alias: alias.to_string(),
            document: schema.name.clone(),
            physical: schema.container.clone(),
        }
    }
}

/// Main container plus joins, in registration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSet {
    main: Container,
    joins: Vec<Container>,
}

impl ContainerSet {
    pub fn new(main_alias: &str, schema: &DocumentSchema) -> QfResult<Self> {
        check_alias(main_alias)?;
        Ok(Self {
            main: Container::new(main_alias, schema),
            joins: Vec::new(),
        })
    }

    /// Register a joined container
    pub fn add_join(&mut self, alias: &str, schema: &DocumentSchema) -> QfResult<&Container> {
        check_alias(alias)?;
        if alias == self.main.alias || self.join(alias).is_some() {
            return Err(QfError::DuplicateAlias {
                alias: alias.to_string(),
            });
        }

        self.joins.push(Container::new(alias, schema));
        Ok(&self.joins[self.joins.len() - 1])
    }

    pub fn main(&self) -> &Container {
        &self.main
    }

    pub fn joins(&self) -> &[Container] {
        &self.joins
    }

    pub fn join(&self, alias: &str) -> Option<&Container> {
        self.joins.iter().find(|c| c.alias == alias)
    }

    /// Look up a container; `None` and the main alias both name the main one
    pub fn get(&self, alias: Option<&str>) -> QfResult<&Container> {
        match alias {
            None => Ok(&self.main),
            Some(alias) if alias == self.main.alias => Ok(&self.main),
            Some(alias) => self.join(alias).ok_or_else(|| QfError::UnknownContainer {
                alias: alias.to_string(),
            }),
        }
    }

    /// Split an alias prefix off a field path
    ///
    /// Returns the joined container the path belongs to (`None` for the main
    /// container) and the member path relative to it. A join alias takes
    /// precedence over a main-container field of the same name.
    pub fn locate<'p>(&self, path: &'p str) -> (Option<&Container>, &'p str) {
        if let Some((prefix, rest)) = path.split_once('.') {
            if let Some(join) = self.join(prefix) {
                return (Some(join), rest);
            }
            if prefix == self.main.alias {
                return (None, rest);
            }
        }
        (None, path)
    }
}

/// Aliases prefix field paths, so they cannot be empty or contain a dot
fn check_alias(alias: &str) -> QfResult<()> {
    let reason = if alias.is_empty() {
        "alias is empty"
    } else if alias.contains('.') {
        "alias contains '.'"
    } else {
        return Ok(());
    };
    Err(QfError::InvalidAlias {
        alias: alias.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qf_schema::{FieldMeta, ValueType};

    fn schema(name: &str, container: &str) -> DocumentSchema {
        DocumentSchema::new(name, container).with_field(FieldMeta::new("id", ValueType::Int))
    }

    fn containers() -> ContainerSet {
        let mut set = ContainerSet::new("t0", &schema("Order", "orders")).unwrap();
        set.add_join("c", &schema("Customer", "customers")).unwrap();
        set
    }

    #[test]
    fn test_add_join() {
        let set = containers();
        assert_eq!(set.joins().len(), 1);
        assert_eq!(set.joins()[0].physical, "customers");
        assert_eq!(set.get(Some("c")).unwrap().document, "Customer");
        assert_eq!(set.get(None).unwrap().alias, "t0");
        assert_eq!(set.get(Some("t0")).unwrap().document, "Order");
    }

    #[test]
    fn test_duplicate_alias() {
        let mut set = containers();
        let err = set.add_join("c", &schema("Invoice", "invoices")).unwrap_err();
        assert!(matches!(err, QfError::DuplicateAlias { ref alias } if alias == "c"));
        let err = set.add_join("t0", &schema("Invoice", "invoices")).unwrap_err();
        assert_eq!(err.error_code(), "duplicate_alias");
    }

    #[test]
    fn test_invalid_alias() {
        let mut set = containers();
        let err = set.add_join("a.b", &schema("Invoice", "invoices")).unwrap_err();
        assert!(matches!(err, QfError::InvalidAlias { ref alias, .. } if alias == "a.b"));
        let err = set.add_join("", &schema("Invoice", "invoices")).unwrap_err();
        assert_eq!(err.error_code(), "invalid_alias");

        let err = ContainerSet::new("o.x", &schema("Order", "orders")).unwrap_err();
        assert_eq!(err.error_code(), "invalid_alias");
        assert_eq!(set.joins().len(), 1);
    }

    #[test]
    fn test_unknown_container() {
        let err = containers().get(Some("x")).unwrap_err();
        assert!(matches!(err, QfError::UnknownContainer { ref alias } if alias == "x"));
    }

    #[test]
    fn test_locate() {
        let set = containers();
        let (join, member) = set.locate("c.id");
        assert_eq!(join.map(|c| c.alias.as_str()), Some("c"));
        assert_eq!(member, "id");

        assert_eq!(set.locate("t0.id"), (None, "id"));
        assert_eq!(set.locate("customer.name"), (None, "customer.name"));
        assert_eq!(set.locate("id"), (None, "id"));
    }
}
