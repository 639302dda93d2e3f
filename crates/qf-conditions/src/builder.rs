//! Condition Builder
//!
//! Fluent, call-by-call construction of a filter. Each call appends one token;
//! groups are normalized as soon as they close and the top level is normalized
//! by `seal()`.
//!
//! ```text
//! Empty --condition/and/or/begin/end--> Building --seal--> Sealed
//! ```
//!
//! Every mutating call on a sealed builder fails with `AlreadySealed`.

use qf_core::{QfError, QfResult, Value};
use qf_schema::{FieldReference, FieldResolver};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::atom::{ConditionAtom, Operand, OperandSpec};
use crate::containers::ContainerSet;
use crate::node::Filter;
use crate::normalize::ScopeStack;
use crate::operators::{ComparisonOperator, Connective, Operator};
use crate::token::{display_stream, Token};

/// Alias of the main container when none is given
pub const DEFAULT_MAIN_ALIAS: &str = "t0";

/// Builder lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuilderState {
    /// No token appended yet
    Empty,
    Building,
    Sealed,
}

/// Builds one filter over a main document type and its joins
#[derive(Debug)]
pub struct ConditionBuilder {
    resolver: Arc<FieldResolver>,
    containers: ContainerSet,
    stack: ScopeStack,
    state: BuilderState,
}

impl ConditionBuilder {
    /// Create a builder over `document` with the default main alias
    pub fn new(resolver: Arc<FieldResolver>, document: &str) -> QfResult<Self> {
        Self::with_alias(resolver, document, DEFAULT_MAIN_ALIAS)
    }

    /// Create a builder over `document`, addressing it as `main_alias`
    pub fn with_alias(
        resolver: Arc<FieldResolver>,
        document: &str,
        main_alias: &str,
    ) -> QfResult<Self> {
        let schema = resolver.registry().document(document)?;
        Ok(Self {
            containers: ContainerSet::new(main_alias, &schema)?,
            resolver,
            stack: ScopeStack::new(),
            state: BuilderState::Empty,
        })
    }

    /// Register a joined document type under `alias`
    pub fn join(&mut self, alias: &str, document: &str) -> QfResult<&mut Self> {
        self.ensure_open("join")?;
        let schema = self.resolver.registry().document(document)?;
        self.containers.add_join(alias, &schema)?;
        debug!(alias, document, "Container joined");
        Ok(self)
    }

    /// Add a condition on `path`
    pub fn condition(
        &mut self,
        path: &str,
        operator: impl Into<Operator>,
        operand: OperandSpec,
    ) -> QfResult<&mut Self> {
        self.add("condition", path, operator.into(), operand)
    }

    /// Add a condition comparing two fields
    ///
    /// The right-hand path may not resolve to the left-hand field itself.
    pub fn connect(
        &mut self,
        path: &str,
        ref_path: &str,
        operator: impl Into<Operator>,
    ) -> QfResult<&mut Self> {
        self.add("connect", path, operator.into(), OperandSpec::field(ref_path))
    }

    pub fn equal(&mut self, path: &str, value: impl Into<Value>) -> QfResult<&mut Self> {
        self.condition(path, ComparisonOperator::Equal, OperandSpec::value(value))
    }

    pub fn not_equal(&mut self, path: &str, value: impl Into<Value>) -> QfResult<&mut Self> {
        self.condition(path, ComparisonOperator::NotEqual, OperandSpec::value(value))
    }

    pub fn greater(&mut self, path: &str, value: impl Into<Value>) -> QfResult<&mut Self> {
        self.condition(path, ComparisonOperator::Greater, OperandSpec::value(value))
    }

    pub fn greater_or_equal(&mut self, path: &str, value: impl Into<Value>) -> QfResult<&mut Self> {
        self.condition(path, ComparisonOperator::GreaterOrEqual, OperandSpec::value(value))
    }

    pub fn less(&mut self, path: &str, value: impl Into<Value>) -> QfResult<&mut Self> {
        self.condition(path, ComparisonOperator::Less, OperandSpec::value(value))
    }

    pub fn less_or_equal(&mut self, path: &str, value: impl Into<Value>) -> QfResult<&mut Self> {
        self.condition(path, ComparisonOperator::LessOrEqual, OperandSpec::value(value))
    }

    /// Pattern match with `%` and `_` wildcards
    pub fn like(&mut self, path: &str, pattern: impl Into<String>) -> QfResult<&mut Self> {
        self.condition(path, ComparisonOperator::Like, OperandSpec::value(pattern.into()))
    }

    pub fn in_list<V: Into<Value>>(
        &mut self,
        path: &str,
        values: impl IntoIterator<Item = V>,
    ) -> QfResult<&mut Self> {
        let values = Value::List(values.into_iter().map(Into::into).collect());
        self.condition(path, ComparisonOperator::In, OperandSpec::Value(values))
    }

    /// Inclusive range
    pub fn between(
        &mut self,
        path: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> QfResult<&mut Self> {
        let range = Value::List(vec![low.into(), high.into()]);
        self.condition(path, ComparisonOperator::Between, OperandSpec::Value(range))
    }

    pub fn is_null(&mut self, path: &str) -> QfResult<&mut Self> {
        self.condition(path, ComparisonOperator::IsNull, OperandSpec::None)
    }

    pub fn is_not_null(&mut self, path: &str) -> QfResult<&mut Self> {
        self.condition(path, ComparisonOperator::IsNotNull, OperandSpec::None)
    }

    /// Compare `path` with a named parameter bound at execution time
    pub fn parameter(
        &mut self,
        path: &str,
        operator: impl Into<Operator>,
        name: &str,
    ) -> QfResult<&mut Self> {
        self.condition(path, operator, OperandSpec::parameter(name))
    }

    /// Join the next term with `AND`
    pub fn and(&mut self) -> QfResult<&mut Self> {
        self.connective(Connective::And)
    }

    /// Join the next term with `OR`
    pub fn or(&mut self) -> QfResult<&mut Self> {
        self.connective(Connective::Or)
    }

    /// Open a group
    pub fn begin(&mut self) -> QfResult<&mut Self> {
        self.ensure_open("begin")?;
        self.stack.open();
        self.state = BuilderState::Building;
        Ok(self)
    }

    /// Close the innermost group
    pub fn end(&mut self) -> QfResult<&mut Self> {
        self.ensure_open("end")?;
        self.stack.close()?;
        self.state = BuilderState::Building;
        Ok(self)
    }

    /// Normalize the top level and produce the filter
    ///
    /// A builder with no conditions seals into a filter without a root.
    pub fn seal(&mut self) -> QfResult<Filter> {
        self.ensure_open("seal")?;
        let root = self.stack.finish()?;
        self.state = BuilderState::Sealed;

        debug!(
            main = %self.containers.main().document,
            joins = self.containers.joins().len(),
            atoms = root.as_ref().map_or(0, |node| node.atoms().len()),
            depth = root.as_ref().map_or(0, |node| node.depth()),
            "Filter sealed"
        );
        trace!(stream = %display_stream(self.tokens()), "Sealed token stream");

        Ok(Filter::new(Arc::new(self.containers.clone()), root.map(Arc::new)))
    }

    /// Tokens appended so far, implicit `AND`s included
    pub fn tokens(&self) -> &[Token] {
        self.stack.tokens()
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    pub fn containers(&self) -> &ContainerSet {
        &self.containers
    }

    /// Number of groups currently open
    pub fn open_groups(&self) -> usize {
        self.stack.depth()
    }

    fn connective(&mut self, connective: Connective) -> QfResult<&mut Self> {
        self.ensure_open(connective.call_name())?;
        self.stack.connect(connective)?;
        self.state = BuilderState::Building;
        Ok(self)
    }

    fn add(
        &mut self,
        call: &'static str,
        path: &str,
        operator: Operator,
        operand: OperandSpec,
    ) -> QfResult<&mut Self> {
        self.ensure_open(call)?;

        let left = self.resolve(path, true, None)?;
        let right = match operand {
            OperandSpec::None => None,
            OperandSpec::Value(value) => Some(Operand::Constant(value)),
            OperandSpec::Parameter(name) => Some(Operand::Parameter(name)),
            OperandSpec::Field(ref_path) => {
                Some(Operand::Field(self.resolve(&ref_path, false, Some(&left))?))
            }
        };

        let atom = ConditionAtom::new(left, operator, right)?;
        self.stack.push_atom(atom);
        self.state = BuilderState::Building;
        Ok(self)
    }

    fn resolve(
        &self,
        path: &str,
        allow_self_join: bool,
        defining: Option<&FieldReference>,
    ) -> QfResult<FieldReference> {
        match self.containers.locate(path) {
            (Some(join), member) => self.resolver.resolve_reference(
                Some(&join.alias),
                &join.document,
                member,
                allow_self_join,
                defining,
            ),
            (None, member) => self.resolver.resolve_reference(
                None,
                &self.containers.main().document,
                member,
                allow_self_join,
                defining,
            ),
        }
    }

    fn ensure_open(&self, call: &'static str) -> QfResult<()> {
        if self.state == BuilderState::Sealed {
            return Err(QfError::AlreadySealed { call });
        }
        Ok(())
    }
}
