//! Condition Atoms
//!
//! An atom is one indivisible comparison: a field, an operator, and an operand.
//! Atoms are validated when built and never change afterwards.

use qf_core::{QfError, QfResult, Value};
use qf_schema::FieldReference;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::operators::{ComparisonOperator, Operator};

/// Right-hand side of a resolved condition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// Literal value
    #[serde(rename = "value")]
    Constant(Value),
    /// Named placeholder bound at execution time
    Parameter(String),
    /// Another field (join or correlation condition)
    Field(FieldReference),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Constant(value) => write!(f, "{}", value),
            Operand::Parameter(name) => write!(f, ":{}", name),
            Operand::Field(field) => write!(f, "{}", field),
        }
    }
}

/// Right-hand side as written at the call site, before field resolution
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandSpec {
    /// No operand (`is_null`, `is_not_null`)
    #[default]
    None,
    Value(Value),
    #[serde(alias = "param")]
    Parameter(String),
    /// Field path, optionally prefixed by a container alias
    Field(String),
}

impl OperandSpec {
    pub fn value(value: impl Into<Value>) -> Self {
        OperandSpec::Value(value.into())
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        OperandSpec::Parameter(name.into())
    }

    pub fn field(path: impl Into<String>) -> Self {
        OperandSpec::Field(path.into())
    }
}

impl From<Value> for OperandSpec {
    fn from(value: Value) -> Self {
        OperandSpec::Value(value)
    }
}

/// A single comparison condition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionAtom {
    left: FieldReference,
    operator: Operator,
    #[serde(skip_serializing_if = "Option::is_none")]
    right: Option<Operand>,
}

impl ConditionAtom {
    /// Build an atom, checking the operand against the operator
    pub fn new(left: FieldReference, operator: Operator, right: Option<Operand>) -> QfResult<Self> {
        validate(&left, &operator, right.as_ref())?;
        Ok(Self {
            left,
            operator,
            right,
        })
    }

    pub fn left(&self) -> &FieldReference {
        &self.left
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn comparison(&self) -> ComparisonOperator {
        self.operator.comparison
    }

    pub fn right(&self) -> Option<&Operand> {
        self.right.as_ref()
    }

    /// Whether the atom compares two fields
    pub fn is_correlation(&self) -> bool {
        matches!(self.right, Some(Operand::Field(_)))
    }

    /// Name of the parameter the atom refers to
    pub fn parameter(&self) -> Option<&str> {
        match &self.right {
            Some(Operand::Parameter(name)) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for ConditionAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.left, self.operator)?;
        if let Some(right) = &self.right {
            write!(f, " {}", right)?;
        }
        Ok(())
    }
}

fn validate(left: &FieldReference, operator: &Operator, right: Option<&Operand>) -> QfResult<()> {
    let comparison = operator.comparison;
    let fail = |reason: &str| Err(QfError::invalid_operand(left.to_string(), comparison, reason));

    if comparison.is_bitwise() {
        if !left.declared_type().is_integral() {
            return fail("bitwise operators need an integer field");
        }
        if operator.case_insensitive {
            return fail("bitwise operators cannot ignore case");
        }
    }

    let right = match (comparison.requires_operand(), right) {
        (false, None) => return Ok(()),
        (false, Some(_)) => return fail("operator takes no operand"),
        (true, None) => return fail("operand is required"),
        (true, Some(right)) => right,
    };

    match right {
        Operand::Parameter(name) if name.is_empty() => fail("parameter name is empty"),
        Operand::Parameter(_) => Ok(()),
        Operand::Field(other) => {
            if !comparison.accepts_field_operand() {
                fail("only plain comparisons may compare two fields")
            } else if other == left {
                Err(QfError::InvalidSelfReference {
                    path: left.to_string(),
                })
            } else {
                Ok(())
            }
        }
        Operand::Constant(value) => {
            validate_constant(comparison, value).or_else(|reason| fail(reason))
        }
    }
}

fn validate_constant(comparison: ComparisonOperator, value: &Value) -> Result<(), &'static str> {
    if comparison.takes_list() {
        return match value {
            Value::List(_) => Ok(()),
            _ => Err("expected a list of values"),
        };
    }

    if comparison.takes_range() {
        return match value.as_list() {
            Some([low, high]) if !low.is_null() && !high.is_null() => Ok(()),
            _ => Err("expected a [low, high] pair"),
        };
    }

    match value {
        Value::Null => Err("null operand, use is_null / is_not_null"),
        Value::List(_) => Err("list operand is only valid for in / not in / between"),
        _ if comparison.is_pattern() => value.as_text().map(|_| ()).ok_or("pattern must be text"),
        _ if comparison.is_bitwise() => {
            value.as_int().map(|_| ()).ok_or("bit mask must be an integer")
        }
        _ => Ok(()),
    }
}
