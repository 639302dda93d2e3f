//! Condition Operators
//!
//! Comparison operators that can be applied between a field and its operand,
//! plus the connectives joining two conditions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    /// Equals (=)
    #[serde(alias = "=")]
    Equal,
    /// Not equals (!=)
    #[serde(alias = "!=")]
    NotEqual,
    /// Greater than (>)
    #[serde(alias = ">")]
    Greater,
    /// Greater than or equal (>=)
    #[serde(alias = ">=")]
    GreaterOrEqual,
    /// Less than (<)
    #[serde(alias = "<")]
    Less,
    /// Less than or equal (<=)
    #[serde(alias = "<=")]
    LessOrEqual,
    /// Pattern match with `%` and `_` wildcards
    Like,
    NotLike,
    /// Member of a list
    In,
    NotIn,
    /// Inclusive range
    Between,
    NotBetween,
    IsNull,
    IsNotNull,
    /// All bits of the operand set (&)
    #[serde(alias = "&")]
    BitsAnd,
    /// Any bit of the operand set (|)
    #[serde(alias = "|")]
    BitsOr,
}

impl ComparisonOperator {
    /// Operators that may compare a field with another field
    pub fn accepts_field_operand(&self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::Greater
                | Self::GreaterOrEqual
                | Self::Less
                | Self::LessOrEqual
        )
    }

    /// Check if this operator takes an operand at all
    pub fn requires_operand(&self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }

    /// Operators whose operand is a list of values
    pub fn takes_list(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    /// Operators whose operand is a `[low, high]` pair
    pub fn takes_range(&self) -> bool {
        matches!(self, Self::Between | Self::NotBetween)
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, Self::Like | Self::NotLike)
    }

    pub fn is_bitwise(&self) -> bool {
        matches!(self, Self::BitsAnd | Self::BitsOr)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Like => "like",
            Self::NotLike => "not like",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Between => "between",
            Self::NotBetween => "not between",
            Self::IsNull => "is null",
            Self::IsNotNull => "is not null",
            Self::BitsAnd => "&",
            Self::BitsOr => "|",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for ComparisonOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', " ");
        match normalized.as_str() {
            "=" | "==" | "equal" => Ok(Self::Equal),
            "!=" | "<>" | "not equal" => Ok(Self::NotEqual),
            ">" | "greater" => Ok(Self::Greater),
            ">=" | "greater or equal" => Ok(Self::GreaterOrEqual),
            "<" | "less" => Ok(Self::Less),
            "<=" | "less or equal" => Ok(Self::LessOrEqual),
            "like" => Ok(Self::Like),
            "not like" => Ok(Self::NotLike),
            "in" => Ok(Self::In),
            "not in" => Ok(Self::NotIn),
            "between" => Ok(Self::Between),
            "not between" => Ok(Self::NotBetween),
            "is null" => Ok(Self::IsNull),
            "is not null" => Ok(Self::IsNotNull),
            "&" | "bits and" => Ok(Self::BitsAnd),
            "|" | "bits or" => Ok(Self::BitsOr),
            _ => Err(format!("unknown comparison operator '{}'", s)),
        }
    }
}

/// A comparison operator together with its orthogonal flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operator {
    pub comparison: ComparisonOperator,
    /// The condition also holds when the field is null
    #[serde(default)]
    pub true_when_null: bool,
    /// Text comparison ignores case
    #[serde(default)]
    pub case_insensitive: bool,
}

impl Operator {
    pub fn new(comparison: ComparisonOperator) -> Self {
        Self {
            comparison,
            true_when_null: false,
            case_insensitive: false,
        }
    }

    /// Also match rows where the field is null
    pub fn or_null(mut self) -> Self {
        self.true_when_null = true;
        self
    }

    /// Compare text case-insensitively
    pub fn ignore_case(mut self) -> Self {
        self.case_insensitive = true;
        self
    }
}

impl From<ComparisonOperator> for Operator {
    fn from(comparison: ComparisonOperator) -> Self {
        Self::new(comparison)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.comparison)?;
        if self.case_insensitive {
            write!(f, " (ci)")?;
        }
        if self.true_when_null {
            write!(f, " (or null)")?;
        }
        Ok(())
    }
}

/// Boolean operator joining two adjacent terms of a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn call_name(&self) -> &'static str {
        match self {
            Connective::And => "and",
            Connective::Or => "or",
        }
    }
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connective::And => write!(f, "AND"),
            Connective::Or => write!(f, "OR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parsing() {
        assert_eq!("=".parse::<ComparisonOperator>(), Ok(ComparisonOperator::Equal));
        assert_eq!("<>".parse::<ComparisonOperator>(), Ok(ComparisonOperator::NotEqual));
        assert_eq!("NOT LIKE".parse::<ComparisonOperator>(), Ok(ComparisonOperator::NotLike));
        assert_eq!("is_not_null".parse::<ComparisonOperator>(), Ok(ComparisonOperator::IsNotNull));
        assert_eq!("&".parse::<ComparisonOperator>(), Ok(ComparisonOperator::BitsAnd));
        assert!("~".parse::<ComparisonOperator>().is_err());
    }

    #[test]
    fn test_symbol_round_trip() {
        let all = [
            ComparisonOperator::Equal,
            ComparisonOperator::NotEqual,
            ComparisonOperator::Greater,
            ComparisonOperator::GreaterOrEqual,
            ComparisonOperator::Less,
            ComparisonOperator::LessOrEqual,
            ComparisonOperator::Like,
            ComparisonOperator::NotLike,
            ComparisonOperator::In,
            ComparisonOperator::NotIn,
            ComparisonOperator::Between,
            ComparisonOperator::NotBetween,
            ComparisonOperator::IsNull,
            ComparisonOperator::IsNotNull,
            ComparisonOperator::BitsAnd,
            ComparisonOperator::BitsOr,
        ];
        for op in all {
            assert_eq!(op.symbol().parse::<ComparisonOperator>(), Ok(op));
        }
    }

    #[test]
    fn test_operand_requirements() {
        assert!(ComparisonOperator::Equal.accepts_field_operand());
        assert!(!ComparisonOperator::Like.accepts_field_operand());
        assert!(!ComparisonOperator::In.accepts_field_operand());
        assert!(!ComparisonOperator::IsNull.requires_operand());
        assert!(ComparisonOperator::Between.takes_range());
        assert!(ComparisonOperator::NotIn.takes_list());
    }

    #[test]
    fn test_operator_flags() {
        let op = Operator::from(ComparisonOperator::Equal).or_null().ignore_case();
        assert!(op.true_when_null);
        assert!(op.case_insensitive);
        assert_eq!(op.to_string(), "= (ci) (or null)");
    }

    #[test]
    fn test_deserialize_symbol_alias() {
        let op: ComparisonOperator = serde_json::from_str(r#"">=""#).unwrap();
        assert_eq!(op, ComparisonOperator::GreaterOrEqual);
        let op: ComparisonOperator = serde_json::from_str(r#""not_between""#).unwrap();
        assert_eq!(op, ComparisonOperator::NotBetween);
    }
}
