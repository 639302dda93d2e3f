//! SQL Rendering
//!
//! Produces a `WHERE` clause body with positional placeholders. Values never
//! appear in the SQL text; they are returned as binds in placeholder order.

use qf_conditions::{
    ComparisonOperator, ConditionAtom, Connective, ContainerSet, ExpressionNode, Operand,
};
use qf_core::config::{PlaceholderStyle, RenderConfig};
use qf_core::{QfError, QfResult, Value};
use qf_schema::FieldReference;
use serde::Serialize;
use tracing::trace;

use crate::backend::Parameters;

/// Value for one placeholder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bind {
    Value(Value),
    /// Named parameter not bound at render time; `element` selects one end of
    /// a range parameter
    Parameter {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        element: Option<usize>,
    },
}

/// Rendered `WHERE` clause body and its binds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlPredicate {
    pub sql: String,
    pub binds: Vec<Bind>,
}

impl SqlPredicate {
    pub fn where_clause(&self) -> String {
        format!("WHERE {}", self.sql)
    }
}

#[derive(Debug, Clone)]
pub struct SqlRenderer {
    placeholder: PlaceholderStyle,
    parameters: Parameters,
}

impl SqlRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            placeholder: config.placeholder,
            parameters: Parameters::new(),
        }
    }

    /// Render bound parameters as values instead of named binds
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn render(
        &self,
        node: &ExpressionNode,
        containers: &ContainerSet,
    ) -> QfResult<SqlPredicate> {
        let mut writer = Writer {
            renderer: self,
            containers,
            binds: Vec::new(),
        };
        let sql = writer.node(node, false)?;
        trace!(sql = %sql, binds = writer.binds.len(), "SQL predicate rendered");
        Ok(SqlPredicate {
            sql,
            binds: writer.binds,
        })
    }
}

struct Writer<'a> {
    renderer: &'a SqlRenderer,
    containers: &'a ContainerSet,
    binds: Vec<Bind>,
}

impl Writer<'_> {
    fn node(&mut self, node: &ExpressionNode, nested: bool) -> QfResult<String> {
        let separator = match node.connective() {
            None => {
                return match node.as_atom() {
                    Some(atom) => self.atom(atom),
                    None => Ok(String::new()),
                }
            }
            Some(Connective::And) => " AND ",
            Some(Connective::Or) => " OR ",
        };

        let parts = node
            .children()
            .iter()
            .map(|child| self.node(child, true))
            .collect::<QfResult<Vec<_>>>()?;
        let joined = parts.join(separator);

        Ok(if nested { format!("({})", joined) } else { joined })
    }

    fn atom(&mut self, atom: &ConditionAtom) -> QfResult<String> {
        let operator = atom.operator();
        let comparison = operator.comparison;
        let column = self.column(atom.left())?;
        let lhs = lower(&column, operator.case_insensitive);

        let condition = match comparison {
            ComparisonOperator::IsNull => format!("{} IS NULL", column),
            ComparisonOperator::IsNotNull => format!("{} IS NOT NULL", column),
            ComparisonOperator::In | ComparisonOperator::NotIn => {
                self.membership(atom, &lhs, comparison == ComparisonOperator::NotIn)?
            }
            ComparisonOperator::Between | ComparisonOperator::NotBetween => {
                let (low, high) = self.range(atom)?;
                let keyword = if comparison == ComparisonOperator::Between {
                    "BETWEEN"
                } else {
                    "NOT BETWEEN"
                };
                let low = lower(&low, operator.case_insensitive);
                let high = lower(&high, operator.case_insensitive);
                format!("{} {} {} AND {}", lhs, keyword, low, high)
            }
            ComparisonOperator::BitsAnd => {
                let mask = self.operand(atom)?;
                let expected = self.operand(atom)?;
                format!("({} & {}) = {}", column, mask, expected)
            }
            ComparisonOperator::BitsOr => {
                let mask = self.operand(atom)?;
                format!("({} & {}) <> 0", column, mask)
            }
            ComparisonOperator::Like | ComparisonOperator::NotLike => {
                let keyword = if comparison == ComparisonOperator::Like {
                    "LIKE"
                } else {
                    "NOT LIKE"
                };
                let rhs = self.operand(atom)?;
                format!("{} {} {}", lhs, keyword, lower(&rhs, operator.case_insensitive))
            }
            _ => {
                let rhs = self.operand(atom)?;
                format!(
                    "{} {} {}",
                    lhs,
                    comparison.symbol(),
                    lower(&rhs, operator.case_insensitive)
                )
            }
        };

        if operator.true_when_null {
            Ok(format!("({} OR {} IS NULL)", condition, column))
        } else {
            Ok(condition)
        }
    }

    /// Qualified column; members after the first are JSON member access
    fn column(&self, reference: &FieldReference) -> QfResult<String> {
        let alias = self.containers.get(reference.container_alias())?.alias.as_str();

        let (first, rest) = reference
            .physical_path()
            .split_first()
            .ok_or_else(|| QfError::unknown_field(reference.document(), "", ""))?;

        let mut column = format!("{}.{}", alias, first);
        for (i, member) in rest.iter().enumerate() {
            let arrow = if i + 1 == rest.len() { "->>" } else { "->" };
            column.push_str(&format!("{}'{}'", arrow, escape_string(member)));
        }
        Ok(column)
    }

    /// Single operand as a placeholder or a column
    fn operand(&mut self, atom: &ConditionAtom) -> QfResult<String> {
        match required(atom)? {
            Operand::Field(reference) => self.column(reference),
            Operand::Constant(value) => Ok(self.bind(Bind::Value(value.clone()))),
            Operand::Parameter(name) => Ok(match self.renderer.parameters.get(name) {
                Some(value) => self.bind(Bind::Value(value.clone())),
                None => self.bind(Bind::Parameter {
                    name: name.clone(),
                    element: None,
                }),
            }),
        }
    }

    fn membership(&mut self, atom: &ConditionAtom, lhs: &str, negated: bool) -> QfResult<String> {
        let case_insensitive = atom.operator().case_insensitive;

        match self.value_of(required(atom)?) {
            Some(Value::List(items)) if items.is_empty() => {
                Ok(if negated { "1 = 1" } else { "1 = 0" }.to_string())
            }
            Some(Value::List(items)) => {
                let placeholders: Vec<String> = items
                    .into_iter()
                    .map(|item| lower(&self.bind(Bind::Value(item)), case_insensitive))
                    .collect();
                let keyword = if negated { "NOT IN" } else { "IN" };
                Ok(format!("{} {} ({})", lhs, keyword, placeholders.join(", ")))
            }
            Some(other) => Err(invalid(atom, format!("expected a list, got {}", other.kind()))),
            None => {
                let name = atom
                    .parameter()
                    .ok_or_else(|| invalid(atom, "expected a list"))?;
                let placeholder = self.bind(Bind::Parameter {
                    name: name.to_string(),
                    element: None,
                });
                if negated {
                    Ok(format!("NOT ({} = ANY({}))", lhs, placeholder))
                } else {
                    Ok(format!("{} = ANY({})", lhs, placeholder))
                }
            }
        }
    }

    fn range(&mut self, atom: &ConditionAtom) -> QfResult<(String, String)> {
        match self.value_of(required(atom)?) {
            Some(Value::List(items)) if items.len() == 2 => {
                let mut items = items.into_iter();
                let low = items.next().unwrap_or(Value::Null);
                let high = items.next().unwrap_or(Value::Null);
                Ok((self.bind(Bind::Value(low)), self.bind(Bind::Value(high))))
            }
            Some(_) => Err(invalid(atom, "expected a [low, high] pair")),
            None => {
                let name = atom
                    .parameter()
                    .ok_or_else(|| invalid(atom, "expected a range"))?;
                let low = self.bind(Bind::Parameter {
                    name: name.to_string(),
                    element: Some(0),
                });
                let high = self.bind(Bind::Parameter {
                    name: name.to_string(),
                    element: Some(1),
                });
                Ok((low, high))
            }
        }
    }

    /// Constant, or the bound value of a parameter
    fn value_of(&self, operand: &Operand) -> Option<Value> {
        match operand {
            Operand::Constant(value) => Some(value.clone()),
            Operand::Parameter(name) => self.renderer.parameters.get(name).cloned(),
            Operand::Field(_) => None,
        }
    }

    fn bind(&mut self, bind: Bind) -> String {
        self.binds.push(bind);
        match self.renderer.placeholder {
            PlaceholderStyle::Dollar => format!("${}", self.binds.len()),
            PlaceholderStyle::Question => "?".to_string(),
        }
    }
}

fn required(atom: &ConditionAtom) -> QfResult<&Operand> {
    atom.right()
        .ok_or_else(|| invalid(atom, "operand is required"))
}

fn invalid(atom: &ConditionAtom, reason: impl Into<String>) -> QfError {
    QfError::invalid_operand(atom.left().to_string(), atom.comparison(), reason)
}

fn lower(expression: &str, case_insensitive: bool) -> String {
    if case_insensitive {
        format!("LOWER({})", expression)
    } else {
        expression.to_string()
    }
}

/// Escape string for SQL literals
fn escape_string(s: &str) -> String {
    s.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{builder, schemas};
    use qf_conditions::{ConditionBuilder, OperandSpec, Operator};
    use qf_schema::FieldResolver;
    use std::sync::Arc;

    fn render(b: &mut ConditionBuilder) -> SqlPredicate {
        render_with(b, &RenderConfig::default())
    }

    fn render_with(b: &mut ConditionBuilder, config: &RenderConfig) -> SqlPredicate {
        let filter = b.seal().unwrap();
        SqlRenderer::new(config)
            .render(filter.root().unwrap(), filter.containers())
            .unwrap()
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("city"), "city");
        assert_eq!(escape_string("o'brien"), "o''brien");
    }

    #[test]
    fn test_groups_are_parenthesized() {
        let mut b = builder();
        b.begin().unwrap();
        b.equal("id", 1).unwrap();
        b.or().unwrap();
        b.equal("status", "held").unwrap();
        b.end().unwrap();
        b.greater("total", 5).unwrap();
        let predicate = render(&mut b);
        assert_eq!(predicate.sql, "(t0.id = $1 OR t0.status = $2) AND t0.total_amount > $3");
        assert_eq!(
            predicate.binds,
            vec![
                Bind::Value(Value::Int(1)),
                Bind::Value(Value::Text("held".into())),
                Bind::Value(Value::Int(5)),
            ]
        );
        assert_eq!(predicate.where_clause(), format!("WHERE {}", predicate.sql));
    }

    #[test]
    fn test_and_inside_or() {
        let mut b = builder();
        b.equal("id", 1).unwrap();
        b.equal("status", "open").unwrap();
        b.or().unwrap();
        b.is_null("note").unwrap();
        assert_eq!(render(&mut b).sql, "(t0.id = $1 AND t0.status = $2) OR t0.note IS NULL");
    }

    #[test]
    fn test_field_comparison() {
        let mut b = builder();
        b.connect("customer_id", "c.id", ComparisonOperator::Equal)
            .unwrap();
        let predicate = render(&mut b);
        assert_eq!(predicate.sql, "t0.customer_id = c.id");
        assert!(predicate.binds.is_empty());
    }

    #[test]
    fn test_flags() {
        let mut b = builder();
        let operator = Operator::new(ComparisonOperator::Equal).ignore_case().or_null();
        b.condition("c.name", operator, OperandSpec::value("ada"))
            .unwrap();
        assert_eq!(render(&mut b).sql, "(LOWER(c.name) = LOWER($1) OR c.name IS NULL)");
    }

    #[test]
    fn test_member_path() {
        let mut b = builder();
        b.like("shipping.city", "Os%").unwrap();
        assert_eq!(render(&mut b).sql, "t0.shipping->>'city_name' LIKE $1");
    }

    #[test]
    fn test_lists() {
        let mut b = builder();
        b.in_list("id", [1, 2]).unwrap();
        assert_eq!(render(&mut b).sql, "t0.id IN ($1, $2)");

        let mut b = builder();
        b.in_list("id", Vec::<i64>::new()).unwrap();
        let predicate = render(&mut b);
        assert_eq!(predicate.sql, "1 = 0");
        assert!(predicate.binds.is_empty());

        let mut b = builder();
        b.parameter("id", ComparisonOperator::NotIn, "ids").unwrap();
        let predicate = render(&mut b);
        assert_eq!(predicate.sql, "NOT (t0.id = ANY($1))");
        assert_eq!(
            predicate.binds,
            vec![Bind::Parameter {
                name: "ids".into(),
                element: None
            }]
        );
    }

    #[test]
    fn test_ranges_and_question_placeholders() {
        let config = RenderConfig {
            placeholder: PlaceholderStyle::Question,
            ..RenderConfig::default()
        };

        let mut b = builder();
        b.between("total", 1, 10).unwrap();
        b.parameter("id", ComparisonOperator::NotBetween, "window")
            .unwrap();
        let predicate = render_with(&mut b, &config);
        assert_eq!(predicate.sql, "t0.total_amount BETWEEN ? AND ? AND t0.id NOT BETWEEN ? AND ?");
        assert_eq!(
            predicate.binds[3],
            Bind::Parameter {
                name: "window".into(),
                element: Some(1)
            }
        );
    }

    #[test]
    fn test_bits() {
        let mut b = builder();
        b.condition("flags", ComparisonOperator::BitsAnd, OperandSpec::value(6))
            .unwrap();
        b.condition("flags", ComparisonOperator::BitsOr, OperandSpec::value(1))
            .unwrap();
        let predicate = render(&mut b);
        assert_eq!(predicate.sql, "(t0.flags & $1) = $2 AND (t0.flags & $3) <> 0");
        assert_eq!(predicate.binds[0], predicate.binds[1]);
    }

    #[test]
    fn test_bound_parameters() {
        let mut b = builder();
        b.parameter("total", ComparisonOperator::GreaterOrEqual, "min")
            .unwrap();
        b.parameter("id", ComparisonOperator::In, "ids").unwrap();
        let filter = b.seal().unwrap();

        let parameters = Parameters::from([
            ("min".to_string(), Value::Float(9.5)),
            ("ids".to_string(), Value::List(vec![Value::Int(3), Value::Int(4)])),
        ]);
        let renderer = SqlRenderer::new(&RenderConfig::default()).with_parameters(parameters);
        let predicate = renderer
            .render(filter.root().unwrap(), filter.containers())
            .unwrap();
        assert_eq!(predicate.sql, "t0.total_amount >= $1 AND t0.id IN ($2, $3)");
        assert_eq!(predicate.binds[0], Bind::Value(Value::Float(9.5)));
    }

    #[test]
    fn test_builder_main_alias_qualifies_columns() {
        let resolver = Arc::new(FieldResolver::from_source(Arc::new(schemas())));
        let mut b = ConditionBuilder::with_alias(resolver, "Order", "o").unwrap();
        b.join("c", "Customer").unwrap();
        b.equal("o.status", "open").unwrap();
        b.connect("customer_id", "c.id", ComparisonOperator::Equal)
            .unwrap();

        let predicate = render(&mut b);
        assert_eq!(predicate.sql, "o.status = $1 AND o.customer_id = c.id");
    }
}
