//! Document Rendering
//!
//! Produces a filter document in the Mongo query dialect. Fields of the main
//! container are addressed by their stored dotted path; fields of a joined
//! container are prefixed with the join alias, the name under which a lookup
//! stage places the joined document.
//!
//! Case-insensitive comparisons become anchored regular expressions where the
//! query dialect takes them (`$eq`, `$ne`, `$in`, `$nin`) and `$toLower`
//! expressions everywhere else.

use qf_conditions::{
    ComparisonOperator, ConditionAtom, Connective, ContainerSet, ExpressionNode, Operand,
};
use qf_core::{QfError, QfResult, Value};
use qf_schema::FieldReference;
use serde_json::{json, Map, Value as Json};
use std::collections::HashSet;
use tracing::trace;

use crate::backend::Parameters;

#[derive(Debug, Clone, Default)]
pub struct DocumentRenderer {
    parameters: Parameters,
}

impl DocumentRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind parameter values; every parameter must be bound before rendering
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn render(&self, node: &ExpressionNode, containers: &ContainerSet) -> QfResult<Json> {
        let document = self.node(node, containers)?;
        trace!(document = %document, "Filter document rendered");
        Ok(document)
    }

    fn node(&self, node: &ExpressionNode, containers: &ContainerSet) -> QfResult<Json> {
        let key = match node.connective() {
            None => {
                return match node.as_atom() {
                    Some(atom) => self.atom(atom, containers),
                    None => Ok(json!({})),
                }
            }
            Some(Connective::And) => "$and",
            Some(Connective::Or) => "$or",
        };

        let children = node
            .children()
            .iter()
            .map(|child| self.node(child, containers))
            .collect::<QfResult<Vec<_>>>()?;

        if key == "$and" {
            if let Some(merged) = merge_conjunction(&children) {
                return Ok(merged);
            }
        }

        Ok(json!({ key: children }))
    }

    fn atom(&self, atom: &ConditionAtom, containers: &ContainerSet) -> QfResult<Json> {
        let operator = atom.operator();
        let path = field_path(atom.left(), containers)?;

        if let Some(Operand::Field(other)) = atom.right() {
            let other = field_path(other, containers)?;
            let mut operands = [json!(format!("${}", path)), json!(format!("${}", other))];
            if operator.case_insensitive {
                operands = operands.map(|operand| json!({ "$toLower": operand }));
            }
            let expression = json!({ expression_operator(atom.comparison()): operands });
            return Ok(or_null(json!({ "$expr": expression }), &path, operator.true_when_null));
        }

        let condition = match atom.comparison() {
            ComparisonOperator::IsNull => Json::Null,
            ComparisonOperator::IsNotNull => json!({ "$ne": null }),
            ComparisonOperator::Like => self.pattern(atom)?,
            ComparisonOperator::NotLike => json!({ "$not": self.pattern(atom)? }),
            _ if operator.case_insensitive => {
                let folded = self.case_folded(atom, &path)?;
                return Ok(or_null(folded, &path, operator.true_when_null));
            }
            ComparisonOperator::In => json!({ "$in": self.list(atom)? }),
            ComparisonOperator::NotIn => json!({ "$nin": self.list(atom)? }),
            ComparisonOperator::Between => self.range(atom)?,
            ComparisonOperator::NotBetween => json!({ "$not": self.range(atom)? }),
            comparison => json!({ query_operator(comparison): to_json(&self.value(atom)?) }),
        };

        Ok(or_null(json!({ path.clone(): condition }), &path, operator.true_when_null))
    }

    /// Comparison of lower-cased text; every operand must be text
    fn case_folded(&self, atom: &ConditionAtom, path: &str) -> QfResult<Json> {
        let comparison = atom.comparison();
        let field = json!({ "$toLower": format!("${}", path) });

        let condition = match comparison {
            ComparisonOperator::Equal => json!({ path: exact_match(&self.text(atom)?) }),
            ComparisonOperator::NotEqual => {
                json!({ path: { "$not": exact_match(&self.text(atom)?) } })
            }
            ComparisonOperator::In | ComparisonOperator::NotIn => {
                let key = if comparison == ComparisonOperator::In { "$in" } else { "$nin" };
                let patterns: Vec<Json> =
                    self.texts(atom)?.iter().map(|text| exact_match(text)).collect();
                json!({ path: { key: patterns } })
            }
            ComparisonOperator::Greater
            | ComparisonOperator::GreaterOrEqual
            | ComparisonOperator::Less
            | ComparisonOperator::LessOrEqual => {
                let value = lower_literal(&self.text(atom)?);
                json!({ "$expr": { expression_operator(comparison): [field, value] } })
            }
            ComparisonOperator::Between | ComparisonOperator::NotBetween => {
                let (low, high) = match self.texts(atom)?.as_slice() {
                    [low, high] => (lower_literal(low), lower_literal(high)),
                    _ => return Err(invalid(atom, "expected a [low, high] pair")),
                };
                let within = json!({ "$and": [
                    { "$gte": [field, low] },
                    { "$lte": [field, high] }
                ]});
                if comparison == ComparisonOperator::Between {
                    json!({ "$expr": within })
                } else {
                    json!({ "$expr": { "$not": [within] } })
                }
            }
            _ => return Err(invalid(atom, "operator cannot ignore case")),
        };
        Ok(condition)
    }

    /// Constant operand, or the bound value of a parameter
    fn value(&self, atom: &ConditionAtom) -> QfResult<Value> {
        match atom.right() {
            Some(Operand::Constant(value)) => Ok(value.clone()),
            Some(Operand::Parameter(name)) => self
                .parameters
                .get(name)
                .cloned()
                .ok_or_else(|| QfError::UnboundParameter { name: name.clone() }),
            _ => Err(invalid(atom, "operand is required")),
        }
    }

    fn text(&self, atom: &ConditionAtom) -> QfResult<String> {
        match self.value(atom)? {
            Value::Text(text) => Ok(text),
            other => Err(invalid(atom, format!("expected text, got {}", other.kind()))),
        }
    }

    fn texts(&self, atom: &ConditionAtom) -> QfResult<Vec<String>> {
        match self.value(atom)? {
            Value::List(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Text(text) => Ok(text),
                    other => Err(invalid(atom, format!("expected text, got {}", other.kind()))),
                })
                .collect(),
            other => Err(invalid(atom, format!("expected a list, got {}", other.kind()))),
        }
    }

    fn list(&self, atom: &ConditionAtom) -> QfResult<Vec<Json>> {
        match self.value(atom)? {
            Value::List(items) => Ok(items.iter().map(to_json).collect()),
            other => Err(invalid(atom, format!("expected a list, got {}", other.kind()))),
        }
    }

    fn range(&self, atom: &ConditionAtom) -> QfResult<Json> {
        match self.value(atom)?.as_list() {
            Some([low, high]) => Ok(json!({ "$gte": to_json(low), "$lte": to_json(high) })),
            _ => Err(invalid(atom, "expected a [low, high] pair")),
        }
    }

    fn pattern(&self, atom: &ConditionAtom) -> QfResult<Json> {
        let regex = like_to_regex(&self.text(atom)?);
        if atom.operator().case_insensitive {
            Ok(json!({ "$regex": regex, "$options": "i" }))
        } else {
            Ok(json!({ "$regex": regex }))
        }
    }
}

fn invalid(atom: &ConditionAtom, reason: impl Into<String>) -> QfError {
    QfError::invalid_operand(atom.left().to_string(), atom.comparison(), reason)
}

fn field_path(reference: &FieldReference, containers: &ContainerSet) -> QfResult<String> {
    let stored = reference.physical_path().join(".");
    match reference.container_alias() {
        Some(alias) => {
            let container = containers.get(Some(alias))?;
            Ok(format!("{}.{}", container.alias, stored))
        }
        None => Ok(stored),
    }
}

fn query_operator(comparison: ComparisonOperator) -> &'static str {
    match comparison {
        ComparisonOperator::NotEqual => "$ne",
        ComparisonOperator::Greater => "$gt",
        ComparisonOperator::GreaterOrEqual => "$gte",
        ComparisonOperator::Less => "$lt",
        ComparisonOperator::LessOrEqual => "$lte",
        ComparisonOperator::BitsAnd => "$bitsAllSet",
        ComparisonOperator::BitsOr => "$bitsAnySet",
        _ => "$eq",
    }
}

/// Aggregation operator for field-to-field comparisons
fn expression_operator(comparison: ComparisonOperator) -> &'static str {
    match comparison {
        ComparisonOperator::NotEqual => "$ne",
        ComparisonOperator::Greater => "$gt",
        ComparisonOperator::GreaterOrEqual => "$gte",
        ComparisonOperator::Less => "$lt",
        ComparisonOperator::LessOrEqual => "$lte",
        _ => "$eq",
    }
}

/// Anchored case-insensitive match of a literal string
fn exact_match(text: &str) -> Json {
    json!({ "$regex": format!("^{}$", regex::escape(text)), "$options": "i" })
}

fn lower_literal(text: &str) -> Json {
    json!({ "$toLower": { "$literal": text } })
}

fn or_null(condition: Json, path: &str, true_when_null: bool) -> Json {
    if true_when_null {
        json!({ "$or": [condition, { path: null }] })
    } else {
        condition
    }
}

/// Merge single-field conditions on distinct fields into one document
///
/// Returns `None` when any child is an operator document (`$or`, `$expr`, ...)
/// or two children constrain the same field.
fn merge_conjunction(children: &[Json]) -> Option<Json> {
    let mut merged = Map::new();
    let mut seen = HashSet::new();

    for child in children {
        let object = child.as_object()?;
        if object.len() != 1 {
            return None;
        }
        let (field, condition) = object.iter().next()?;
        if field.starts_with('$') || !seen.insert(field.as_str()) {
            return None;
        }
        merged.insert(field.clone(), condition.clone());
    }

    Some(Json::Object(merged))
}

/// Translate a `%`/`_` pattern into an anchored regular expression
fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::from("^");
    let mut literal = String::new();

    for c in pattern.chars() {
        let wildcard = match c {
            '%' => ".*",
            '_' => ".",
            _ => {
                literal.push(c);
                continue;
            }
        };
        regex.push_str(&regex::escape(&literal));
        literal.clear();
        regex.push_str(wildcard);
    }

    regex.push_str(&regex::escape(&literal));
    regex.push('$');
    regex
}

fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => json!(i),
        Value::Float(x) => serde_json::Number::from_f64(*x).map_or(Json::Null, Json::Number),
        Value::Uuid(u) => Json::String(u.to_string()),
        Value::DateTime(dt) => json!({ "$date": dt.to_rfc3339() }),
        Value::Text(s) => Json::String(s.clone()),
        Value::List(items) => Json::Array(items.iter().map(to_json).collect()),
    }
}
