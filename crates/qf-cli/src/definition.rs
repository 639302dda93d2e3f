//! Query Definition Files
//!
//! A definition is a recorded builder call stream in YAML (or JSON):
//!
//! ```yaml
//! document: Order
//! joins:
//!   - { alias: c, document: Customer }
//! parameters:
//!   min_total: 100
//! conditions:
//!   - begin
//!   - { field: status, op: "=", value: open }
//!   - or
//!   - { field: total, op: ">=", param: min_total }
//!   - end
//!   - { connect: customer_id, to: c.id }
//! ```

use anyhow::Context;
use qf_conditions::{ComparisonOperator, ConditionBuilder, OperandSpec, Operator};
use qf_core::{QfError, QfResult, Value};
use qf_render::Parameters;
use qf_schema::FieldResolver;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct QueryDefinition {
    /// Main document type
    pub document: String,
    /// Main container alias; the configured one when absent
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub joins: Vec<JoinSpec>,
    /// Values for named parameters
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub conditions: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinSpec {
    pub alias: String,
    pub document: String,
}

/// One recorded builder call
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Call(Call),
    Connect(ConnectStep),
    Condition(ConditionStep),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Call {
    And,
    Or,
    Begin,
    End,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectStep {
    pub connect: String,
    pub to: String,
    #[serde(default = "default_operator")]
    pub op: ComparisonOperator,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionStep {
    pub field: String,
    pub op: ComparisonOperator,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub param: Option<String>,
    /// Compare against another field
    #[serde(default, rename = "ref")]
    pub field_ref: Option<String>,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(default)]
    pub or_null: bool,
}

fn default_operator() -> ComparisonOperator {
    ComparisonOperator::Equal
}

impl ConditionStep {
    fn operator(&self) -> Operator {
        let mut operator = Operator::new(self.op);
        operator.case_insensitive = self.ignore_case;
        operator.true_when_null = self.or_null;
        operator
    }

    fn operand(&self) -> QfResult<OperandSpec> {
        match (&self.value, &self.param, &self.field_ref) {
            (None, None, None) => Ok(OperandSpec::None),
            (Some(value), None, None) => Ok(OperandSpec::Value(value.clone())),
            (None, Some(name), None) => Ok(OperandSpec::parameter(name.as_str())),
            (None, None, Some(path)) => Ok(OperandSpec::field(path.as_str())),
            _ => Err(QfError::invalid_operand(
                self.field.as_str(),
                self.op,
                "give at most one of value, param, ref",
            )),
        }
    }
}

impl Step {
    fn apply(&self, builder: &mut ConditionBuilder) -> QfResult<()> {
        match self {
            Step::Call(Call::And) => builder.and()?,
            Step::Call(Call::Or) => builder.or()?,
            Step::Call(Call::Begin) => builder.begin()?,
            Step::Call(Call::End) => builder.end()?,
            Step::Connect(step) => builder.connect(&step.connect, &step.to, step.op)?,
            Step::Condition(step) => {
                builder.condition(&step.field, step.operator(), step.operand()?)?
            }
        };
        Ok(())
    }
}

impl QueryDefinition {
    pub fn from_yaml_str(body: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(body).context("invalid query definition")
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Self::from_yaml_str(&body).with_context(|| format!("in {}", path.display()))
    }

    /// Replay the definition into a fresh, unsealed builder
    pub fn replay(
        &self,
        resolver: Arc<FieldResolver>,
        default_alias: &str,
    ) -> QfResult<ConditionBuilder> {
        let alias = self.alias.as_deref().unwrap_or(default_alias);
        let mut builder = ConditionBuilder::with_alias(resolver, &self.document, alias)?;

        for join in &self.joins {
            builder.join(&join.alias, &join.document)?;
        }
        for step in &self.conditions {
            step.apply(&mut builder)?;
        }

        debug!(
            document = %self.document,
            steps = self.conditions.len(),
            tokens = builder.tokens().len(),
            "Definition replayed"
        );
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qf_conditions::ExpressionNode;
    use qf_schema::StaticSchemaSource;

    const SCHEMA: &str = r#"
documents:
  - name: Order
    container: orders
    fields:
      - { name: id, type: int }
      - { name: status, type: text }
      - { name: total, type: float, stored_as: total_amount }
      - { name: customer_id, type: int }
  - name: Customer
    container: customers
    fields:
      - { name: id, type: int }
      - { name: name, type: text }
"#;

    fn resolver() -> Arc<FieldResolver> {
        let source = StaticSchemaSource::from_yaml_str(SCHEMA).unwrap();
        Arc::new(FieldResolver::from_source(Arc::new(source)))
    }

    #[test]
    fn test_parse_steps() {
        let definition = QueryDefinition::from_yaml_str(
            r#"
document: Order
conditions:
  - begin
  - { field: status, op: "=", value: open, ignore_case: true }
  - or
  - { field: total, op: ">=", param: min }
  - end
  - { connect: customer_id, to: c.id }
  - { field: id, op: is_not_null }
"#,
        )
        .unwrap();

        assert_eq!(definition.conditions.len(), 7);
        assert!(matches!(definition.conditions[0], Step::Call(Call::Begin)));
        assert!(matches!(
            definition.conditions[5],
            Step::Connect(ref step) if step.op == ComparisonOperator::Equal
        ));
        match &definition.conditions[1] {
            Step::Condition(step) => {
                assert_eq!(step.value, Some(Value::Text("open".into())));
                assert!(step.operator().case_insensitive);
            }
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn test_replay() {
        let definition = QueryDefinition::from_yaml_str(
            r#"
document: Order
joins:
  - { alias: c, document: Customer }
parameters:
  min: 10
conditions:
  - { field: status, op: "=", value: open }
  - and
  - { field: c.name, op: like, value: "A%" }
  - or
  - { field: total, op: ">", param: min }
"#,
        )
        .unwrap();
        assert_eq!(definition.parameters.get("min"), Some(&Value::Int(10)));

        let filter = definition.replay(resolver(), "t0").unwrap().seal().unwrap();
        let root = filter.root().unwrap();
        assert!(matches!(**root, ExpressionNode::Or(ref children) if children.len() == 2));
        assert_eq!(filter.parameters(), vec!["min"]);
    }

    #[test]
    fn test_replay_reports_builder_errors() {
        let definition = QueryDefinition::from_yaml_str(
            "document: Order\nconditions:\n  - or\n",
        )
        .unwrap();
        let err = definition.replay(resolver(), "t0").unwrap_err();
        assert_eq!(err.error_code(), "dangling_connective");
    }

    #[test]
    fn test_conflicting_operands() {
        let definition = QueryDefinition::from_yaml_str(
            "document: Order\nconditions:\n  - { field: id, op: '=', value: 1, param: id }\n",
        )
        .unwrap();
        let err = definition.replay(resolver(), "t0").unwrap_err();
        assert_eq!(err.error_code(), "invalid_operand");
    }
}
