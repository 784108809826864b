//! Condition evaluation

use std::cmp::Ordering;

use scout_core::{parse_value, Value, VariableStore};
use tracing::trace;

use crate::condition::{CompareOp, Condition, ConditionError, ConditionResult};

/// Evaluates condition text against a variable store
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Parse `text` and evaluate it, substituting variables operand by operand
    pub fn evaluate(&self, text: &str, variables: &VariableStore) -> ConditionResult<bool> {
        let condition = Condition::parse(text)?;
        let result = self.evaluate_condition(&condition, variables)?;
        trace!(condition = %text, result, "Evaluated condition");
        Ok(result)
    }

    /// Evaluate an already parsed condition
    pub fn evaluate_condition(
        &self,
        condition: &Condition,
        variables: &VariableStore,
    ) -> ConditionResult<bool> {
        match condition {
            Condition::Literal(b) => Ok(*b),
            Condition::And(left, right) => Ok(self.evaluate_condition(left, variables)?
                && self.evaluate_condition(right, variables)?),
            Condition::Or(left, right) => Ok(self.evaluate_condition(left, variables)?
                || self.evaluate_condition(right, variables)?),
            Condition::Compare { left, op, right } => compare(
                &operand(left, variables),
                *op,
                &operand(right, variables),
            ),
            Condition::Name(name) => resolve_name(name, variables),
        }
    }
}

/// Substitute one operand and parse it as a literal
fn operand(raw: &str, variables: &VariableStore) -> Value {
    parse_value(&variables.substitute(raw))
}

/// A bare word names a bound variable; a lone reference may also resolve to a
/// boolean literal
fn resolve_name(raw: &str, variables: &VariableStore) -> ConditionResult<bool> {
    let name = variables.substitute(raw);
    let name = name.trim();
    if let Some(value) = variables.get(name) {
        return Ok(value.is_truthy());
    }
    match parse_value(name) {
        Value::Bool(b) => Ok(b),
        _ => Err(ConditionError::Unparseable(name.to_string())),
    }
}

fn compare(left: &Value, op: CompareOp, right: &Value) -> ConditionResult<bool> {
    let ordering = || {
        left.loose_cmp(right)
            .ok_or_else(|| ConditionError::Incomparable {
                left: left.to_string(),
                right: right.to_string(),
            })
    };

    Ok(match op {
        CompareOp::Eq => left.loose_eq(right),
        CompareOp::Ne => !left.loose_eq(right),
        CompareOp::Gt => ordering()? == Ordering::Greater,
        CompareOp::Ge => ordering()? != Ordering::Less,
        CompareOp::Lt => ordering()? == Ordering::Less,
        CompareOp::Le => ordering()? != Ordering::Greater,
    })
}
