//! Data actions handled by the engine: variable writes, string, list and math
//! operations, and log messages
//!
//! These apply in simulation too, since later conditions depend on them.

use scout_core::{parse_value, Value, ValueError};
use tracing::{debug, error, info, warn};

use crate::action::{
    IncrementVariableParams, ListOperation, ListOperationParams, LogLevel, LogParams,
    MathOperation, MathOperationParams, SetVariableParams, StringOperation,
    StringOperationParams, ValueType,
};
use crate::context::ExecutionContext;
use crate::error::{SequenceError, SequenceResult};
use crate::executor::SequenceExecutor;

impl SequenceExecutor {
    pub(crate) fn set_variable(
        &self,
        params: &SetVariableParams,
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        let name = params.variable_name.trim();
        let value = coerce(&params.value, params.value_type, ctx)?;

        ctx.log(format!(
            "Set variable '{}' = {} ({})",
            name,
            value,
            value.kind()
        ));
        ctx.variables.set(name, value);
        Ok(())
    }

    pub(crate) fn increment_variable(
        &self,
        params: &IncrementVariableParams,
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        let name = params.variable_name.trim();
        let current = match ctx.variables.get(name) {
            None => Value::Int(0),
            // Numeric text (e.g. recognized digits) counts as a number
            Some(Value::String(text)) => parse_value(text),
            Some(value) => value.clone(),
        };

        let next = current.add_number(params.increment_by)?;
        ctx.log(format!("Incremented '{}': {} -> {}", name, current, next));
        ctx.variables.set(name, next);
        Ok(())
    }

    pub(crate) fn log_message(
        &self,
        params: &LogParams,
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        let message = ctx.substitute(&params.message);
        let run_id = ctx.run_id();
        match params.level {
            LogLevel::Debug => debug!(%run_id, "{}", message),
            LogLevel::Info => info!(%run_id, "{}", message),
            LogLevel::Warning => warn!(%run_id, "{}", message),
            LogLevel::Error => error!(%run_id, "{}", message),
        }

        let label = match params.level {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        };
        ctx.log(format!("[{}] {}", label, message));
        Ok(())
    }
}

impl SequenceExecutor {
    pub(crate) fn string_operation(
        &self,
        params: &StringOperationParams,
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        let inputs = params
            .input_variables
            .iter()
            .map(|name| {
                let name = name.trim();
                ctx.variables
                    .get(name)
                    .map(Value::to_string)
                    .ok_or_else(|| SequenceError::UnknownVariable(name.to_string()))
            })
            .collect::<SequenceResult<Vec<String>>>()?;

        let first = || {
            inputs.first().map(String::as_str).ok_or_else(|| {
                SequenceError::Invalid("string operation requires an input".to_string())
            })
        };
        let result = match params.operation {
            StringOperation::Concat => Value::String(inputs.concat()),
            StringOperation::Substring => {
                Value::String(substring(first()?, params.start, params.end))
            }
            StringOperation::Replace => {
                Value::String(first()?.replace(params.old.as_str(), &params.new))
            }
            StringOperation::Length => Value::Int(first()?.chars().count() as i64),
            StringOperation::Split => Value::List(
                first()?
                    .split(params.delimiter.as_str())
                    .map(Value::from)
                    .collect(),
            ),
            StringOperation::Trim => Value::String(first()?.trim().to_string()),
        };

        store_result(params.output_variable.as_deref(), result, ctx);
        Ok(())
    }

    pub(crate) fn list_operation(
        &self,
        params: &ListOperationParams,
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        let name = params.list_variable.trim();
        if params.operation == ListOperation::Create {
            ctx.variables.set(name, Value::List(Vec::new()));
            ctx.log(format!("Created empty list '{}'", name));
            return Ok(());
        }

        let mut items = match ctx.variables.get(name) {
            None => return Err(SequenceError::UnknownVariable(name.to_string())),
            Some(value) => value
                .as_list()
                .map(<[Value]>::to_vec)
                .ok_or_else(|| ValueError::NotList(name.to_string()))?,
        };

        match params.operation {
            ListOperation::Create => {}
            ListOperation::Append => {
                let item = coerce(&params.value, ValueType::Auto, ctx)?;
                ctx.log(format!("Appended {} to list '{}'", item, name));
                items.push(item);
                ctx.variables.set(name, Value::List(items));
            }
            ListOperation::Get => {
                let item = usize::try_from(params.index)
                    .ok()
                    .and_then(|index| items.get(index))
                    .cloned()
                    .ok_or_else(|| {
                        SequenceError::Failed(format!(
                            "Index {} out of range for list '{}'",
                            params.index, name
                        ))
                    })?;
                store_result(params.output_variable.as_deref(), item, ctx);
            }
            ListOperation::Length => {
                let length = Value::Int(items.len() as i64);
                store_result(params.output_variable.as_deref(), length, ctx);
            }
            ListOperation::Clear => {
                ctx.variables.set(name, Value::List(Vec::new()));
                ctx.log(format!("Cleared list '{}'", name));
            }
        }
        Ok(())
    }

    pub(crate) fn math_operation(
        &self,
        params: &MathOperationParams,
        ctx: &mut ExecutionContext,
    ) -> SequenceResult<()> {
        let operands = params
            .operands
            .iter()
            .map(|operand| coerce(operand, ValueType::Number, ctx))
            .collect::<SequenceResult<Vec<Value>>>()?;

        let result = calculate(params.operation, &operands)?;
        store_result(params.output_variable.as_deref(), result, ctx);
        Ok(())
    }
}

/// Bind an operation's result, or only log it when no output variable is named
fn store_result(output: Option<&str>, result: Value, ctx: &mut ExecutionContext) {
    match output.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => {
            ctx.log(format!("Stored result '{}' in variable '{}'", result, name));
            ctx.variables.set(name, result);
        }
        None => ctx.log(format!("Result: {}", result)),
    }
}

/// Characters `start..end`, with negative bounds counted from the end and
/// out-of-range bounds clamped
fn substring(text: &str, start: i64, end: Option<i64>) -> String {
    let len = text.chars().count() as i64;
    let clamp = |index: i64| {
        let index = if index < 0 { len + index } else { index };
        index.clamp(0, len) as usize
    };
    let start = clamp(start);
    let end = end.map_or(len as usize, clamp);
    if start >= end {
        return String::new();
    }
    text.chars().skip(start).take(end - start).collect()
}

/// Largest magnitude at which every integer is exactly representable as f64
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Apply a math operation to numeric operands
///
/// Integer operands give an integer result except for division and
/// fractional powers; rounding to whole units always gives an integer.
fn calculate(operation: MathOperation, operands: &[Value]) -> SequenceResult<Value> {
    if !operation.arity().contains(&operands.len()) {
        return Err(SequenceError::Invalid(format!(
            "math {:?} does not take {} operand(s)",
            operation,
            operands.len()
        )));
    }

    let numbers: Vec<f64> = operands
        .iter()
        .map(|operand| {
            operand
                .as_f64()
                .ok_or_else(|| ValueError::NotNumeric(operand.to_string()))
        })
        .collect::<Result<_, _>>()?;
    let all_int = operands.iter().all(|operand| matches!(operand, Value::Int(_)));
    let (first, rest) = (numbers[0], &numbers[1..]);

    let (result, integral) = match operation {
        MathOperation::Add => (numbers.iter().sum(), all_int),
        MathOperation::Subtract => (rest.iter().fold(first, |acc, n| acc - n), all_int),
        MathOperation::Multiply => (numbers.iter().product(), all_int),
        MathOperation::Divide => {
            if rest.contains(&0.0) {
                return Err(SequenceError::Failed("Division by zero".to_string()));
            }
            (rest.iter().fold(first, |acc, n| acc / n), false)
        }
        MathOperation::Modulo => {
            let divisor = rest[0];
            if divisor == 0.0 {
                return Err(SequenceError::Failed("Modulo by zero".to_string()));
            }
            // Result takes the divisor's sign
            let remainder = first % divisor;
            let remainder = if remainder != 0.0 && (remainder < 0.0) != (divisor < 0.0) {
                remainder + divisor
            } else {
                remainder
            };
            (remainder, all_int)
        }
        MathOperation::Power => (first.powf(rest[0]), all_int && rest[0] >= 0.0),
        MathOperation::Abs => (first.abs(), all_int),
        MathOperation::Round => match rest.first() {
            None => (first.round_ties_even(), true),
            Some(places) => {
                let scale = 10f64.powi(*places as i32);
                ((first * scale).round_ties_even() / scale, all_int)
            }
        },
        MathOperation::Floor => (first.floor(), true),
        MathOperation::Ceil => (first.ceil(), true),
        MathOperation::Min => (numbers.iter().copied().fold(f64::INFINITY, f64::min), all_int),
        MathOperation::Max => (
            numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            all_int,
        ),
    };

    if !result.is_finite() {
        return Err(SequenceError::Failed(format!(
            "Math {:?} result is not a finite number",
            operation
        )));
    }
    if integral && result.abs() < MAX_EXACT_INT {
        Ok(Value::Int(result as i64))
    } else {
        Ok(Value::Float(result))
    }
}

/// Interpret a `set_variable` value
fn coerce(value: &Value, value_type: ValueType, ctx: &ExecutionContext) -> SequenceResult<Value> {
    // Structured YAML values are kept as written; text is substituted first
    let text = match value {
        Value::String(text) => ctx.substitute(text),
        other if value_type == ValueType::Auto => return Ok(other.clone()),
        other => other.to_string(),
    };

    let value = match value_type {
        ValueType::Auto => parse_value(&text),
        ValueType::String => Value::String(text),
        ValueType::Number => match parse_value(&text) {
            number if number.is_number() => number,
            _ => return Err(ValueError::NotNumeric(text).into()),
        },
        ValueType::Boolean => match parse_value(&text) {
            Value::Bool(b) => Value::Bool(b),
            _ => return Err(ValueError::NotBoolean(text).into()),
        },
    };
    Ok(value)
}
