//! Selector language for collection queries.
//!
//! Covers the subset the terminal actually issues: per-field equality,
//! `$gt`, and `$gte`, combined conjunctively. Comparison uses a total
//! order over JSON values so queries against mixed-type fields stay
//! deterministic.

use std::cmp::Ordering;

use serde_json::Value;

/// A single-field constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the value exactly.
    Eq(Value),
    /// Field is strictly greater than the bound.
    Gt(Value),
    /// Field is greater than or equal to the bound.
    Gte(Value),
}

impl Condition {
    /// Whether this condition holds for the field value `actual`.
    /// A missing field never satisfies a condition.
    fn holds(&self, actual: Option<&Value>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self {
            Condition::Eq(expected) => actual == expected,
            Condition::Gt(bound) => compare_values(actual, bound) == Ordering::Greater,
            Condition::Gte(bound) => compare_values(actual, bound) != Ordering::Less,
        }
    }
}

/// Conjunction of per-field conditions. An empty selector matches every
/// record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    conditions: Vec<(String, Condition)>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field == value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions
            .push((field.into(), Condition::Eq(value.into())));
        self
    }

    /// Require `field > value`.
    pub fn gt(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions
            .push((field.into(), Condition::Gt(value.into())));
        self
    }

    /// Require `field >= value`.
    pub fn gte(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions
            .push((field.into(), Condition::Gte(value.into())));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// True when every condition holds for the field values produced by
    /// `lookup`.
    pub fn matches<F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<Value>,
    {
        self.conditions
            .iter()
            .all(|(field, cond)| cond.holds(lookup(field).as_ref()))
    }
}

/// Sort direction for a single-field sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Total order over JSON values: null < bool < number < string < array
/// < object. Numbers compare as f64, strings lexicographically, arrays
/// element-wise then by length. Objects serialize with sorted keys, so
/// comparing their serialized form is deterministic.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (ex, ey) in x.iter().zip(y.iter()) {
                let ord = compare_values(ex, ey);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(_), Value::Object(_)) => a.to_string().cmp(&b.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}
