use std::collections::{BTreeSet, HashSet};

use serde_json::{json, Value};

use arsim_types::{TransactionIndex, TxId};

use crate::error::{QueryError, QueryResult};

/// A validated ARQL query tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArqlQuery {
    Equals { field: String, value: String },
    And(Box<ArqlQuery>, Box<ArqlQuery>),
    Or(Box<ArqlQuery>, Box<ArqlQuery>),
}

impl ArqlQuery {
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn and(left: ArqlQuery, right: ArqlQuery) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: ArqlQuery, right: ArqlQuery) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    /// Parse and validate a raw request body.
    pub fn parse(body: &[u8]) -> QueryResult<Self> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| QueryError::InvalidJson(e.to_string()))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> QueryResult<Self> {
        Self::from_value_at(value, "$")
    }

    fn from_value_at(value: &Value, at: &str) -> QueryResult<Self> {
        let syntax = |reason: &str| QueryError::InvalidSyntax(format!("{at}: {reason}"));

        let node = value.as_object().ok_or_else(|| syntax("expected an object"))?;
        let op = node
            .get("op")
            .and_then(Value::as_str)
            .ok_or_else(|| syntax("missing string `op`"))?;
        let expr1 = node.get("expr1").ok_or_else(|| syntax("missing `expr1`"))?;
        let expr2 = node.get("expr2").ok_or_else(|| syntax("missing `expr2`"))?;

        match op {
            "equals" => match (expr1.as_str(), expr2.as_str()) {
                (Some(field), Some(value)) => Ok(Self::equals(field, value)),
                _ => Err(syntax("`equals` operands must be strings")),
            },
            "and" | "or" => {
                let left = Self::from_value_at(expr1, &format!("{at}.expr1"))?;
                let right = Self::from_value_at(expr2, &format!("{at}.expr2"))?;
                Ok(if op == "and" {
                    Self::and(left, right)
                } else {
                    Self::or(left, right)
                })
            }
            other => Err(syntax(&format!("unknown op `{other}`"))),
        }
    }

    /// The wire form, for forwarding to the real network.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Equals { field, value } => json!({"op": "equals", "expr1": field, "expr2": value}),
            Self::And(l, r) => json!({"op": "and", "expr1": l.to_value(), "expr2": r.to_value()}),
            Self::Or(l, r) => json!({"op": "or", "expr1": l.to_value(), "expr2": r.to_value()}),
        }
    }

    /// Ids of all records matching the query.
    pub fn evaluate(&self, index: &TransactionIndex) -> BTreeSet<TxId> {
        match self {
            Self::Equals { field, value } => index
                .values()
                .filter(|record| record.has_tag(field, value))
                .map(|record| record.id.clone())
                .collect(),
            Self::And(l, r) => {
                let left = l.evaluate(index);
                let right = r.evaluate(index);
                left.intersection(&right).cloned().collect()
            }
            Self::Or(l, r) => {
                let mut left = l.evaluate(index);
                left.extend(r.evaluate(index));
                left
            }
        }
    }
}

/// Local ids first, then remote ids not already present.
pub fn merge_results(local: impl IntoIterator<Item = String>, remote: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    local
        .into_iter()
        .chain(remote)
        .filter(|id| seen.insert(id.clone()))
        .collect()
}
