//! Permission expression evaluator
//!
//! A minimal comparison DSL (`key operator value`) used to conditionally
//! gate a permission check. The empty expression means "no gate"; callers
//! treat evaluation errors as "permission not satisfied", never fatal.

use crate::error::{CoreError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// A single comparison over two operands.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Comparison {
    /// Left operand, usually an attribute name before enrichment
    #[serde(default)]
    pub key: Value,
    /// Comparison operator: `==`, `!=`, `<`, `<=`, `>`, `>=`
    #[serde(default)]
    pub operator: String,
    /// Right operand
    #[serde(default)]
    pub value: Value,
}

impl Comparison {
    fn is_zero(&self) -> bool {
        self.key.is_null() && self.operator.is_empty() && self.value.is_null()
    }
}

/// Conditional gate attached to a permission.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Expression {
    /// The comparison; the zero value means no gate is configured
    #[serde(default)]
    pub comparison: Comparison,
}

impl Expression {
    /// Whether no gate is configured.
    pub fn is_empty(&self) -> bool {
        self.comparison.is_zero()
    }

    /// Substitute operands that name an extracted attribute with its value.
    pub fn enrich(mut self, attrs: &HashMap<String, Value>) -> Self {
        if let Value::String(name) = &self.comparison.key {
            if let Some(found) = attrs.get(name) {
                self.comparison.key = found.clone();
            }
        }
        if let Value::String(name) = &self.comparison.value {
            if let Some(found) = attrs.get(name) {
                self.comparison.value = found.clone();
            }
        }
        self
    }

    /// Evaluate the comparison.
    ///
    /// Returns `Ok(None)` for the empty expression, meaning "no gate,
    /// always proceed to the authorization check".
    pub fn evaluate(&self) -> Result<Option<bool>> {
        if self.is_empty() {
            return Ok(None);
        }

        let cmp = &self.comparison;
        let result = match cmp.operator.as_str() {
            "==" => cmp.key == cmp.value,
            "!=" => cmp.key != cmp.value,
            "<" => numeric(&cmp.key)? < numeric(&cmp.value)?,
            "<=" => numeric(&cmp.key)? <= numeric(&cmp.value)?,
            ">" => numeric(&cmp.key)? > numeric(&cmp.value)?,
            ">=" => numeric(&cmp.key)? >= numeric(&cmp.value)?,
            other => return Err(CoreError::UnsupportedOperator(other.to_string())),
        };
        Ok(Some(result))
    }
}

fn numeric(value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| CoreError::NotComparable(format!("{n} is not representable"))),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| CoreError::NotComparable(format!("{s:?} is not numeric"))),
        other => Err(CoreError::NotComparable(format!("{other} is not numeric"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expr(key: Value, operator: &str, value: Value) -> Expression {
        Expression {
            comparison: Comparison { key, operator: operator.to_string(), value },
        }
    }

    #[test]
    fn empty_expression_means_no_gate() {
        let e = Expression::default();
        assert!(e.is_empty());
        assert_eq!(e.evaluate().unwrap(), None);
    }

    #[test]
    fn equality_comparisons() {
        assert_eq!(expr(json!("A"), "==", json!("A")).evaluate().unwrap(), Some(true));
        assert_eq!(expr(json!("A"), "==", json!("B")).evaluate().unwrap(), Some(false));
        assert_eq!(expr(json!("A"), "!=", json!("B")).evaluate().unwrap(), Some(true));
    }

    #[test]
    fn numeric_comparisons() {
        assert_eq!(expr(json!(2), "<", json!(3)).evaluate().unwrap(), Some(true));
        assert_eq!(expr(json!("10"), ">=", json!(2)).evaluate().unwrap(), Some(true));
        assert_eq!(expr(json!(5), "<=", json!(4)).evaluate().unwrap(), Some(false));
    }

    #[test]
    fn non_comparable_operands_error() {
        assert!(expr(json!("abc"), "<", json!(3)).evaluate().is_err());
        assert!(expr(json!({"k": 1}), ">", json!(3)).evaluate().is_err());
    }

    #[test]
    fn unknown_operator_errors() {
        assert!(expr(json!(1), "~=", json!(1)).evaluate().is_err());
    }

    #[test]
    fn enrich_substitutes_attribute_operands() {
        let attrs = HashMap::from([("group".to_string(), json!("admins"))]);
        let e = expr(json!("group"), "==", json!("admins")).enrich(&attrs);
        assert_eq!(e.comparison.key, json!("admins"));
        assert_eq!(e.evaluate().unwrap(), Some(true));
    }

    #[test]
    fn yaml_shape() {
        let e: Expression = serde_yaml::from_str(
            "comparison:\n  key: group\n  operator: '=='\n  value: admins\n",
        )
        .unwrap();
        assert!(!e.is_empty());
        assert_eq!(e.comparison.operator, "==");
    }
}
