//! Common utilities for DynamoDB operations.
//!
//! This module provides the shared expression vocabulary used across read and
//! write operations: logical operators, expression kinds and output formats,
//! the accumulator type produced by expression serialization, and helpers for
//! recognizing and converting values already in the DynamoDB wire format.

/// Comparison operators and their wire-protocol counterparts.
pub mod comparator;

/// Fluent condition building and expression serialization.
pub mod condition;

/// Table key schema, secondary index descriptors, and best-index selection.
pub mod index;

/// Key types for identifying items in DynamoDB tables.
pub mod key;

/// Attribute projection for projection expressions.
pub mod projection;

use aws_sdk_dynamodb::types;
use aws_smithy_types::{Blob, base64};
use serde_json::Value;
use std::collections;

/// Logical operator combining adjacent condition fragments.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum LogicalOperator {
    /// Logical AND - all conditions must be true.
    #[default]
    And,
    /// Logical OR - at least one condition must be true.
    Or,
}

impl LogicalOperator {
    /// The bare wire keyword, as emitted in token-array output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    /// The keyword padded for infix use in concatenated expression strings.
    pub fn separator(&self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// The wire request key an expression is serialized under.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ExpressionKind {
    /// `ConditionExpression`, guarding conditional writes.
    #[default]
    Condition,
    /// `FilterExpression`, applied to Query and Scan results.
    Filter,
    /// `KeyConditionExpression`, restricting a Query to key values.
    KeyCondition,
}

impl ExpressionKind {
    /// The exact request key spelling used by the DynamoDB API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Condition => "ConditionExpression",
            Self::Filter => "FilterExpression",
            Self::KeyCondition => "KeyConditionExpression",
        }
    }
}

/// Output shape for a serialized expression.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ExpressionFormat {
    /// A single concatenated expression string.
    #[default]
    Text,
    /// A nested token list, one element per fragment, operator, or group.
    Tokens,
}

/// One element of a tokenized expression.
#[derive(Clone, Debug, PartialEq)]
pub enum ExpressionToken {
    /// A rendered comparison fragment, e.g. `#a0 = :v0`.
    Fragment(String),
    /// A boolean operator joining the surrounding tokens.
    Operator(LogicalOperator),
    /// A parenthesized sub-expression.
    Group(Vec<ExpressionToken>),
}

/// A serialized expression, in either output shape.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    /// Concatenated expression string.
    Text(String),
    /// Tokenized form; groups become nested lists instead of parentheses.
    Tokens(Vec<ExpressionToken>),
}

impl Default for Expression {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl Expression {
    /// Flatten into the concatenated string form.
    ///
    /// Token groups become parenthesized sub-expressions, so both output
    /// shapes flatten to byte-identical text.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Tokens(tokens) => flatten_tokens(&tokens),
        }
    }
}

fn flatten_tokens(tokens: &[ExpressionToken]) -> String {
    let mut text = String::new();
    for token in tokens {
        match token {
            ExpressionToken::Fragment(fragment) => text.push_str(fragment),
            ExpressionToken::Operator(operator) => text.push_str(operator.separator()),
            ExpressionToken::Group(nested) => {
                text.push('(');
                text.push_str(&flatten_tokens(nested));
                text.push(')');
            }
        }
    }
    text
}

/// A serialized expression together with its placeholder maps.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpressionInput {
    /// The expression body.
    pub expression: Expression,
    /// Placeholder-to-attribute-name substitutions.
    pub expression_attribute_names: collections::HashMap<String, String>,
    /// Placeholder-to-value substitutions, already in wire format.
    pub expression_attribute_values: collections::HashMap<String, types::AttributeValue>,
}

impl ExpressionInput {
    /// Merge the placeholder maps into a request's optional maps and return
    /// the expression text. Empty maps are elided rather than written through,
    /// since DynamoDB rejects empty substitution maps.
    pub(crate) fn merge_into(
        self,
        names: &mut Option<collections::HashMap<String, String>>,
        values: &mut Option<collections::HashMap<String, types::AttributeValue>>,
    ) -> String {
        if !self.expression_attribute_names.is_empty() {
            match names {
                Some(existing) => existing.extend(self.expression_attribute_names),
                None => *names = Some(self.expression_attribute_names),
            }
        }
        if !self.expression_attribute_values.is_empty() {
            match values {
                Some(existing) => existing.extend(self.expression_attribute_values),
                None => *values = Some(self.expression_attribute_values),
            }
        }
        self.expression.into_text()
    }
}

/// Whether a JSON value is shaped like a DynamoDB wire-format value, i.e. a
/// single-key map whose key is a type tag (`{"S": "hello"}`, `{"N": "5"}`).
///
/// Raw passthrough uses this to decide which `ExpressionAttributeValues`
/// entries still need marshaling; already-tagged values are converted as-is so
/// the conversion is idempotent.
pub fn is_wire_value(value: &Value) -> bool {
    let Some(map) = value.as_object() else {
        return false;
    };
    if map.len() != 1 {
        return false;
    }
    let Some((tag, inner)) = map.iter().next() else {
        return false;
    };
    match tag.as_str() {
        "S" | "B" => inner.is_string(),
        "N" => inner.is_string() || inner.is_number(),
        "BOOL" | "NULL" => inner.is_boolean(),
        "SS" | "BS" => inner
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
        "NS" => inner
            .as_array()
            .is_some_and(|items| items.iter().all(|item| item.is_string() || item.is_number())),
        "L" => inner
            .as_array()
            .is_some_and(|items| items.iter().all(is_wire_value)),
        "M" => inner
            .as_object()
            .is_some_and(|entries| entries.values().all(is_wire_value)),
        _ => false,
    }
}

/// Convert a wire-shaped JSON value into the SDK attribute value it denotes.
pub fn wire_value_from_json(
    value: Value,
) -> Result<types::AttributeValue, condition::ConditionError> {
    let malformed = |detail: &str| condition::ConditionError::MalformedInput(detail.to_string());
    let Value::Object(map) = value else {
        return Err(malformed("a wire value must be a single-key tagged map"));
    };
    if map.len() != 1 {
        return Err(malformed("a wire value must be a single-key tagged map"));
    }
    let Some((tag, inner)) = map.into_iter().next() else {
        return Err(malformed("a wire value must be a single-key tagged map"));
    };
    match (tag.as_str(), inner) {
        ("S", Value::String(text)) => Ok(types::AttributeValue::S(text)),
        ("N", Value::String(text)) => Ok(types::AttributeValue::N(text)),
        ("N", Value::Number(number)) => Ok(types::AttributeValue::N(number.to_string())),
        ("B", Value::String(encoded)) => decode_blob(&encoded).map(types::AttributeValue::B),
        ("BOOL", Value::Bool(flag)) => Ok(types::AttributeValue::Bool(flag)),
        ("NULL", Value::Bool(_)) => Ok(types::AttributeValue::Null(true)),
        ("SS", Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(text) => Ok(text),
                _ => Err(malformed("'SS' members must be strings")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(types::AttributeValue::Ss),
        ("NS", Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(text) => Ok(text),
                Value::Number(number) => Ok(number.to_string()),
                _ => Err(malformed("'NS' members must be numbers")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(types::AttributeValue::Ns),
        ("BS", Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(encoded) => decode_blob(&encoded),
                _ => Err(malformed("'BS' members must be base64 strings")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(types::AttributeValue::Bs),
        ("L", Value::Array(items)) => items
            .into_iter()
            .map(wire_value_from_json)
            .collect::<Result<Vec<_>, _>>()
            .map(types::AttributeValue::L),
        ("M", Value::Object(entries)) => entries
            .into_iter()
            .map(|(key, entry)| Ok((key, wire_value_from_json(entry)?)))
            .collect::<Result<collections::HashMap<_, _>, condition::ConditionError>>()
            .map(types::AttributeValue::M),
        (tag, _) => Err(condition::ConditionError::MalformedInput(format!(
            "'{tag}' is not a DynamoDB wire value type"
        ))),
    }
}

fn decode_blob(encoded: &str) -> Result<Blob, condition::ConditionError> {
    base64::decode(encoded).map(Blob::new).map_err(|error| {
        condition::ConditionError::MalformedInput(format!("invalid base64 blob: {error}"))
    })
}
