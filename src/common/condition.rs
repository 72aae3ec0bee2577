use crate::common;
use crate::common::comparator::{Comparator, WireComparator};

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use serde::Serialize;
use serde_dynamo::to_attribute_value;
use serde_json::Value;
use std::{collections, fmt, mem};

/// Errors raised while building or serializing condition expressions.
///
/// All of these are caller-programming-error conditions: they surface
/// synchronously and are never retried.
#[derive(Debug)]
pub enum ConditionError {
    /// A comparator with no negated wire counterpart was negated.
    InvalidComparison(WireComparator),
    /// Structured filter input named a comparator that does not exist.
    UnknownComparator(String),
    /// A comparator was finalized with no pending attribute key.
    MissingAttribute(Comparator),
    /// Structured or raw input was malformed, or an operand did not match
    /// its comparator's arity.
    MalformedInput(String),
    /// Marshaling a value into the wire format failed.
    Serialization(serde_dynamo::Error),
}

impl fmt::Display for ConditionError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidComparison(comparator) => {
                write!(formatter, "{comparator} can not follow not()")
            }
            Self::UnknownComparator(name) => {
                write!(formatter, "unknown comparison operator '{name}'")
            }
            Self::MissingAttribute(comparator) => {
                write!(
                    formatter,
                    "no attribute set for {comparator} condition, call attribute() first"
                )
            }
            Self::MalformedInput(detail) => formatter.write_str(detail),
            Self::Serialization(error) => write!(formatter, "{error}"),
        }
    }
}

impl std::error::Error for ConditionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Serialization(error) => Some(error),
            _ => None,
        }
    }
}

impl From<serde_dynamo::Error> for ConditionError {
    fn from(error: serde_dynamo::Error) -> Self {
        Self::Serialization(error)
    }
}

/// The operand(s) carried by one comparison clause.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand<T> {
    /// No operand (`exists` takes none).
    None,
    /// A single comparison value.
    Value(T),
    /// An inclusive lower and upper bound (`between`).
    Range(T, T),
    /// A list of candidate values (`in`).
    List(Vec<T>),
}

/// One finalized comparison: an attribute key, a wire comparator, and the
/// operand value(s).
///
/// A key containing `.` denotes a nested attribute path; it is split into
/// per-segment placeholder names during serialization, not here.
#[derive(Clone, Debug, PartialEq)]
pub struct Clause<T> {
    /// The attribute key or dotted attribute path.
    pub key: String,
    /// The resolved wire-protocol comparator.
    pub comparator: WireComparator,
    /// The operand value(s).
    pub operand: Operand<T>,
}

impl<T: Serialize> Clause<T> {
    /// Render the clause into a wire expression fragment against the given
    /// placeholder tokens, writing the marshaled operand(s) into the returned
    /// value map. Multi-operand comparators fan out to `<value_token>_1`,
    /// `<value_token>_2`, … and never write the bare value token.
    pub(crate) fn render(
        &self,
        name_token: &str,
        value_token: &str,
    ) -> Result<(String, collections::HashMap<String, types::AttributeValue>), ConditionError>
    {
        let mut values = collections::HashMap::new();
        let fragment = match (self.comparator, &self.operand) {
            (WireComparator::Exists, _) => format!("attribute_exists ({name_token})"),
            (WireComparator::NotExists, _) => format!("attribute_not_exists ({name_token})"),
            (WireComparator::Eq, Operand::Value(operand)) => {
                values.insert(value_token.to_string(), to_attribute_value(operand)?);
                format!("{name_token} = {value_token}")
            }
            (WireComparator::Ne, Operand::Value(operand)) => {
                values.insert(value_token.to_string(), to_attribute_value(operand)?);
                format!("{name_token} <> {value_token}")
            }
            (WireComparator::Lt, Operand::Value(operand)) => {
                values.insert(value_token.to_string(), to_attribute_value(operand)?);
                format!("{name_token} < {value_token}")
            }
            (WireComparator::Le, Operand::Value(operand)) => {
                values.insert(value_token.to_string(), to_attribute_value(operand)?);
                format!("{name_token} <= {value_token}")
            }
            (WireComparator::Gt, Operand::Value(operand)) => {
                values.insert(value_token.to_string(), to_attribute_value(operand)?);
                format!("{name_token} > {value_token}")
            }
            (WireComparator::Ge, Operand::Value(operand)) => {
                values.insert(value_token.to_string(), to_attribute_value(operand)?);
                format!("{name_token} >= {value_token}")
            }
            (WireComparator::BeginsWith, Operand::Value(operand)) => {
                values.insert(value_token.to_string(), to_attribute_value(operand)?);
                format!("begins_with ({name_token}, {value_token})")
            }
            (WireComparator::Contains, Operand::Value(operand)) => {
                values.insert(value_token.to_string(), to_attribute_value(operand)?);
                format!("contains ({name_token}, {value_token})")
            }
            (WireComparator::NotContains, Operand::Value(operand)) => {
                values.insert(value_token.to_string(), to_attribute_value(operand)?);
                format!("NOT contains ({name_token}, {value_token})")
            }
            (WireComparator::In, Operand::List(operands)) => {
                let mut tokens = Vec::with_capacity(operands.len());
                for (position, operand) in operands.iter().enumerate() {
                    let token = format!("{value_token}_{}", position + 1);
                    values.insert(token.clone(), to_attribute_value(operand)?);
                    tokens.push(token);
                }
                format!("{name_token} IN ({})", tokens.join(", "))
            }
            (WireComparator::Between, Operand::Range(lower, upper)) => {
                let lower_token = format!("{value_token}_1");
                let upper_token = format!("{value_token}_2");
                values.insert(lower_token.clone(), to_attribute_value(lower)?);
                values.insert(upper_token.clone(), to_attribute_value(upper)?);
                format!("{name_token} BETWEEN {lower_token} AND {upper_token}")
            }
            (comparator, _) => {
                return Err(ConditionError::MalformedInput(format!(
                    "{comparator} condition is missing a usable operand"
                )));
            }
        };
        Ok((fragment, values))
    }
}

/// One element of a clause list, in left-to-right serialization order.
#[derive(Clone, Debug, PartialEq)]
pub enum ClauseEntry<T> {
    /// A finalized comparison.
    Clause(Clause<T>),
    /// A boundary marker: the next element combines with the previous one
    /// through this operator instead of the default AND.
    Boundary(common::LogicalOperator),
    /// A parenthesized sub-expression.
    Group(Vec<ClauseEntry<T>>),
}

/// Half-built clause state between `attribute()` and the comparator call.
#[derive(Clone, Debug, Default, PartialEq)]
struct PendingClause {
    key: Option<String>,
    negated: bool,
}

/// A raw, pre-built expression captured verbatim for passthrough.
#[derive(Clone, Debug, PartialEq)]
struct RawCondition {
    expression_key: String,
    expression: String,
    attribute_names: collections::HashMap<String, String>,
    attribute_values: collections::HashMap<String, Value>,
}

impl RawCondition {
    /// Raw passthrough form: exactly three keys, two of which are the
    /// object-valued `ExpressionAttributeNames`/`ExpressionAttributeValues`;
    /// the remaining key names the expression kind and holds the expression
    /// string.
    fn detect(entries: &serde_json::Map<String, Value>) -> Result<Option<Self>, ConditionError> {
        if entries.len() != 3 {
            return Ok(None);
        }
        let (Some(Value::Object(names)), Some(Value::Object(values))) = (
            entries.get("ExpressionAttributeNames"),
            entries.get("ExpressionAttributeValues"),
        ) else {
            return Ok(None);
        };
        let Some((expression_key, expression)) = entries.iter().find(|(key, _)| {
            *key != "ExpressionAttributeNames" && *key != "ExpressionAttributeValues"
        }) else {
            return Ok(None);
        };
        let Value::String(expression) = expression else {
            return Err(ConditionError::MalformedInput(
                "raw condition expression must be a string".to_string(),
            ));
        };
        let mut attribute_names = collections::HashMap::with_capacity(names.len());
        for (token, name) in names {
            let Value::String(name) = name else {
                return Err(ConditionError::MalformedInput(
                    "ExpressionAttributeNames entries must be strings".to_string(),
                ));
            };
            attribute_names.insert(token.clone(), name.clone());
        }
        let attribute_values = values
            .iter()
            .map(|(token, value)| (token.clone(), value.clone()))
            .collect();
        Ok(Some(Self {
            expression_key: expression_key.clone(),
            expression: expression.clone(),
            attribute_names,
            attribute_values,
        }))
    }
}

/// Settings for [`ConditionBuilder::request_object`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RequestSettings {
    /// The wire request key the expression targets.
    pub kind: common::ExpressionKind,
    /// The output shape of the serialized expression.
    pub format: common::ExpressionFormat,
}

/// Fluent builder accumulating comparison clauses, boolean combinators, and
/// nested groups, serializable into a wire expression with placeholder maps.
///
/// ```rust
/// use dynamodb_model::common::condition::{ConditionBuilder, ConditionError, RequestSettings};
/// use serde_json::{Value, json};
///
/// let builder: ConditionBuilder<Value> = ConditionBuilder::new()
///     .attribute("age").gt(json!(21))?
///     .or()
///     .attribute("name").begins_with(json!("J"))?;
/// let mut index = 0;
/// let request = builder
///     .request_object(&RequestSettings::default(), &mut index)?
///     .expect("two clauses were accumulated");
/// assert_eq!(
///     request.expression.into_text(),
///     "#a0 > :v0 OR begins_with (#a1, :v1)",
/// );
/// # Ok::<(), ConditionError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionBuilder<T> {
    conditions: Vec<ClauseEntry<T>>,
    pending: PendingClause,
    raw: Option<RawCondition>,
}

impl<T> Default for ConditionBuilder<T> {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            pending: PendingClause::default(),
            raw: None,
        }
    }
}

impl<T> From<&str> for ConditionBuilder<T> {
    fn from(key: &str) -> Self {
        Self::new().attribute(key)
    }
}

impl<T> From<String> for ConditionBuilder<T> {
    fn from(key: String) -> Self {
        Self::new().attribute(key)
    }
}

impl<T> ConditionBuilder<T> {
    /// An empty builder with no clauses and no pending attribute.
    ///
    /// Copying an existing builder goes through `Clone`; the copy owns its
    /// own state and later mutations do not propagate between the two.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(conditions: Vec<ClauseEntry<T>>) -> Self {
        Self {
            conditions,
            ..Self::new()
        }
    }

    /// Start a clause on the given attribute key or dotted attribute path,
    /// discarding any unfinalized pending state.
    pub fn attribute(mut self, key: impl Into<String>) -> Self {
        self.pending = PendingClause {
            key: Some(key.into()),
            negated: false,
        };
        self
    }

    /// Alias of [`attribute`](Self::attribute).
    pub fn filter(self, key: impl Into<String>) -> Self {
        self.attribute(key)
    }

    /// No-op: AND is the implicit combinator between consecutive clauses.
    /// Present for chain readability.
    pub fn and(self) -> Self {
        self
    }

    /// Combine the next clause with the previous one through OR instead of
    /// the default AND.
    pub fn or(mut self) -> Self {
        self.conditions
            .push(ClauseEntry::Boundary(common::LogicalOperator::Or));
        self
    }

    /// Toggle negation of the pending clause. The flag flips on every call
    /// and is consumed when the next comparator finalizes the clause.
    pub fn not(mut self) -> Self {
        self.pending.negated = !self.pending.negated;
        self
    }

    /// Append another builder's clauses as one parenthesized group.
    pub fn group(mut self, other: Self) -> Self {
        self.conditions.push(ClauseEntry::Group(other.conditions));
        self
    }

    /// Alias of [`group`](Self::group).
    pub fn parenthesis(self, other: Self) -> Self {
        self.group(other)
    }

    /// Build a parenthesized group through a closure receiving a fresh
    /// builder.
    pub fn group_with<F>(self, build: F) -> Result<Self, ConditionError>
    where
        F: FnOnce(Self) -> Result<Self, ConditionError>,
    {
        let inner = build(Self::new())?;
        Ok(self.group(inner))
    }

    /// The accumulated clause list, in serialization order.
    pub fn clauses(&self) -> &[ClauseEntry<T>] {
        &self.conditions
    }

    pub(crate) fn into_entries(self) -> Vec<ClauseEntry<T>> {
        self.conditions
    }

    pub(crate) fn has_or_boundary(&self) -> bool {
        self.conditions
            .iter()
            .any(|entry| matches!(entry, ClauseEntry::Boundary(common::LogicalOperator::Or)))
    }

    /// The top-level attribute constraints, keyed by attribute name, as
    /// consumed by [`select_index`](crate::common::index::select_index).
    /// Clauses inside groups do not contribute; a repeated attribute keeps
    /// its last comparator.
    pub fn constraints(&self) -> IndexMap<String, WireComparator> {
        let mut constraints = IndexMap::new();
        for entry in &self.conditions {
            if let ClauseEntry::Clause(clause) = entry {
                constraints.insert(clause.key.clone(), clause.comparator);
            }
        }
        constraints
    }
}

impl<T: Serialize> ConditionBuilder<T> {
    /// Finalize the pending clause with the given comparator and operand(s).
    ///
    /// This is the generic entry point behind the per-comparator methods.
    /// Negation is resolved here: if [`not`](Self::not) left the pending flag
    /// set and the comparator has no negated counterpart, this fails with
    /// [`ConditionError::InvalidComparison`].
    pub fn compare(
        mut self,
        comparator: Comparator,
        operand: Operand<T>,
    ) -> Result<Self, ConditionError> {
        let pending = mem::take(&mut self.pending);
        let Some(key) = pending.key else {
            return Err(ConditionError::MissingAttribute(comparator));
        };
        match (comparator, &operand) {
            (Comparator::Between, Operand::Range(_, _)) => {}
            (Comparator::Between, _) => {
                return Err(ConditionError::MalformedInput(
                    "between expects a lower and an upper operand".to_string(),
                ));
            }
            (Comparator::In, Operand::List(_)) => {}
            (Comparator::In, _) => {
                return Err(ConditionError::MalformedInput(
                    "in expects a list of candidate operands".to_string(),
                ));
            }
            (_, Operand::Range(_, _) | Operand::List(_)) => {
                return Err(ConditionError::MalformedInput(format!(
                    "{comparator} expects a single operand"
                )));
            }
            _ => {}
        }
        let resolved = if pending.negated {
            comparator
                .negated()
                .ok_or(ConditionError::InvalidComparison(comparator.wire()))?
        } else {
            comparator.wire()
        };
        #[cfg(feature = "tracing")]
        if matches!(operand, Operand::None) && !matches!(comparator, Comparator::Exists) {
            tracing::warn!(
                comparator = resolved.as_str(),
                "conditions without an operand value are rejected by DynamoDB"
            );
        }
        self.conditions.push(ClauseEntry::Clause(Clause {
            key,
            comparator: resolved,
            operand,
        }));
        Ok(self)
    }

    /// Equality comparison.
    pub fn eq(self, value: T) -> Result<Self, ConditionError> {
        self.compare(Comparator::Eq, Operand::Value(value))
    }

    /// Strictly-less-than comparison.
    pub fn lt(self, value: T) -> Result<Self, ConditionError> {
        self.compare(Comparator::Lt, Operand::Value(value))
    }

    /// Less-than-or-equal comparison.
    pub fn le(self, value: T) -> Result<Self, ConditionError> {
        self.compare(Comparator::Le, Operand::Value(value))
    }

    /// Strictly-greater-than comparison.
    pub fn gt(self, value: T) -> Result<Self, ConditionError> {
        self.compare(Comparator::Gt, Operand::Value(value))
    }

    /// Greater-than-or-equal comparison.
    pub fn ge(self, value: T) -> Result<Self, ConditionError> {
        self.compare(Comparator::Ge, Operand::Value(value))
    }

    /// String prefix comparison. Has no negated counterpart.
    pub fn begins_with(self, value: T) -> Result<Self, ConditionError> {
        self.compare(Comparator::BeginsWith, Operand::Value(value))
    }

    /// Substring or set membership comparison.
    pub fn contains(self, value: T) -> Result<Self, ConditionError> {
        self.compare(Comparator::Contains, Operand::Value(value))
    }

    /// Attribute presence check; takes no operand.
    pub fn exists(self) -> Result<Self, ConditionError> {
        self.compare(Comparator::Exists, Operand::None)
    }

    /// Membership in a list of candidate values. Has no negated counterpart.
    pub fn in_list(self, values: Vec<T>) -> Result<Self, ConditionError> {
        self.compare(Comparator::In, Operand::List(values))
    }

    /// Inclusive range comparison. Has no negated counterpart.
    pub fn between(self, lower: T, upper: T) -> Result<Self, ConditionError> {
        self.compare(Comparator::Between, Operand::Range(lower, upper))
    }

    /// Serialize the accumulated clauses into a wire expression with
    /// placeholder name/value maps.
    ///
    /// `index` is the shared placeholder cursor: each clause draws one number
    /// from it, so sequential calls against independent builders that pass
    /// the same cursor never collide in one request's placeholder namespace.
    ///
    /// Returns `None` when there is nothing to serialize: the builder holds
    /// no clauses, or raw passthrough input targets a different expression
    /// kind than `settings.kind`.
    pub fn request_object(
        &self,
        settings: &RequestSettings,
        index: &mut usize,
    ) -> Result<Option<common::ExpressionInput>, ConditionError> {
        if let Some(raw) = &self.raw {
            if raw.expression_key != settings.kind.as_str() {
                return Ok(None);
            }
            let mut values = collections::HashMap::with_capacity(raw.attribute_values.len());
            for (token, value) in &raw.attribute_values {
                let value = if common::is_wire_value(value) {
                    common::wire_value_from_json(value.clone())?
                } else {
                    to_attribute_value(value)?
                };
                values.insert(token.clone(), value);
            }
            return Ok(Some(common::ExpressionInput {
                expression: common::Expression::Text(raw.expression.clone()),
                expression_attribute_names: raw.attribute_names.clone(),
                expression_attribute_values: values,
            }));
        }
        if self.conditions.is_empty() {
            return Ok(None);
        }
        let (tokens, names, values) = reduce_entries(&self.conditions, index)?;
        let expression = match settings.format {
            common::ExpressionFormat::Tokens => common::Expression::Tokens(tokens),
            common::ExpressionFormat::Text => {
                common::Expression::Text(common::Expression::Tokens(tokens).into_text())
            }
        };
        Ok(Some(common::ExpressionInput {
            expression,
            expression_attribute_names: names,
            expression_attribute_values: values,
        }))
    }
}

impl ConditionBuilder<Value> {
    /// Build from a structured JSON filter object, or capture a raw
    /// passthrough expression.
    ///
    /// Each key of a structured object becomes one clause: a direct value
    /// implies `eq`, while a one-key object names a comparator
    /// (`{"between": [1, 2]}`). An unrecognized comparator name fails with
    /// [`ConditionError::UnknownComparator`].
    ///
    /// An object with exactly three keys including object-valued
    /// `ExpressionAttributeNames` and `ExpressionAttributeValues` is captured
    /// verbatim instead; [`request_object`](Self::request_object) then
    /// replays it when asked for the matching expression kind.
    pub fn from_value(input: Value) -> Result<Self, ConditionError> {
        let Value::Object(entries) = input else {
            return Err(ConditionError::MalformedInput(
                "structured condition input must be an object".to_string(),
            ));
        };
        if let Some(raw) = RawCondition::detect(&entries)? {
            return Ok(Self {
                raw: Some(raw),
                ..Self::new()
            });
        }
        let mut builder = Self::new();
        for (key, value) in entries {
            let clause = match value {
                Value::Object(operand_map) if operand_map.len() == 1 => {
                    let Some((name, operand_value)) = operand_map.into_iter().next() else {
                        continue;
                    };
                    let Some(comparator) = Comparator::from_name(&name) else {
                        return Err(ConditionError::UnknownComparator(name));
                    };
                    let operand = match comparator {
                        Comparator::Between => {
                            let mut bounds = match operand_value {
                                Value::Array(bounds) if bounds.len() == 2 => bounds.into_iter(),
                                _ => {
                                    return Err(ConditionError::MalformedInput(
                                        "between expects an array of exactly two operands"
                                            .to_string(),
                                    ));
                                }
                            };
                            let (Some(lower), Some(upper)) = (bounds.next(), bounds.next()) else {
                                return Err(ConditionError::MalformedInput(
                                    "between expects an array of exactly two operands".to_string(),
                                ));
                            };
                            Operand::Range(lower, upper)
                        }
                        Comparator::In => match operand_value {
                            Value::Array(candidates) => Operand::List(candidates),
                            _ => {
                                return Err(ConditionError::MalformedInput(
                                    "in expects an array of candidate operands".to_string(),
                                ));
                            }
                        },
                        Comparator::Exists => Operand::None,
                        _ => Operand::Value(operand_value),
                    };
                    Clause {
                        key,
                        comparator: comparator.wire(),
                        operand,
                    }
                }
                direct => Clause {
                    key,
                    comparator: WireComparator::Eq,
                    operand: Operand::Value(direct),
                },
            };
            builder.conditions.push(ClauseEntry::Clause(clause));
        }
        Ok(builder)
    }
}

/// Depth-first reduce of a clause list into tokens and placeholder maps.
/// The cursor advances exactly once per clause regardless of how many
/// sub-tokens or sub-values the clause fans out to.
fn reduce_entries<T: Serialize>(
    entries: &[ClauseEntry<T>],
    index: &mut usize,
) -> Result<
    (
        Vec<common::ExpressionToken>,
        collections::HashMap<String, String>,
        collections::HashMap<String, types::AttributeValue>,
    ),
    ConditionError,
> {
    let mut tokens = Vec::new();
    let mut names = collections::HashMap::new();
    let mut values = collections::HashMap::new();
    let mut boundary: Option<common::LogicalOperator> = None;
    for entry in entries {
        match entry {
            ClauseEntry::Boundary(operator) => boundary = Some(*operator),
            ClauseEntry::Clause(clause) => {
                let position = *index;
                *index += 1;
                let (name_token, clause_names) = name_tokens(&clause.key, position);
                let value_token = format!(":v{position}");
                let (fragment, clause_values) = clause.render(&name_token, &value_token)?;
                push_token(
                    &mut tokens,
                    &mut boundary,
                    common::ExpressionToken::Fragment(fragment),
                );
                names.extend(clause_names);
                values.extend(clause_values);
            }
            ClauseEntry::Group(sub_entries) => {
                let (sub_tokens, sub_names, sub_values) = reduce_entries(sub_entries, index)?;
                if sub_tokens.is_empty() {
                    continue;
                }
                push_token(
                    &mut tokens,
                    &mut boundary,
                    common::ExpressionToken::Group(sub_tokens),
                );
                names.extend(sub_names);
                values.extend(sub_values);
            }
        }
    }
    Ok((tokens, names, values))
}

/// The first fragment of a (sub)list is never prefixed; after that, each
/// fragment joins with AND unless an OR boundary intervened.
fn push_token(
    tokens: &mut Vec<common::ExpressionToken>,
    boundary: &mut Option<common::LogicalOperator>,
    token: common::ExpressionToken,
) {
    let operator = boundary.take().unwrap_or_default();
    if !tokens.is_empty() {
        tokens.push(common::ExpressionToken::Operator(operator));
    }
    tokens.push(token);
}

/// Placeholder name token(s) for an attribute key. Dotted paths split into
/// one sub-token per segment, all drawn from the same clause number.
fn name_tokens(key: &str, position: usize) -> (String, collections::HashMap<String, String>) {
    let mut names = collections::HashMap::new();
    if key.contains('.') {
        let mut path_tokens = Vec::new();
        for (segment_position, segment) in key.split('.').enumerate() {
            let token = format!("#a{position}_{segment_position}");
            names.insert(token.clone(), segment.to_string());
            path_tokens.push(token);
        }
        (path_tokens.join("."), names)
    } else {
        let token = format!("#a{position}");
        names.insert(token.clone(), key.to_string());
        (token, names)
    }
}
