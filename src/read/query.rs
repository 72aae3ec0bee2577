use crate::common::comparator::WireComparator;
use crate::common::condition::{
    Clause, ClauseEntry, ConditionBuilder, ConditionError, RequestSettings,
};
use crate::common::index;
use crate::{common, read};

use aws_sdk_dynamodb::{Client, error, operation, types};
use serde::Serialize;
use std::{collections, fmt};

/// Fixed placeholder tokens for the key condition, kept distinct from the
/// numbered filter placeholders so both can share one request's maps.
const HASH_NAME_TOKEN: &str = "#qha";
const HASH_VALUE_TOKEN: &str = ":qhv";
const RANGE_NAME_TOKEN: &str = "#qra";
const RANGE_VALUE_TOKEN: &str = ":qrv";

/// Errors raised while assembling a query request.
#[derive(Debug)]
pub enum QueryBuildError {
    /// Neither the table key nor any secondary index satisfies the query's
    /// constraints, or a named index does not exist.
    NoUsableIndex,
    /// Building or serializing a condition expression failed.
    Condition(ConditionError),
    /// Marshaling a request argument failed.
    Serialization(serde_dynamo::Error),
}

impl fmt::Display for QueryBuildError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoUsableIndex => formatter.write_str("index can't be found for query"),
            Self::Condition(error) => write!(formatter, "{error}"),
            Self::Serialization(error) => write!(formatter, "{error}"),
        }
    }
}

impl std::error::Error for QueryBuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NoUsableIndex => None,
            Self::Condition(error) => Some(error),
            Self::Serialization(error) => Some(error),
        }
    }
}

impl From<ConditionError> for QueryBuildError {
    fn from(error: ConditionError) -> Self {
        Self::Condition(error)
    }
}

impl From<serde_dynamo::Error> for QueryBuildError {
    fn from(error: serde_dynamo::Error) -> Self {
        Self::Serialization(error)
    }
}

/// query operation
#[derive(Clone, Debug, Default, PartialEq)]
struct QueryInput {
    key_condition_expression: String,
    multiple_read_operation: read::common::MultipleReadInput,
    return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    scan_index_forward: Option<bool>,
}

/// Query operation with automatic index selection.
///
/// The condition builder holds every attribute constraint of the query.
/// Assembly picks the table key or the best secondary index for those
/// constraints, carves the satisfied hash/range clauses out into the
/// `KeyConditionExpression` (under the fixed `#qha`/`:qhv` and `#qra`/`:qrv`
/// placeholders), and serializes everything left over into the
/// `FilterExpression` with numbered placeholders.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_model::common::condition::ConditionBuilder;
/// use dynamodb_model::common::index;
/// use dynamodb_model::read;
/// use serde_json::json;
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let query = read::query::Query {
///     condition: ConditionBuilder::new()
///         .attribute("id").eq(json!("1"))?
///         .attribute("name").begins_with(json!("J"))?,
///     multiple_read_args: read::common::MultipleReadArgs {
///         table_name: "users".to_string(),
///         ..Default::default()
///     },
///     schema: index::TableSchema {
///         table_key: index::TableKey {
///             hash_key: "id".to_string(),
///             range_key: None,
///         },
///         ..Default::default()
///     },
///     ..Default::default()
/// };
/// query.send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query<T> {
    /// The attribute constraints; key conditions are carved out of these and
    /// everything left over becomes the filter expression.
    pub condition: ConditionBuilder<T>,
    /// Additional read operation arguments (table name, pagination,
    /// projection, explicit index override, etc.).
    pub multiple_read_args: read::common::MultipleReadArgs<T>,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    /// Whether to traverse the index forward (ascending) or backward.
    pub scan_index_forward: Option<bool>,
    /// The table's key schema and secondary indexes.
    pub schema: index::TableSchema,
}

/// Pull the first hash-key equality clause and the first range-key clause
/// (any comparator) out of the list; everything else stays for the filter.
fn split_key_clauses<T>(
    condition: ConditionBuilder<T>,
    hash_key: &str,
    range_key: Option<&str>,
) -> (Option<Clause<T>>, Option<Clause<T>>, Vec<ClauseEntry<T>>) {
    let mut hash_clause = None;
    let mut range_clause = None;
    let mut remaining = Vec::new();
    for entry in condition.into_entries() {
        match entry {
            ClauseEntry::Clause(clause)
                if hash_clause.is_none()
                    && clause.key == hash_key
                    && clause.comparator == WireComparator::Eq =>
            {
                hash_clause = Some(clause);
            }
            ClauseEntry::Clause(clause)
                if range_clause.is_none()
                    && range_key.is_some_and(|range_key| clause.key == range_key) =>
            {
                range_clause = Some(clause);
            }
            other => remaining.push(other),
        }
    }
    (hash_clause, range_clause, remaining)
}

impl<T: Serialize> TryFrom<Query<T>> for QueryInput {
    type Error = QueryBuildError;

    fn try_from(query: Query<T>) -> Result<Self, QueryBuildError> {
        let mut multiple_read_operation: read::common::MultipleReadInput =
            query.multiple_read_args.try_into()?;
        // An OR boundary at the top level breaks the conjunction the key
        // condition would be carved out of.
        if query.condition.has_or_boundary() {
            return Err(QueryBuildError::NoUsableIndex);
        }
        let index_override = multiple_read_operation.index_name.clone();
        let (hash_key, range_key) = match index_override {
            Some(name) => {
                let Some(secondary) = query.schema.secondary_index(&name) else {
                    return Err(QueryBuildError::NoUsableIndex);
                };
                (secondary.hash_key.clone(), secondary.range_key.clone())
            }
            None => {
                let decision = index::select_index(&query.schema, &query.condition.constraints());
                if decision.table_index {
                    (
                        query.schema.table_key.hash_key.clone(),
                        query.schema.table_key.range_key.clone(),
                    )
                } else if let Some(name) = decision.index_name {
                    let Some(secondary) = query.schema.secondary_index(&name) else {
                        return Err(QueryBuildError::NoUsableIndex);
                    };
                    let keys = (secondary.hash_key.clone(), secondary.range_key.clone());
                    multiple_read_operation.index_name = Some(name);
                    keys
                } else {
                    return Err(QueryBuildError::NoUsableIndex);
                }
            }
        };
        let (hash_clause, range_clause, remaining) =
            split_key_clauses(query.condition, &hash_key, range_key.as_deref());
        let Some(hash_clause) = hash_clause else {
            return Err(QueryBuildError::NoUsableIndex);
        };
        let mut expression_attribute_names =
            collections::HashMap::from([(HASH_NAME_TOKEN.to_string(), hash_key)]);
        let (mut key_condition_expression, mut expression_attribute_values) =
            hash_clause.render(HASH_NAME_TOKEN, HASH_VALUE_TOKEN)?;
        if let (Some(range_clause), Some(range_key)) = (range_clause, range_key) {
            let (range_fragment, range_values) =
                range_clause.render(RANGE_NAME_TOKEN, RANGE_VALUE_TOKEN)?;
            expression_attribute_names.insert(RANGE_NAME_TOKEN.to_string(), range_key);
            expression_attribute_values.extend(range_values);
            key_condition_expression.push_str(common::LogicalOperator::And.separator());
            key_condition_expression.push_str(&range_fragment);
        }
        let key_condition_input = common::ExpressionInput {
            expression: common::Expression::Text(key_condition_expression),
            expression_attribute_names,
            expression_attribute_values,
        };
        let key_condition_expression = key_condition_input.merge_into(
            &mut multiple_read_operation.expression_attribute_names,
            &mut multiple_read_operation.expression_attribute_values,
        );
        let filter = ConditionBuilder::from_entries(remaining);
        let filter_settings = RequestSettings {
            kind: common::ExpressionKind::Filter,
            ..RequestSettings::default()
        };
        let mut placeholder_index = 0;
        if let Some(filter_input) = filter.request_object(&filter_settings, &mut placeholder_index)?
        {
            multiple_read_operation.filter_expression = Some(filter_input.merge_into(
                &mut multiple_read_operation.expression_attribute_names,
                &mut multiple_read_operation.expression_attribute_values,
            ));
        }
        let operation = Self {
            key_condition_expression,
            multiple_read_operation,
            return_consumed_capacity: query.return_consumed_capacity,
            scan_index_forward: query.scan_index_forward,
        };
        Ok(operation)
    }
}

impl<T: Serialize> Query<T> {
    /// Execute the query operation.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.query", skip_all, err)
    )]
    pub async fn send(
        self,
        client: &Client,
    ) -> Result<operation::query::QueryOutput, error::SdkError<operation::query::QueryError>> {
        let query: QueryInput = self.try_into().map_err(error::BuildError::other)?;
        let builder = client
            .query()
            .key_condition_expression(query.key_condition_expression)
            .set_return_consumed_capacity(query.return_consumed_capacity)
            .set_scan_index_forward(query.scan_index_forward);
        let mut paginator =
            crate::apply_multiple_read_operation!(builder, query.multiple_read_operation)
                .into_paginator()
                .send();
        crate::get_paginated_output!(paginator, operation::query::QueryOutput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use serde_json::{Value, json};

    fn users_schema() -> index::TableSchema {
        index::TableSchema {
            global_secondary_indexes: vec![
                index::SecondaryIndex {
                    hash_key: "attr1".to_string(),
                    name: "HashOnly".to_string(),
                    range_key: None,
                },
                index::SecondaryIndex {
                    hash_key: "attr1".to_string(),
                    name: "ByRange".to_string(),
                    range_key: Some("attr2".to_string()),
                },
            ],
            table_key: index::TableKey {
                hash_key: "id".to_string(),
                range_key: Some("date".to_string()),
            },
            ..Default::default()
        }
    }

    #[rstest]
    #[case::table_key_with_filter(
        Query {
            condition: ConditionBuilder::new()
                .attribute("id").eq(json!("1")).unwrap()
                .attribute("name").contains(json!("J")).unwrap(),
            multiple_read_args: read::common::MultipleReadArgs {
                table_name: "users".to_string(),
                ..Default::default()
            },
            schema: index::TableSchema {
                table_key: index::TableKey {
                    hash_key: "id".to_string(),
                    range_key: None,
                },
                ..Default::default()
            },
            ..Default::default()
        },
        QueryInput {
            key_condition_expression: "#qha = :qhv".to_string(),
            multiple_read_operation: read::common::MultipleReadInput {
                expression_attribute_names: Some(
                    collections::HashMap::from(
                        [
                            ("#qha".to_string(), "id".to_string()),
                            ("#a0".to_string(), "name".to_string()),
                        ]
                    )
                ),
                expression_attribute_values: Some(
                    collections::HashMap::from(
                        [
                            (
                                ":qhv".to_string(),
                                types::AttributeValue::S(
                                    "1".to_string()
                                )
                            ),
                            (
                                ":v0".to_string(),
                                types::AttributeValue::S(
                                    "J".to_string()
                                )
                            ),
                        ]
                    )
                ),
                filter_expression: Some(
                    "contains (#a0, :v0)".to_string()
                ),
                table_name: "users".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    )]
    #[case::ranged_index_selected_automatically(
        Query {
            condition: ConditionBuilder::new()
                .attribute("attr1").eq(json!("x")).unwrap()
                .attribute("attr2").ge(json!(5)).unwrap(),
            multiple_read_args: read::common::MultipleReadArgs {
                table_name: "users".to_string(),
                ..Default::default()
            },
            schema: users_schema(),
            ..Default::default()
        },
        QueryInput {
            key_condition_expression: "#qha = :qhv AND #qra >= :qrv".to_string(),
            multiple_read_operation: read::common::MultipleReadInput {
                expression_attribute_names: Some(
                    collections::HashMap::from(
                        [
                            ("#qha".to_string(), "attr1".to_string()),
                            ("#qra".to_string(), "attr2".to_string()),
                        ]
                    )
                ),
                expression_attribute_values: Some(
                    collections::HashMap::from(
                        [
                            (
                                ":qhv".to_string(),
                                types::AttributeValue::S(
                                    "x".to_string()
                                )
                            ),
                            (
                                ":qrv".to_string(),
                                types::AttributeValue::N(
                                    "5".to_string()
                                )
                            ),
                        ]
                    )
                ),
                index_name: Some("ByRange".to_string()),
                table_name: "users".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    )]
    #[case::table_range_between(
        Query {
            condition: ConditionBuilder::new()
                .attribute("id").eq(json!("1")).unwrap()
                .attribute("date").between(json!("2024-01-01"), json!("2024-12-31")).unwrap(),
            multiple_read_args: read::common::MultipleReadArgs {
                table_name: "users".to_string(),
                ..Default::default()
            },
            schema: users_schema(),
            scan_index_forward: Some(false),
            ..Default::default()
        },
        QueryInput {
            key_condition_expression:
                "#qha = :qhv AND #qra BETWEEN :qrv_1 AND :qrv_2".to_string(),
            multiple_read_operation: read::common::MultipleReadInput {
                expression_attribute_names: Some(
                    collections::HashMap::from(
                        [
                            ("#qha".to_string(), "id".to_string()),
                            ("#qra".to_string(), "date".to_string()),
                        ]
                    )
                ),
                expression_attribute_values: Some(
                    collections::HashMap::from(
                        [
                            (
                                ":qhv".to_string(),
                                types::AttributeValue::S(
                                    "1".to_string()
                                )
                            ),
                            (
                                ":qrv_1".to_string(),
                                types::AttributeValue::S(
                                    "2024-01-01".to_string()
                                )
                            ),
                            (
                                ":qrv_2".to_string(),
                                types::AttributeValue::S(
                                    "2024-12-31".to_string()
                                )
                            ),
                        ]
                    )
                ),
                table_name: "users".to_string(),
                ..Default::default()
            },
            scan_index_forward: Some(false),
            ..Default::default()
        }
    )]
    #[case::explicit_index_override_skips_selection(
        Query {
            condition: ConditionBuilder::new()
                .attribute("attr1").eq(json!("x")).unwrap(),
            multiple_read_args: read::common::MultipleReadArgs {
                index_name: Some("HashOnly".to_string()),
                table_name: "users".to_string(),
                ..Default::default()
            },
            schema: users_schema(),
            ..Default::default()
        },
        QueryInput {
            key_condition_expression: "#qha = :qhv".to_string(),
            multiple_read_operation: read::common::MultipleReadInput {
                expression_attribute_names: Some(
                    collections::HashMap::from(
                        [
                            ("#qha".to_string(), "attr1".to_string()),
                        ]
                    )
                ),
                expression_attribute_values: Some(
                    collections::HashMap::from(
                        [
                            (
                                ":qhv".to_string(),
                                types::AttributeValue::S(
                                    "x".to_string()
                                )
                            ),
                        ]
                    )
                ),
                index_name: Some("HashOnly".to_string()),
                table_name: "users".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    )]
    fn test_query(#[case] args: Query<Value>, #[case] expected: QueryInput) {
        let actual: QueryInput = args.try_into().unwrap();
        assert_eq!(actual, expected);
    }

    #[rstest]
    #[case::only_a_range_constraint(
        Query {
            condition: ConditionBuilder::new()
                .attribute("attr1").ge(json!(5)).unwrap(),
            schema: users_schema(),
            ..Default::default()
        },
    )]
    #[case::unindexed_attribute_only(
        Query {
            condition: ConditionBuilder::new()
                .attribute("unindexed").eq(json!(5)).unwrap(),
            schema: users_schema(),
            ..Default::default()
        },
    )]
    #[case::top_level_or_disables_key_extraction(
        Query {
            condition: ConditionBuilder::new()
                .attribute("id").eq(json!("1")).unwrap()
                .or()
                .attribute("attr1").eq(json!("x")).unwrap(),
            schema: users_schema(),
            ..Default::default()
        },
    )]
    #[case::unknown_index_override(
        Query {
            condition: ConditionBuilder::new()
                .attribute("id").eq(json!("1")).unwrap(),
            multiple_read_args: read::common::MultipleReadArgs {
                index_name: Some("Missing".to_string()),
                ..Default::default()
            },
            schema: users_schema(),
            ..Default::default()
        },
    )]
    #[case::override_without_hash_equality(
        Query {
            condition: ConditionBuilder::new()
                .attribute("attr1").ge(json!(5)).unwrap(),
            multiple_read_args: read::common::MultipleReadArgs {
                index_name: Some("HashOnly".to_string()),
                ..Default::default()
            },
            schema: users_schema(),
            ..Default::default()
        },
    )]
    fn test_query_without_usable_index(#[case] args: Query<Value>) {
        let error = QueryInput::try_from(args).unwrap_err();
        assert!(matches!(error, QueryBuildError::NoUsableIndex));
        assert_eq!(error.to_string(), "index can't be found for query");
    }

    #[rstest]
    fn test_filter_placeholders_start_from_zero_next_to_key_placeholders() {
        let query = Query {
            condition: ConditionBuilder::new()
                .attribute("id")
                .eq(json!("1"))
                .unwrap()
                .attribute("a")
                .eq(json!(1))
                .unwrap()
                .attribute("b")
                .eq(json!(2))
                .unwrap(),
            schema: index::TableSchema {
                table_key: index::TableKey {
                    hash_key: "id".to_string(),
                    range_key: None,
                },
                ..Default::default()
            },
            ..Default::default()
        };
        let input: QueryInput = query.try_into().unwrap();
        assert_eq!(input.key_condition_expression, "#qha = :qhv");
        assert_eq!(
            input.multiple_read_operation.filter_expression.as_deref(),
            Some("#a0 = :v0 AND #a1 = :v1")
        );
    }
}
