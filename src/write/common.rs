use crate::common::condition::{ConditionBuilder, ConditionError, RequestSettings};

use aws_sdk_dynamodb::types;
use serde::Serialize;
use std::collections;

/// Internal representation of write operation parameters: fully resolved
/// expression strings and attribute maps, ready for the DynamoDB API call.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct WriteInput {
    pub(crate) condition_expression: Option<String>,
    pub(crate) expression_attribute_names: Option<collections::HashMap<String, String>>,
    pub(crate) expression_attribute_values:
        Option<collections::HashMap<String, types::AttributeValue>>,
    pub(crate) return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    pub(crate) return_item_collection_metrics: Option<types::ReturnItemCollectionMetrics>,
    pub(crate) return_values: Option<types::ReturnValue>,
    pub(crate) return_values_on_condition_check_failure:
        Option<types::ReturnValuesOnConditionCheckFailure>,
    pub(crate) table_name: String,
}

/// Arguments common to all write operations (Put, Delete).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteArgs<T> {
    /// Condition that must hold for the operation to succeed, serialized as
    /// the request's `ConditionExpression`.
    pub condition: Option<ConditionBuilder<T>>,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    /// Whether to return item collection metrics.
    pub return_item_collection_metrics: Option<types::ReturnItemCollectionMetrics>,
    /// Which item attributes to return in the response.
    pub return_values: Option<types::ReturnValue>,
    /// Which item attributes to return if the condition check fails.
    pub return_values_on_condition_check_failure:
        Option<types::ReturnValuesOnConditionCheckFailure>,
    /// The name of the table to write to.
    pub table_name: String,
}

impl<T: Serialize> TryFrom<WriteArgs<T>> for WriteInput {
    type Error = ConditionError;

    fn try_from(write_args: WriteArgs<T>) -> Result<Self, ConditionError> {
        let mut condition_expression = None;
        let mut expression_attribute_names = None;
        let mut expression_attribute_values = None;
        if let Some(condition) = write_args.condition {
            let mut placeholder_index = 0;
            if let Some(condition_input) =
                condition.request_object(&RequestSettings::default(), &mut placeholder_index)?
            {
                condition_expression = Some(condition_input.merge_into(
                    &mut expression_attribute_names,
                    &mut expression_attribute_values,
                ));
            }
        }
        let operation = Self {
            condition_expression,
            expression_attribute_names,
            expression_attribute_values,
            return_consumed_capacity: write_args.return_consumed_capacity,
            return_item_collection_metrics: write_args.return_item_collection_metrics,
            return_values: write_args.return_values,
            return_values_on_condition_check_failure: write_args
                .return_values_on_condition_check_failure,
            table_name: write_args.table_name,
        };
        Ok(operation)
    }
}

/// apply common write operation settings to a builder
#[macro_export]
macro_rules! apply_write_operation {
    ($builder:expr, $write_operation:expr) => {
        $builder
            .set_condition_expression($write_operation.condition_expression)
            .set_expression_attribute_names($write_operation.expression_attribute_names)
            .set_expression_attribute_values($write_operation.expression_attribute_values)
            .set_return_consumed_capacity($write_operation.return_consumed_capacity)
            .set_return_item_collection_metrics($write_operation.return_item_collection_metrics)
            .set_return_values($write_operation.return_values)
            .set_return_values_on_condition_check_failure(
                $write_operation.return_values_on_condition_check_failure,
            )
            .table_name($write_operation.table_name)
    };
}
