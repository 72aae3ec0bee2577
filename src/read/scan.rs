use crate::common::condition::{ConditionBuilder, ConditionError, RequestSettings};
use crate::{common, read};

use aws_sdk_dynamodb::{Client, error, operation, types};
use serde::Serialize;

/// scan operation
#[derive(Clone, Debug, Default, PartialEq)]
struct ScanInput {
    multiple_read_operation: read::common::MultipleReadInput,
    return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    segment: Option<i32>,
    total_segments: Option<i32>,
}

/// Scan operation.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_model::common::condition::ConditionBuilder;
/// use dynamodb_model::read;
/// use serde_json::json;
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let scan = read::scan::Scan {
///     filter: Some(ConditionBuilder::new().attribute("age").ge(json!(21))?),
///     multiple_read_args: read::common::MultipleReadArgs {
///         table_name: "users".to_string(),
///         ..Default::default()
///     },
///     ..Default::default()
/// };
/// scan.send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scan<T> {
    /// Optional filter applied to the scanned items.
    pub filter: Option<ConditionBuilder<T>>,
    /// Additional read operation arguments (table name, pagination,
    /// projection, etc.).
    pub multiple_read_args: read::common::MultipleReadArgs<T>,
    /// Whether to return the consumed capacity information.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    /// The segment number for parallel scans (0-indexed).
    pub segment: Option<i32>,
    /// The total number of segments for parallel scans.
    pub total_segments: Option<i32>,
}

impl<T: Serialize> TryFrom<Scan<T>> for ScanInput {
    type Error = ConditionError;

    fn try_from(scan: Scan<T>) -> Result<Self, ConditionError> {
        let mut multiple_read_operation: read::common::MultipleReadInput =
            scan.multiple_read_args.try_into()?;
        if let Some(filter) = scan.filter {
            let filter_settings = RequestSettings {
                kind: common::ExpressionKind::Filter,
                ..RequestSettings::default()
            };
            let mut placeholder_index = 0;
            if let Some(filter_input) =
                filter.request_object(&filter_settings, &mut placeholder_index)?
            {
                multiple_read_operation.filter_expression = Some(filter_input.merge_into(
                    &mut multiple_read_operation.expression_attribute_names,
                    &mut multiple_read_operation.expression_attribute_values,
                ));
            }
        }
        let operation = Self {
            multiple_read_operation,
            return_consumed_capacity: scan.return_consumed_capacity,
            segment: scan.segment,
            total_segments: scan.total_segments,
        };
        Ok(operation)
    }
}

impl<T: Serialize> Scan<T> {
    /// Execute the scan operation.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.scan", skip_all, err)
    )]
    pub async fn send(
        self,
        client: &Client,
    ) -> Result<operation::scan::ScanOutput, error::SdkError<operation::scan::ScanError>> {
        let scan: ScanInput = self.try_into().map_err(error::BuildError::other)?;
        let builder = client
            .scan()
            .set_return_consumed_capacity(scan.return_consumed_capacity)
            .set_segment(scan.segment)
            .set_total_segments(scan.total_segments);
        let mut paginator =
            crate::apply_multiple_read_operation!(builder, scan.multiple_read_operation)
                .into_paginator()
                .send();
        crate::get_paginated_output!(paginator, operation::scan::ScanOutput)
    }
}
