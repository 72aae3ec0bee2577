use crate::common::condition::ConditionError;
use crate::write;

use aws_sdk_dynamodb::{Client, error, operation, types};
use serde::Serialize;
use serde_dynamo::to_item;
use std::collections;

/// put item operation
#[derive(Debug, PartialEq)]
struct PutItemInput {
    item: collections::HashMap<String, types::AttributeValue>,
    write_operation: write::common::WriteInput,
}

/// Put item operation.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_model::common::condition::ConditionBuilder;
/// use dynamodb_model::write;
/// use serde_json::json;
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let put_item = write::put_item::PutItem {
///     item: json!({"id": "1", "name": "John"}),
///     write_args: write::common::WriteArgs {
///         // only insert, never overwrite
///         condition: Some(ConditionBuilder::new().attribute("id").not().exists()?),
///         table_name: "users".to_string(),
///         ..Default::default()
///     },
/// };
/// put_item.send(client).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, PartialEq)]
pub struct PutItem<T> {
    /// The item to put into the table.
    pub item: T,
    /// Additional write operation arguments (table name, condition, return
    /// values, etc.).
    pub write_args: write::common::WriteArgs<T>,
}

impl<T: Serialize> TryFrom<PutItem<T>> for PutItemInput {
    type Error = ConditionError;

    fn try_from(put_item: PutItem<T>) -> Result<Self, ConditionError> {
        let item = to_item(put_item.item)?;
        let write_operation: write::common::WriteInput = put_item.write_args.try_into()?;
        let operation = Self {
            item,
            write_operation,
        };
        Ok(operation)
    }
}

impl<T: Serialize> PutItem<T> {
    /// Execute the put item operation.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_model.put_item", skip_all, err)
    )]
    pub async fn send(
        self,
        client: &Client,
    ) -> Result<
        operation::put_item::PutItemOutput,
        error::SdkError<operation::put_item::PutItemError>,
    > {
        let put_item: PutItemInput = self.try_into().map_err(error::BuildError::other)?;
        let builder = client.put_item().set_item(Some(put_item.item));
        crate::apply_write_operation!(builder, put_item.write_operation)
            .send()
            .await
    }
}
