//! Write operations for modifying data in DynamoDB tables.
//!
//! This module provides operations for writing data to DynamoDB:
//! - Putting new items or replacing existing ones
//! - Deleting items by primary key
//!
//! Both operations take an optional condition builder whose clauses are
//! serialized as the request's `ConditionExpression`.

/// Common utilities and types for write operations.
pub mod common;

/// Delete item operation for removing items from tables.
pub mod delete_item;

/// Put item operation for creating or replacing items.
pub mod put_item;
