//! Read operations for retrieving data from DynamoDB tables.
//!
//! This module provides operations for reading data from DynamoDB:
//! - Getting individual items by primary key
//! - Querying items, with the index chosen automatically from the condition
//! - Scanning entire tables with optional filters

/// Common utilities and types for read operations.
pub mod common;

/// Get item operation for retrieving a single item by primary key.
pub mod get_item;

/// Query operation with automatic secondary-index selection.
pub mod query;

/// Scan operation for retrieving all items from a table.
pub mod scan;
