#![deny(missing_docs)]
#![deny(warnings)]

//! # DynamoDB Model
//!
//! An object-modeling layer for Amazon DynamoDB built around two pieces:
//! a fluent condition builder that serializes into wire-level expressions,
//! and a selector that picks the best index for a query's constraints.
//!
//! ## Overview
//!
//! This library provides a high-level, type-safe API for interacting with
//! DynamoDB that:
//! - Builds condition, filter, and key-condition expressions from chainable
//!   comparisons instead of hand-written expression strings
//! - Numbers attribute-name/value placeholders automatically, including
//!   across a query's shared key-condition/filter namespace
//! - Chooses the table key or the best-matching secondary index for a query
//!   from the constraints alone
//! - Supports Get, Put, Delete, Query, and Scan with pagination handled
//!   automatically
//!
//! ## Quick Example
//!
//! Describe what you want; the crate picks the index and writes the
//! expressions:
//!
//! ```no_run
//! use aws_sdk_dynamodb::Client;
//! use dynamodb_model::common::condition::ConditionBuilder;
//! use dynamodb_model::common::index::TableSchema;
//! use dynamodb_model::read;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let client = Client::from_conf(aws_sdk_dynamodb::config::Config::builder().build());
//! let description = client.describe_table().table_name("users").send().await?;
//! let schema = description
//!     .table()
//!     .map(TableSchema::from_table_description)
//!     .unwrap_or_default();
//!
//! let query = read::query::Query {
//!     // "email = :x AND age >= :y" - if a secondary index is keyed on
//!     // email, it is selected and the age clause becomes the filter
//!     condition: ConditionBuilder::new()
//!         .attribute("email").eq(json!("jane@example.com"))?
//!         .attribute("age").ge(json!(21))?,
//!     multiple_read_args: read::common::MultipleReadArgs {
//!         table_name: "users".to_string(),
//!         ..Default::default()
//!     },
//!     schema,
//!     ..Default::default()
//! };
//! query.send(&client).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mod@common`] - Comparators, the condition builder, index selection,
//!   keys, and projections
//! - [`mod@read`] - Read operations (GetItem, Query, Scan)
//! - [`mod@write`] - Write operations (PutItem, DeleteItem)

/// Comparators, condition building, index selection, keys, and projections.
pub mod common;

/// Read operations for retrieving data from DynamoDB tables.
///
/// This module provides operations for:
/// - Getting individual items by key
/// - Querying items with automatically selected indexes
/// - Scanning entire tables
pub mod read;

/// Write operations for modifying data in DynamoDB tables.
///
/// This module provides operations for:
/// - Putting new items or replacing existing ones
/// - Deleting items by key
///
/// Both accept conditional-write expressions built with the condition
/// builder.
pub mod write;
