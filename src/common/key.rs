use aws_sdk_dynamodb::types;
use serde::Serialize;
use serde_dynamo::{Error, Result, to_attribute_value};
use std::collections;

/// One key component: an attribute name and its value.
///
/// ```rust
/// use dynamodb_model::common::key;
///
/// let key = key::Key::new("id", "1");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Key<T> {
    /// The attribute name of the key.
    pub name: String,
    /// The value of the key.
    pub value: T,
}

impl<T> Key<T> {
    /// A key component from an attribute name and value.
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A full item key: the partition key and, for composite-key tables, the
/// sort key.
///
/// ```rust
/// use dynamodb_model::common::key;
///
/// let keys = key::Keys::partition(key::Key::new("id", "1"));
/// let composite = key::Keys::partition(key::Key::new("id", "1"))
///     .with_sort_key(key::Key::new("date", "2024-01-01"));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Keys<T> {
    /// The partition key (required).
    pub partition_key: Key<T>,
    /// The sort key (only for tables with composite primary keys).
    pub sort_key: Option<Key<T>>,
}

impl<T> Keys<T> {
    /// Keys with only a partition key.
    pub fn partition(partition_key: Key<T>) -> Self {
        Self {
            partition_key,
            sort_key: None,
        }
    }

    /// Add the sort key component.
    pub fn with_sort_key(mut self, sort_key: Key<T>) -> Self {
        self.sort_key = Some(sort_key);
        self
    }
}

impl<T: Serialize> TryFrom<Keys<T>> for collections::HashMap<String, types::AttributeValue> {
    type Error = Error;

    fn try_from(keys: Keys<T>) -> Result<Self> {
        let partition_key_value = to_attribute_value(keys.partition_key.value)?;
        let mut wire_keys = Self::from([(keys.partition_key.name, partition_key_value)]);
        if let Some(sort_key) = keys.sort_key {
            let sort_key_value = to_attribute_value(sort_key.value)?;
            wire_keys.insert(sort_key.name, sort_key_value);
        }
        Ok(wire_keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use serde_json::{Value, json};

    #[rstest]
    #[case::partition_only(
        Keys::partition(Key::new("id", json!("user-1"))),
        collections::HashMap::from(
            [(
                "id".to_string(),
                types::AttributeValue::S(
                    "user-1".to_string()
                ),
            )]
        )
    )]
    #[case::numeric_partition(
        Keys::partition(Key::new("id", json!(42))),
        collections::HashMap::from(
            [(
                "id".to_string(),
                types::AttributeValue::N(
                    "42".to_string()
                ),
            )]
        )
    )]
    #[case::composite(
        Keys::partition(Key::new("id", json!("user-1")))
            .with_sort_key(Key::new("date", json!("2024-01-01"))),
        collections::HashMap::from(
            [
                (
                    "id".to_string(),
                    types::AttributeValue::S(
                        "user-1".to_string()
                    )
                ),
                (
                    "date".to_string(),
                    types::AttributeValue::S(
                        "2024-01-01".to_string()
                    )
                ),
            ]
        )
    )]
    #[case::composite_with_numeric_sort_key(
        Keys::partition(Key::new("id", json!("user-1")))
            .with_sort_key(Key::new("version", json!(7))),
        collections::HashMap::from(
            [
                (
                    "id".to_string(),
                    types::AttributeValue::S(
                        "user-1".to_string()
                    )
                ),
                (
                    "version".to_string(),
                    types::AttributeValue::N(
                        "7".to_string()
                    )
                ),
            ]
        )
    )]
    fn test_keys_to_wire_map(
        #[case] keys: Keys<Value>,
        #[case] expected: collections::HashMap<String, types::AttributeValue>,
    ) {
        let actual: collections::HashMap<String, types::AttributeValue> = keys.try_into().unwrap();
        assert_eq!(actual, expected);
    }
}
