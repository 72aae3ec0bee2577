use crate::common::comparator::WireComparator;

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;

/// A table's own primary key: the hash key name and, for composite keys, the
/// range key name.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TableKey {
    /// The hash (partition) key attribute name.
    pub hash_key: String,
    /// The range (sort) key attribute name, if the key is composite.
    pub range_key: Option<String>,
}

/// A global or local secondary index, reduced to the names that matter for
/// index selection.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SecondaryIndex {
    /// The index's hash key attribute name.
    pub hash_key: String,
    /// The index name, as passed in a request's `IndexName`.
    pub name: String,
    /// The index's range key attribute name, if any.
    pub range_key: Option<String>,
}

/// A read-only snapshot of a table's key schema and secondary indexes.
///
/// The selector never mutates it; one snapshot can back any number of
/// selection calls.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TableSchema {
    /// Global secondary indexes, in declaration order.
    pub global_secondary_indexes: Vec<SecondaryIndex>,
    /// Local secondary indexes, in declaration order.
    pub local_secondary_indexes: Vec<SecondaryIndex>,
    /// The table's own primary key.
    pub table_key: TableKey,
}

impl TableSchema {
    /// Extract the key schema and index descriptors from a DescribeTable
    /// response.
    pub fn from_table_description(description: &types::TableDescription) -> Self {
        let table_key = extract_table_key(description.key_schema());
        let global_secondary_indexes = description
            .global_secondary_indexes()
            .iter()
            .map(|index| {
                let key = extract_table_key(index.key_schema());
                SecondaryIndex {
                    hash_key: key.hash_key,
                    name: index.index_name().unwrap_or_default().to_string(),
                    range_key: key.range_key,
                }
            })
            .collect();
        let local_secondary_indexes = description
            .local_secondary_indexes()
            .iter()
            .map(|index| {
                let key = extract_table_key(index.key_schema());
                SecondaryIndex {
                    hash_key: key.hash_key,
                    name: index.index_name().unwrap_or_default().to_string(),
                    range_key: key.range_key,
                }
            })
            .collect();
        Self {
            global_secondary_indexes,
            local_secondary_indexes,
            table_key,
        }
    }

    /// Find a secondary index by name, searching global then local indexes.
    pub fn secondary_index(&self, name: &str) -> Option<&SecondaryIndex> {
        self.global_secondary_indexes
            .iter()
            .chain(&self.local_secondary_indexes)
            .find(|index| index.name == name)
    }
}

fn extract_table_key(schema: &[types::KeySchemaElement]) -> TableKey {
    let mut hash_key = String::new();
    let mut range_key = None;
    for element in schema {
        match element.key_type {
            types::KeyType::Hash => hash_key = element.attribute_name.clone(),
            types::KeyType::Range => range_key = Some(element.attribute_name.clone()),
            _ => {}
        }
    }
    TableKey {
        hash_key,
        range_key,
    }
}

/// The outcome of index selection.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IndexDecision {
    /// The chosen secondary index, if one was selected.
    pub index_name: Option<String>,
    /// Whether the table's own primary key satisfies the query.
    pub table_index: bool,
}

/// Pick the table key or the secondary index that best satisfies a set of
/// attribute constraints.
///
/// A candidate is usable only when the constraint map holds an `EQ`
/// constraint on its hash key; any other comparator on the hash key excludes
/// the candidate entirely. Usable candidates score 1 when they declare a
/// range key that is constrained with any comparator, 0 otherwise. A strictly
/// higher score wins; ties go to the first-declared candidate, with the table
/// key considered before the global and then the local secondary indexes.
/// Constraints on attributes that are no candidate's key are ignored.
///
/// When nothing is usable, the decision is
/// `{ table_index: false, index_name: None }`; translating that into a
/// "no index found" failure is the caller's concern.
///
/// ```rust
/// use dynamodb_model::common::comparator::WireComparator;
/// use dynamodb_model::common::index::{SecondaryIndex, TableKey, TableSchema, select_index};
/// use indexmap::IndexMap;
///
/// let schema = TableSchema {
///     global_secondary_indexes: vec![SecondaryIndex {
///         hash_key: "email".to_string(),
///         name: "ByEmail".to_string(),
///         range_key: None,
///     }],
///     table_key: TableKey {
///         hash_key: "id".to_string(),
///         range_key: None,
///     },
///     ..Default::default()
/// };
/// let constraints = IndexMap::from([("email".to_string(), WireComparator::Eq)]);
/// let decision = select_index(&schema, &constraints);
/// assert_eq!(decision.index_name.as_deref(), Some("ByEmail"));
/// assert!(!decision.table_index);
/// ```
pub fn select_index(
    schema: &TableSchema,
    constraints: &IndexMap<String, WireComparator>,
) -> IndexDecision {
    struct Candidate<'schema> {
        name: Option<&'schema str>,
        hash_key: &'schema str,
        range_key: Option<&'schema str>,
    }
    let table = Candidate {
        name: None,
        hash_key: &schema.table_key.hash_key,
        range_key: schema.table_key.range_key.as_deref(),
    };
    let secondary = schema
        .global_secondary_indexes
        .iter()
        .chain(&schema.local_secondary_indexes)
        .map(|index| Candidate {
            name: Some(&index.name),
            hash_key: &index.hash_key,
            range_key: index.range_key.as_deref(),
        });
    let mut best: Option<(usize, Candidate)> = None;
    for candidate in std::iter::once(table).chain(secondary) {
        if constraints.get(candidate.hash_key) != Some(&WireComparator::Eq) {
            continue;
        }
        let score = usize::from(
            candidate
                .range_key
                .is_some_and(|range_key| constraints.contains_key(range_key)),
        );
        if best.as_ref().is_none_or(|(best_score, _)| score > *best_score) {
            best = Some((score, candidate));
        }
    }
    match best {
        Some((_, candidate)) => IndexDecision {
            index_name: candidate.name.map(str::to_string),
            table_index: candidate.name.is_none(),
        },
        None => IndexDecision {
            index_name: None,
            table_index: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    fn secondary(name: &str, hash_key: &str, range_key: Option<&str>) -> SecondaryIndex {
        SecondaryIndex {
            hash_key: hash_key.to_string(),
            name: name.to_string(),
            range_key: range_key.map(str::to_string),
        }
    }

    fn single_gsi_schema() -> TableSchema {
        TableSchema {
            global_secondary_indexes: vec![secondary("MyGSI1", "attr1", None)],
            table_key: TableKey {
                hash_key: "tableHashKey".to_string(),
                range_key: None,
            },
            ..Default::default()
        }
    }

    fn ranged_gsi_schema() -> TableSchema {
        TableSchema {
            global_secondary_indexes: vec![
                secondary("HashOnly", "attr1", None),
                secondary("RangedOnAttr2", "attr1", Some("attr2")),
                secondary("RangedOnAttr3", "attr1", Some("attr3")),
            ],
            table_key: TableKey {
                hash_key: "tableHashKey".to_string(),
                range_key: None,
            },
            ..Default::default()
        }
    }

    #[rstest]
    #[case::gsi_satisfies_hash_equality(
        single_gsi_schema(),
        IndexMap::from([("attr1".to_string(), WireComparator::Eq)]),
        IndexDecision { index_name: Some("MyGSI1".to_string()), table_index: false },
    )]
    #[case::non_equality_hash_constraint_is_unusable(
        single_gsi_schema(),
        IndexMap::from([("attr1".to_string(), WireComparator::Ge)]),
        IndexDecision { index_name: None, table_index: false },
    )]
    #[case::table_key_wins_the_tie_with_an_equally_scored_gsi(
        single_gsi_schema(),
        IndexMap::from([
            ("attr1".to_string(), WireComparator::Eq),
            ("tableHashKey".to_string(), WireComparator::Eq),
        ]),
        IndexDecision { index_name: None, table_index: true },
    )]
    #[case::constrained_range_key_beats_hash_only_matches(
        ranged_gsi_schema(),
        IndexMap::from([
            ("attr1".to_string(), WireComparator::Eq),
            ("attr2".to_string(), WireComparator::Ge),
        ]),
        IndexDecision { index_name: Some("RangedOnAttr2".to_string()), table_index: false },
    )]
    #[case::first_declared_wins_among_equal_scores(
        ranged_gsi_schema(),
        IndexMap::from([("attr1".to_string(), WireComparator::Eq)]),
        IndexDecision { index_name: Some("HashOnly".to_string()), table_index: false },
    )]
    #[case::no_candidate_at_all(
        single_gsi_schema(),
        IndexMap::from([("unindexed".to_string(), WireComparator::Ge)]),
        IndexDecision { index_name: None, table_index: false },
    )]
    #[case::unrelated_constraints_never_disqualify(
        single_gsi_schema(),
        IndexMap::from([
            ("attr1".to_string(), WireComparator::Eq),
            ("unindexed".to_string(), WireComparator::Contains),
        ]),
        IndexDecision { index_name: Some("MyGSI1".to_string()), table_index: false },
    )]
    #[case::range_constrained_gsi_scores_above_the_table_key(
        TableSchema {
            global_secondary_indexes: vec![
                secondary("Ranged", "tableHashKey", Some("attr1")),
            ],
            table_key: TableKey {
                hash_key: "tableHashKey".to_string(),
                range_key: None,
            },
            ..Default::default()
        },
        IndexMap::from([
            ("tableHashKey".to_string(), WireComparator::Eq),
            ("attr1".to_string(), WireComparator::Lt),
        ]),
        IndexDecision { index_name: Some("Ranged".to_string()), table_index: false },
    )]
    #[case::local_index_with_constrained_range_beats_bare_table_match(
        TableSchema {
            local_secondary_indexes: vec![
                secondary("ByDate", "tableHashKey", Some("date")),
            ],
            table_key: TableKey {
                hash_key: "tableHashKey".to_string(),
                range_key: Some("tableRangeKey".to_string()),
            },
            ..Default::default()
        },
        IndexMap::from([
            ("tableHashKey".to_string(), WireComparator::Eq),
            ("date".to_string(), WireComparator::Between),
        ]),
        IndexDecision { index_name: Some("ByDate".to_string()), table_index: false },
    )]
    #[case::table_range_constraint_may_use_any_comparator(
        TableSchema {
            table_key: TableKey {
                hash_key: "tableHashKey".to_string(),
                range_key: Some("tableRangeKey".to_string()),
            },
            ..Default::default()
        },
        IndexMap::from([
            ("tableHashKey".to_string(), WireComparator::Eq),
            ("tableRangeKey".to_string(), WireComparator::BeginsWith),
        ]),
        IndexDecision { index_name: None, table_index: true },
    )]
    fn test_select_index(
        #[case] schema: TableSchema,
        #[case] constraints: IndexMap<String, WireComparator>,
        #[case] expected: IndexDecision,
    ) {
        assert_eq!(select_index(&schema, &constraints), expected);
    }

    #[rstest]
    fn test_from_table_description() {
        let key_element = |name: &str, key_type: types::KeyType| {
            types::KeySchemaElement::builder()
                .attribute_name(name)
                .key_type(key_type)
                .build()
                .unwrap()
        };
        let description = types::TableDescription::builder()
            .key_schema(key_element("id", types::KeyType::Hash))
            .key_schema(key_element("date", types::KeyType::Range))
            .global_secondary_indexes(
                types::GlobalSecondaryIndexDescription::builder()
                    .index_name("ByEmail")
                    .key_schema(key_element("email", types::KeyType::Hash))
                    .build(),
            )
            .local_secondary_indexes(
                types::LocalSecondaryIndexDescription::builder()
                    .index_name("ByScore")
                    .key_schema(key_element("id", types::KeyType::Hash))
                    .key_schema(key_element("score", types::KeyType::Range))
                    .build(),
            )
            .build();
        let schema = TableSchema::from_table_description(&description);
        assert_eq!(
            schema,
            TableSchema {
                global_secondary_indexes: vec![secondary("ByEmail", "email", None)],
                local_secondary_indexes: vec![secondary("ByScore", "id", Some("score"))],
                table_key: TableKey {
                    hash_key: "id".to_string(),
                    range_key: Some("date".to_string()),
                },
            }
        );
        assert_eq!(
            schema.secondary_index("ByScore"),
            Some(&secondary("ByScore", "id", Some("score")))
        );
        assert_eq!(schema.secondary_index("Missing"), None);
    }
}
