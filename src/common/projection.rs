use crate::common;

use std::collections;

/// Attributes to retrieve, rendered as a projection expression.
///
/// Each entry is an attribute name or a dotted path into a nested attribute;
/// path segments become `#name` placeholders, the same way the condition
/// builder splits dotted paths.
///
/// ```rust
/// use dynamodb_model::common::projection;
///
/// let projection = projection::Projection::new(["id", "address.city"]);
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Projection {
    /// Attribute names or dotted attribute paths.
    pub paths: Vec<String>,
}

impl Projection {
    /// A projection over the given attribute names or dotted paths.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Projection> for common::ExpressionInput {
    fn from(projection: Projection) -> Self {
        let mut names = collections::HashMap::new();
        let mut rendered = Vec::with_capacity(projection.paths.len());
        for path in projection.paths {
            let mut tokens = Vec::new();
            for segment in path.split('.') {
                let token = format!("#{segment}");
                names.insert(token.clone(), segment.to_string());
                tokens.push(token);
            }
            rendered.push(tokens.join("."));
        }
        Self {
            expression: common::Expression::Text(rendered.join(", ")),
            expression_attribute_names: names,
            ..Default::default()
        }
    }
}
