use std::fmt;

/// A comparison operation as named in the public condition API.
///
/// Each comparator has a wire-protocol counterpart ([`WireComparator`]) and,
/// for most of them, a negated wire counterpart reached through
/// [`ConditionBuilder::not`](crate::common::condition::ConditionBuilder::not).
///
/// ```rust
/// use dynamodb_model::common::comparator::{Comparator, WireComparator};
///
/// assert_eq!(Comparator::Eq.wire(), WireComparator::Eq);
/// assert_eq!(Comparator::Eq.negated(), Some(WireComparator::Ne));
/// assert_eq!(Comparator::Between.negated(), None);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Comparator {
    /// Equality.
    Eq,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// String prefix match.
    BeginsWith,
    /// Substring or set membership match.
    Contains,
    /// Attribute presence.
    Exists,
    /// Membership in a list of candidate values.
    In,
    /// Inclusive range match.
    Between,
}

impl Comparator {
    /// The comparator's public name, as accepted in structured filter input.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::BeginsWith => "beginsWith",
            Self::Contains => "contains",
            Self::Exists => "exists",
            Self::In => "in",
            Self::Between => "between",
        }
    }

    /// Look a comparator up by its public name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "eq" => Some(Self::Eq),
            "lt" => Some(Self::Lt),
            "le" => Some(Self::Le),
            "gt" => Some(Self::Gt),
            "ge" => Some(Self::Ge),
            "beginsWith" => Some(Self::BeginsWith),
            "contains" => Some(Self::Contains),
            "exists" => Some(Self::Exists),
            "in" => Some(Self::In),
            "between" => Some(Self::Between),
            _ => None,
        }
    }

    /// The wire-protocol comparator this resolves to without negation.
    pub fn wire(&self) -> WireComparator {
        match self {
            Self::Eq => WireComparator::Eq,
            Self::Lt => WireComparator::Lt,
            Self::Le => WireComparator::Le,
            Self::Gt => WireComparator::Gt,
            Self::Ge => WireComparator::Ge,
            Self::BeginsWith => WireComparator::BeginsWith,
            Self::Contains => WireComparator::Contains,
            Self::Exists => WireComparator::Exists,
            Self::In => WireComparator::In,
            Self::Between => WireComparator::Between,
        }
    }

    /// The wire-protocol comparator this resolves to under negation, or
    /// `None` for the comparators with no negated counterpart
    /// (`beginsWith`, `in`, `between`).
    pub fn negated(&self) -> Option<WireComparator> {
        match self {
            Self::Eq => Some(WireComparator::Ne),
            Self::Lt => Some(WireComparator::Ge),
            Self::Le => Some(WireComparator::Gt),
            Self::Gt => Some(WireComparator::Le),
            Self::Ge => Some(WireComparator::Lt),
            Self::Contains => Some(WireComparator::NotContains),
            Self::Exists => Some(WireComparator::NotExists),
            Self::BeginsWith | Self::In | Self::Between => None,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// A comparison operation as spelled in the wire protocol.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum WireComparator {
    /// `EQ`
    Eq,
    /// `NE`
    Ne,
    /// `LT`
    Lt,
    /// `LE`
    Le,
    /// `GT`
    Gt,
    /// `GE`
    Ge,
    /// `BEGINS_WITH`
    BeginsWith,
    /// `CONTAINS`
    Contains,
    /// `NOT_CONTAINS`
    NotContains,
    /// `EXISTS`
    Exists,
    /// `NOT_EXISTS`
    NotExists,
    /// `IN`
    In,
    /// `BETWEEN`
    Between,
}

impl WireComparator {
    /// The wire-protocol type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::Lt => "LT",
            Self::Le => "LE",
            Self::Gt => "GT",
            Self::Ge => "GE",
            Self::BeginsWith => "BEGINS_WITH",
            Self::Contains => "CONTAINS",
            Self::NotContains => "NOT_CONTAINS",
            Self::Exists => "EXISTS",
            Self::NotExists => "NOT_EXISTS",
            Self::In => "IN",
            Self::Between => "BETWEEN",
        }
    }
}

impl fmt::Display for WireComparator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::eq(Comparator::Eq, Some(WireComparator::Ne))]
    #[case::lt(Comparator::Lt, Some(WireComparator::Ge))]
    #[case::le(Comparator::Le, Some(WireComparator::Gt))]
    #[case::gt(Comparator::Gt, Some(WireComparator::Le))]
    #[case::ge(Comparator::Ge, Some(WireComparator::Lt))]
    #[case::contains(Comparator::Contains, Some(WireComparator::NotContains))]
    #[case::exists(Comparator::Exists, Some(WireComparator::NotExists))]
    #[case::begins_with(Comparator::BeginsWith, None)]
    #[case::is_in(Comparator::In, None)]
    #[case::between(Comparator::Between, None)]
    fn test_negated(#[case] comparator: Comparator, #[case] expected: Option<WireComparator>) {
        assert_eq!(comparator.negated(), expected);
    }

    #[rstest]
    #[case::eq("eq", Some(Comparator::Eq))]
    #[case::begins_with("beginsWith", Some(Comparator::BeginsWith))]
    #[case::is_in("in", Some(Comparator::In))]
    #[case::wire_spelling_is_not_a_name("EQ", None)]
    #[case::unknown("almost", None)]
    fn test_from_name(#[case] name: &str, #[case] expected: Option<Comparator>) {
        assert_eq!(Comparator::from_name(name), expected);
    }

    #[rstest]
    #[case::eq(Comparator::Eq, "EQ")]
    #[case::begins_with(Comparator::BeginsWith, "BEGINS_WITH")]
    #[case::between(Comparator::Between, "BETWEEN")]
    fn test_wire_spelling(#[case] comparator: Comparator, #[case] expected: &str) {
        assert_eq!(comparator.wire().as_str(), expected);
    }
}
