use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter, EnumString};

/// How a string filter compares the field value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    #[default]
    Exact,
    BeginsWith,
    EndsWith,
    Contains,
    FullRegexp,
    PartialRegexp,
}

impl MatchType {
    /// Label shown in pickers
    pub fn label(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::BeginsWith => "begins with",
            Self::EndsWith => "ends with",
            Self::Contains => "contains",
            Self::FullRegexp => "regexp",
            Self::PartialRegexp => "partial regexp",
        }
    }
}

/// Comparison operator of a numeric filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NumericOperation {
    #[default]
    Equal,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl NumericOperation {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
        }
    }
}

/// Node kinds that can be added to an expression tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExpressionKind {
    Filter,
    Not,
    And,
    Or,
}

/// Which payload a leaf filter carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FilterKindTag {
    String,
    Numeric,
    InList,
    Between,
}

impl FilterKindTag {
    /// Name of the payload member in the reporting API
    pub fn wire_key(&self) -> &'static str {
        match self {
            Self::String => "stringFilter",
            Self::Numeric => "numericFilter",
            Self::InList => "inListFilter",
            Self::Between => "betweenFilter",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Numeric => "numeric",
            Self::InList => "in list",
            Self::Between => "between",
        }
    }
}

impl fmt::Display for FilterKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Whether a filter targets dimensions or metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FilterType {
    #[default]
    Dimension,
    Metric,
}

impl FilterType {
    /// Payload kinds offered for this filter type
    pub fn allowed_kinds(&self) -> &'static [FilterKindTag] {
        match self {
            Self::Dimension => &[FilterKindTag::String, FilterKindTag::InList],
            Self::Metric => &[FilterKindTag::Numeric, FilterKindTag::Between],
        }
    }

    pub fn allows(&self, kind: FilterKindTag) -> bool {
        self.allowed_kinds().contains(&kind)
    }
}

/// Editing mode of a filter session.
///
/// Simple mode keeps exactly one leaf filter at the root; advanced mode allows
/// arbitrary nesting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FilterMode {
    Simple,
    #[default]
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    And,
    Or,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn dimension_and_metric_kinds_do_not_overlap() {
        for kind in FilterKindTag::iter() {
            assert_ne!(FilterType::Dimension.allows(kind), FilterType::Metric.allows(kind), "{kind}");
        }
    }

    #[test]
    fn enums_parse_from_cli_text() {
        assert_eq!(ExpressionKind::from_str("AND").unwrap(), ExpressionKind::And);
        assert_eq!(FilterKindTag::from_str("in_list").unwrap(), FilterKindTag::InList);
        assert_eq!(FilterMode::from_str("simple").unwrap(), FilterMode::Simple);
        assert_eq!(FilterType::from_str("Metric").unwrap(), FilterType::Metric);
        assert!(ExpressionKind::from_str("xor").is_err());
    }

    #[test]
    fn match_types_use_api_names() {
        assert_eq!(serde_json::to_string(&MatchType::PartialRegexp).unwrap(), "\"PARTIAL_REGEXP\"");
        assert_eq!(MatchType::BeginsWith.to_string(), "BEGINS_WITH");
        assert_eq!(
            serde_json::from_str::<NumericOperation>("\"LESS_THAN_OR_EQUAL\"").unwrap(),
            NumericOperation::LessThanOrEqual
        );
    }
}
