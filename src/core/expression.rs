//! The filter expression tree and its reporting-API wire shape.
//!
//! On the wire a node is an object with at most one of `filter`, `andGroup`,
//! `orGroup` or `notExpression` set, and a leaf has at most one payload. Here
//! both are enums, so a node with two tags cannot be built; decoding such JSON
//! fails instead.
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;

use crate::core::path::{ExpressionPath, PathKey, PathSegment};
use crate::core::types::{ExpressionKind, FilterKindTag, MatchType, NumericOperation};

/// Failures while decoding the wire shape
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("`{0}` and `{1}` are mutually exclusive")]
    ConflictingMembers(&'static str, &'static str),
}

/// Integral values keep their decimal text so large int64 values are not
/// rounded through a double.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum NumericValue {
    #[default]
    Unset,
    Int64(String),
    Double(f64),
}

impl NumericValue {
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }
}

impl Serialize for NumericValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Self::Unset => {}
            Self::Int64(text) => map.serialize_entry("int64Value", text)?,
            Self::Double(value) => map.serialize_entry("doubleValue", value)?,
        }
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNumericValue {
    int64_value: Option<String>,
    double_value: Option<f64>,
}

impl TryFrom<RawNumericValue> for NumericValue {
    type Error = WireError;

    fn try_from(raw: RawNumericValue) -> Result<Self, Self::Error> {
        match (raw.int64_value, raw.double_value) {
            (Some(_), Some(_)) => Err(WireError::ConflictingMembers("int64Value", "doubleValue")),
            (Some(text), None) => Ok(Self::Int64(text)),
            (None, Some(value)) => Ok(Self::Double(value)),
            (None, None) => Ok(Self::Unset),
        }
    }
}

impl<'de> Deserialize<'de> for NumericValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawNumericValue::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StringFilter {
    pub match_type: MatchType,
    pub value: String,
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NumericFilter {
    pub operation: NumericOperation,
    pub value: NumericValue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InListFilter {
    pub values: Vec<String>,
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BetweenFilter {
    pub from_value: NumericValue,
    pub to_value: NumericValue,
}

/// The payload of a leaf filter
#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    String(StringFilter),
    Numeric(NumericFilter),
    InList(InListFilter),
    Between(BetweenFilter),
}

impl FilterKind {
    /// A payload of the given kind with the picker defaults applied
    pub fn fresh(tag: FilterKindTag) -> Self {
        match tag {
            FilterKindTag::String => Self::String(StringFilter { match_type: MatchType::Exact, ..Default::default() }),
            FilterKindTag::Numeric => Self::Numeric(NumericFilter { operation: NumericOperation::Equal, ..Default::default() }),
            FilterKindTag::InList => Self::InList(InListFilter::default()),
            FilterKindTag::Between => Self::Between(BetweenFilter::default()),
        }
    }

    pub fn tag(&self) -> FilterKindTag {
        match self {
            Self::String(_) => FilterKindTag::String,
            Self::Numeric(_) => FilterKindTag::Numeric,
            Self::InList(_) => FilterKindTag::InList,
            Self::Between(_) => FilterKindTag::Between,
        }
    }
}

/// A condition on one dimension or metric
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "RawLeafFilter")]
pub struct LeafFilter {
    pub field_name: Option<String>,
    pub kind: Option<FilterKind>,
}

impl LeafFilter {
    pub fn named(field_name: impl Into<String>) -> Self {
        Self { field_name: Some(field_name.into()), kind: None }
    }

    pub fn with_kind(mut self, kind: FilterKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn kind_tag(&self) -> Option<FilterKindTag> {
        self.kind.as_ref().map(FilterKind::tag)
    }
}

impl Serialize for LeafFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(name) = &self.field_name {
            map.serialize_entry("fieldName", name)?;
        }
        match &self.kind {
            Some(FilterKind::String(f)) => map.serialize_entry("stringFilter", f)?,
            Some(FilterKind::Numeric(f)) => map.serialize_entry("numericFilter", f)?,
            Some(FilterKind::InList(f)) => map.serialize_entry("inListFilter", f)?,
            Some(FilterKind::Between(f)) => map.serialize_entry("betweenFilter", f)?,
            None => {}
        }
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLeafFilter {
    field_name: Option<String>,
    string_filter: Option<StringFilter>,
    numeric_filter: Option<NumericFilter>,
    in_list_filter: Option<InListFilter>,
    between_filter: Option<BetweenFilter>,
}

impl TryFrom<RawLeafFilter> for LeafFilter {
    type Error = WireError;

    fn try_from(raw: RawLeafFilter) -> Result<Self, Self::Error> {
        let mut kinds = Vec::with_capacity(1);
        if let Some(f) = raw.string_filter {
            kinds.push(FilterKind::String(f));
        }
        if let Some(f) = raw.numeric_filter {
            kinds.push(FilterKind::Numeric(f));
        }
        if let Some(f) = raw.in_list_filter {
            kinds.push(FilterKind::InList(f));
        }
        if let Some(f) = raw.between_filter {
            kinds.push(FilterKind::Between(f));
        }
        if kinds.len() > 1 {
            return Err(WireError::ConflictingMembers(kinds[0].tag().wire_key(), kinds[1].tag().wire_key()));
        }
        Ok(Self { field_name: raw.field_name, kind: kinds.pop() })
    }
}

/// Operands of an AND or OR group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterExpressionList {
    #[serde(default)]
    pub expressions: Vec<Arc<FilterExpression>>,
}

impl FilterExpressionList {
    pub fn new(expressions: impl IntoIterator<Item = FilterExpression>) -> Self {
        Self { expressions: expressions.into_iter().map(Arc::new).collect() }
    }

    fn collect_leaves<'a>(
        &'a self,
        group: PathKey,
        path: &mut ExpressionPath,
        out: &mut Vec<(ExpressionPath, &'a LeafFilter)>,
    ) {
        for (i, child) in self.expressions.iter().enumerate() {
            path.push(PathSegment::Key(group));
            path.push(PathSegment::Key(PathKey::Expressions));
            path.push(PathSegment::Index(i));
            child.collect_leaves(path, out);
            path.truncate_to(path.len() - 3);
        }
    }
}

/// A node of the filter tree.
///
/// Children sit behind `Arc` so an edit copies only the nodes between the
/// root and the edited location.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "RawExpression")]
pub enum FilterExpression {
    /// Nothing configured yet, `{}` on the wire
    #[default]
    Empty,
    Filter(LeafFilter),
    AndGroup(FilterExpressionList),
    OrGroup(FilterExpressionList),
    NotExpression(Arc<FilterExpression>),
}

impl FilterExpression {
    /// The subtree `add_expression` attaches for `kind`
    pub fn blank(kind: ExpressionKind) -> Self {
        match kind {
            ExpressionKind::Filter => Self::Filter(LeafFilter::default()),
            ExpressionKind::Not => Self::NotExpression(Arc::new(Self::Empty)),
            ExpressionKind::And => Self::AndGroup(FilterExpressionList::default()),
            ExpressionKind::Or => Self::OrGroup(FilterExpressionList::default()),
        }
    }

    pub fn leaf(filter: LeafFilter) -> Self {
        Self::Filter(filter)
    }

    pub fn and(expressions: impl IntoIterator<Item = FilterExpression>) -> Self {
        Self::AndGroup(FilterExpressionList::new(expressions))
    }

    pub fn or(expressions: impl IntoIterator<Item = FilterExpression>) -> Self {
        Self::OrGroup(FilterExpressionList::new(expressions))
    }

    pub fn not(operand: FilterExpression) -> Self {
        Self::NotExpression(Arc::new(operand))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The wire key of this node's tag, `None` for the placeholder
    pub fn tag(&self) -> Option<PathKey> {
        match self {
            Self::Empty => None,
            Self::Filter(_) => Some(PathKey::Filter),
            Self::AndGroup(_) => Some(PathKey::AndGroup),
            Self::OrGroup(_) => Some(PathKey::OrGroup),
            Self::NotExpression(_) => Some(PathKey::NotExpression),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        self.tag().map(|key| key.as_str()).unwrap_or("empty")
    }

    pub fn as_leaf(&self) -> Option<&LeafFilter> {
        match self {
            Self::Filter(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// Every leaf filter with the path `update_filter` would use to reach it
    pub fn leaves(&self) -> Vec<(ExpressionPath, &LeafFilter)> {
        let mut out = Vec::new();
        self.collect_leaves(&mut ExpressionPath::root(), &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, path: &mut ExpressionPath, out: &mut Vec<(ExpressionPath, &'a LeafFilter)>) {
        match self {
            Self::Empty => {}
            Self::Filter(leaf) => {
                let mut leaf_path = path.clone();
                leaf_path.push(PathSegment::Key(PathKey::Filter));
                out.push((leaf_path, leaf));
            }
            Self::AndGroup(list) => list.collect_leaves(PathKey::AndGroup, path, out),
            Self::OrGroup(list) => list.collect_leaves(PathKey::OrGroup, path, out),
            Self::NotExpression(operand) => {
                path.push(PathSegment::Key(PathKey::NotExpression));
                operand.collect_leaves(path, out);
                path.pop();
            }
        }
    }
}

impl Serialize for FilterExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Self::Empty => {}
            Self::Filter(leaf) => map.serialize_entry("filter", leaf)?,
            Self::AndGroup(list) => map.serialize_entry("andGroup", list)?,
            Self::OrGroup(list) => map.serialize_entry("orGroup", list)?,
            Self::NotExpression(operand) => map.serialize_entry("notExpression", operand.as_ref())?,
        }
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExpression {
    filter: Option<LeafFilter>,
    and_group: Option<FilterExpressionList>,
    or_group: Option<FilterExpressionList>,
    not_expression: Option<FilterExpression>,
}

impl TryFrom<RawExpression> for FilterExpression {
    type Error = WireError;

    fn try_from(raw: RawExpression) -> Result<Self, Self::Error> {
        let mut nodes = Vec::with_capacity(1);
        if let Some(leaf) = raw.filter {
            nodes.push(Self::Filter(leaf));
        }
        if let Some(list) = raw.and_group {
            nodes.push(Self::AndGroup(list));
        }
        if let Some(list) = raw.or_group {
            nodes.push(Self::OrGroup(list));
        }
        if let Some(operand) = raw.not_expression {
            nodes.push(Self::NotExpression(Arc::new(operand)));
        }
        if nodes.len() > 1 {
            return Err(WireError::ConflictingMembers(nodes[0].kind_name(), nodes[1].kind_name()));
        }
        Ok(nodes.pop().unwrap_or_default())
    }
}
