//! Addresses of locations inside a filter expression tree.
//!
//! A path is the sequence of wire keys and list indices that leads from the
//! root to a location, e.g. `andGroup.expressions.1.filter`.
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::core::types::GroupKind;

/// Wire keys that may appear in a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PathKey {
    Filter,
    AndGroup,
    OrGroup,
    NotExpression,
    Expressions,
}

impl PathKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::AndGroup => "andGroup",
            Self::OrGroup => "orGroup",
            Self::NotExpression => "notExpression",
            Self::Expressions => "expressions",
        }
    }

    /// True for the keys that name a node's tag
    pub fn is_tag(&self) -> bool {
        !matches!(self, Self::Expressions)
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PathKey {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "filter" => Ok(Self::Filter),
            "andGroup" => Ok(Self::AndGroup),
            "orGroup" => Ok(Self::OrGroup),
            "notExpression" => Ok(Self::NotExpression),
            "expressions" => Ok(Self::Expressions),
            other => Err(PathError::UnknownSegment(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(PathKey),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{key}"),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Errors raised when a path does not fit the tree it is applied to
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("unknown path segment `{0}`")]
    UnknownSegment(String),
    #[error("path `{path}` is malformed at segment {position}: {reason}")]
    Malformed {
        path: ExpressionPath,
        position: usize,
        reason: &'static str,
    },
    #[error("path `{path}` expects `{expected}` at segment {position} but the node there is `{found}`")]
    TagMismatch {
        path: ExpressionPath,
        position: usize,
        expected: PathKey,
        found: &'static str,
    },
    #[error("path `{path}` indexes {index} at segment {position} but the list has {len} expressions")]
    IndexOutOfRange {
        path: ExpressionPath,
        position: usize,
        index: usize,
        len: usize,
    },
}

/// One hop from an expression node to a child expression node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Step {
    /// Index of the first path segment of this hop
    pub position: usize,
    pub kind: StepKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepKind {
    /// `notExpression`
    Operand,
    /// `andGroup|orGroup`, `expressions`, index
    Member { group: GroupKind, index: usize },
}

impl StepKind {
    /// Tag the parent node must carry for this hop
    pub fn parent_key(&self) -> PathKey {
        match self {
            Self::Operand => PathKey::NotExpression,
            Self::Member { group: GroupKind::And, .. } => PathKey::AndGroup,
            Self::Member { group: GroupKind::Or, .. } => PathKey::OrGroup,
        }
    }
}

/// Ordered segments from the root to a location in the tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "RawPath")]
pub struct ExpressionPath(Vec<PathSegment>);

impl ExpressionPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// Builder: append a key
    pub fn key(mut self, key: PathKey) -> Self {
        self.0.push(PathSegment::Key(key));
        self
    }

    /// Builder: append an index
    pub fn index(mut self, index: usize) -> Self {
        self.0.push(PathSegment::Index(index));
        self
    }

    /// Builder: append `andGroup|orGroup`, `expressions`, `index`
    pub fn member(self, group: GroupKind, index: usize) -> Self {
        let key = match group {
            GroupKind::And => PathKey::AndGroup,
            GroupKind::Or => PathKey::OrGroup,
        };
        self.key(key).key(PathKey::Expressions).index(index)
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.0.pop()
    }

    pub fn truncate_to(&mut self, len: usize) {
        self.0.truncate(len);
    }

    fn malformed(&self, position: usize, reason: &'static str) -> PathError {
        PathError::Malformed { path: self.clone(), position, reason }
    }

    /// Split the first `end` segments into node-to-node hops.
    ///
    /// Only the grammar is checked here; whether each hop matches the tag of
    /// the node it lands on is decided while walking the tree.
    pub(crate) fn steps_until(&self, end: usize) -> Result<Vec<Step>, PathError> {
        let segments = &self.0[..end.min(self.0.len())];
        let mut steps = Vec::new();
        let mut position = 0;
        while position < segments.len() {
            match segments[position] {
                PathSegment::Key(PathKey::NotExpression) => {
                    steps.push(Step { position, kind: StepKind::Operand });
                    position += 1;
                }
                PathSegment::Key(key @ (PathKey::AndGroup | PathKey::OrGroup)) => {
                    if segments.get(position + 1) != Some(&PathSegment::Key(PathKey::Expressions)) {
                        return Err(self.malformed(position + 1, "a group key must be followed by `expressions`"));
                    }
                    let Some(PathSegment::Index(index)) = segments.get(position + 2) else {
                        return Err(self.malformed(position + 2, "`expressions` must be followed by an index"));
                    };
                    let group = if key == PathKey::AndGroup { GroupKind::And } else { GroupKind::Or };
                    steps.push(Step { position, kind: StepKind::Member { group, index: *index } });
                    position += 3;
                }
                PathSegment::Key(PathKey::Filter) => {
                    return Err(self.malformed(position, "a leaf filter has no child expressions"));
                }
                PathSegment::Key(PathKey::Expressions) => {
                    return Err(self.malformed(position, "`expressions` must follow a group key"));
                }
                PathSegment::Index(_) => {
                    return Err(self.malformed(position, "an index must follow `expressions`"));
                }
            }
        }
        Ok(steps)
    }
}

impl fmt::Display for ExpressionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl FromStr for ExpressionPath {
    type Err = PathError;

    /// Parse a dotted path such as `andGroup.expressions.0.filter`; the empty
    /// string is the root.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        trimmed
            .split('.')
            .map(|part| match part.parse::<usize>() {
                Ok(index) => Ok(PathSegment::Index(index)),
                Err(_) => part.parse::<PathKey>().map(PathSegment::Key),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl From<Vec<PathSegment>> for ExpressionPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl Serialize for ExpressionPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPath {
    Segments(Vec<PathSegment>),
    Dotted(String),
}

impl TryFrom<RawPath> for ExpressionPath {
    type Error = PathError;

    fn try_from(raw: RawPath) -> Result<Self, Self::Error> {
        match raw {
            RawPath::Segments(segments) => Ok(Self(segments)),
            RawPath::Dotted(text) => text.parse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn path(s: &str) -> ExpressionPath {
        s.parse().unwrap()
    }

    #[test]
    fn dotted_and_array_forms_agree() {
        let from_json: ExpressionPath = serde_json::from_str(r#"["andGroup", "expressions", 2, "filter"]"#).unwrap();
        let from_text: ExpressionPath = serde_json::from_str(r#""andGroup.expressions.2.filter""#).unwrap();
        let built = ExpressionPath::root().member(GroupKind::And, 2).key(PathKey::Filter);
        assert_eq!(from_json, built);
        assert_eq!(from_text, built);
        assert_eq!(built.to_string(), "andGroup.expressions.2.filter");
        assert_eq!(serde_json::to_value(&built).unwrap(), serde_json::json!(["andGroup", "expressions", 2, "filter"]));
    }

    #[test]
    fn empty_text_is_root() {
        assert!(path("").is_empty());
        assert!(path("  ").is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert_eq!(
            "andGroup.children".parse::<ExpressionPath>(),
            Err(PathError::UnknownSegment("children".to_string()))
        );
    }

    #[test]
    fn steps_follow_groups_and_negations() {
        let p = path("notExpression.orGroup.expressions.3.notExpression");
        let steps = p.steps_until(p.len()).unwrap();
        assert_eq!(
            steps,
            vec![
                Step { position: 0, kind: StepKind::Operand },
                Step { position: 1, kind: StepKind::Member { group: GroupKind::Or, index: 3 } },
                Step { position: 4, kind: StepKind::Operand },
            ]
        );
    }

    #[test]
    fn steps_reject_truncated_groups() {
        let p = path("andGroup.expressions");
        match p.steps_until(p.len()) {
            Err(PathError::Malformed { position, .. }) => assert_eq!(position, 2),
            other => panic!("unexpected {other:?}"),
        }

        let p = path("filter.notExpression");
        assert!(matches!(p.steps_until(p.len()), Err(PathError::Malformed { position: 0, .. })));

        let p = path("0");
        assert!(matches!(p.steps_until(p.len()), Err(PathError::Malformed { position: 0, .. })));
    }
}
