use crate::core::expression::{FilterExpression, FilterKind, LeafFilter, NumericValue};
use crate::core::path::{ExpressionPath, PathKey, PathSegment};
use crate::core::coerce::numeric_value_text;
use crate::core::types::MatchType;

/// One row of a rendered filter tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineLine {
    pub indent: usize,
    pub label: String,
    /// For an `(empty)` row, the slot path `add_expression` fills; for every
    /// other row, the path `remove_expression` deletes the node by
    pub path: ExpressionPath,
}

fn value_or_placeholder(value: &NumericValue) -> String {
    if value.is_unset() { "?".to_string() } else { numeric_value_text(value) }
}

impl LeafFilter {
    /// Format a leaf as a one-line summary
    pub fn summary(&self) -> String {
        let field = self.field_name.as_deref().unwrap_or("(no field)");
        let Some(kind) = &self.kind else {
            return format!("{field} (no condition)");
        };
        match kind {
            FilterKind::String(f) => {
                let cs = if f.case_sensitive { "[Aa]" } else { "[aA]" };
                match f.match_type {
                    MatchType::Exact => format!("{field} = \"{}\" {cs}", f.value),
                    MatchType::BeginsWith => format!("{field} begins with \"{}\" {cs}", f.value),
                    MatchType::EndsWith => format!("{field} ends with \"{}\" {cs}", f.value),
                    MatchType::Contains => format!("{field} contains \"{}\" {cs}", f.value),
                    MatchType::FullRegexp => format!("{field} matches /{}/ {cs}", f.value),
                    MatchType::PartialRegexp => format!("{field} partially matches /{}/ {cs}", f.value),
                }
            }
            FilterKind::Numeric(f) => {
                format!("{field} {} {}", f.operation.symbol(), value_or_placeholder(&f.value))
            }
            FilterKind::InList(f) => {
                let cs = if f.case_sensitive { "[Aa]" } else { "[aA]" };
                let display_values = if f.values.len() > 3 {
                    format!("{}, {}... ({} total)", f.values[0], f.values[1], f.values.len())
                } else {
                    f.values.join(", ")
                };
                format!("{field} in [{display_values}] {cs}")
            }
            FilterKind::Between(f) => format!(
                "{field} between {} and {}",
                value_or_placeholder(&f.from_value),
                value_or_placeholder(&f.to_value)
            ),
        }
    }
}

impl FilterExpression {
    /// Recursively render the tree as indented rows
    pub fn render_lines(&self, path: &mut ExpressionPath, indent: usize, lines: &mut Vec<OutlineLine>) {
        let mut row = |label: String, key: Option<PathKey>| {
            let mut node_path = path.clone();
            if let Some(key) = key {
                node_path.push(PathSegment::Key(key));
            }
            lines.push(OutlineLine { indent, label, path: node_path });
        };
        match self {
            FilterExpression::Empty => row("(empty)".to_string(), None),
            FilterExpression::Filter(leaf) => row(leaf.summary(), Some(PathKey::Filter)),
            FilterExpression::AndGroup(list) | FilterExpression::OrGroup(list) => {
                let key = if matches!(self, FilterExpression::AndGroup(_)) { PathKey::AndGroup } else { PathKey::OrGroup };
                row(if key == PathKey::AndGroup { "AND" } else { "OR" }.to_string(), Some(key));
                for (i, child) in list.expressions.iter().enumerate() {
                    path.push(PathSegment::Key(key));
                    path.push(PathSegment::Key(PathKey::Expressions));
                    path.push(PathSegment::Index(i));
                    child.render_lines(path, indent + 1, lines);
                    path.truncate_to(path.len() - 3);
                }
            }
            FilterExpression::NotExpression(operand) => {
                row("NOT".to_string(), Some(PathKey::NotExpression));
                path.push(PathSegment::Key(PathKey::NotExpression));
                operand.render_lines(path, indent + 1, lines);
                path.pop();
            }
        }
    }

    /// Text outline, two spaces per nesting level
    pub fn outline(&self) -> String {
        let mut lines = Vec::new();
        self.render_lines(&mut ExpressionPath::root(), 0, &mut lines);
        lines
            .iter()
            .map(|line| format!("{}{}", "  ".repeat(line.indent), line.label))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::expression::{BetweenFilter, InListFilter, NumericFilter, StringFilter};
    use crate::core::types::{ExpressionKind, NumericOperation};
    use crate::services::FilterStore;
    use pretty_assertions::assert_eq;

    fn country_us() -> LeafFilter {
        LeafFilter::named("country").with_kind(FilterKind::String(StringFilter {
            match_type: MatchType::Exact,
            value: "US".into(),
            case_sensitive: false,
        }))
    }

    #[test]
    fn leaf_summaries() {
        assert_eq!(country_us().summary(), "country = \"US\" [aA]");
        let sessions = LeafFilter::named("sessions").with_kind(FilterKind::Numeric(NumericFilter {
            operation: NumericOperation::GreaterThanOrEqual,
            value: NumericValue::Int64("10".into()),
        }));
        assert_eq!(sessions.summary(), "sessions >= 10");
        let revenue = LeafFilter::named("revenue").with_kind(FilterKind::Between(BetweenFilter {
            from_value: NumericValue::Int64("1".into()),
            to_value: NumericValue::Double(2.5),
        }));
        assert_eq!(revenue.summary(), "revenue between 1 and 2.5");
        let city = LeafFilter::named("city").with_kind(FilterKind::InList(InListFilter {
            values: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            case_sensitive: true,
        }));
        assert_eq!(city.summary(), "city in [a, b... (4 total)] [Aa]");
        assert_eq!(LeafFilter::default().summary(), "(no field) (no condition)");
    }

    #[test]
    fn outline_indents_and_records_removal_paths() {
        let tree = FilterExpression::and([
            FilterExpression::leaf(country_us()),
            FilterExpression::not(FilterExpression::Empty),
        ]);
        assert_eq!(tree.outline(), "AND\n  country = \"US\" [aA]\n  NOT\n    (empty)");

        let mut lines = Vec::new();
        tree.render_lines(&mut ExpressionPath::root(), 0, &mut lines);
        let paths: Vec<String> = lines.iter().map(|l| l.path.to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "andGroup",
                "andGroup.expressions.0.filter",
                "andGroup.expressions.1.notExpression",
                "andGroup.expressions.1.notExpression",
            ]
        );
    }

    #[test]
    fn empty_rows_carry_the_add_slot() {
        let tree = FilterExpression::and([FilterExpression::not(FilterExpression::Empty)]);
        let mut lines = Vec::new();
        tree.render_lines(&mut ExpressionPath::root(), 0, &mut lines);
        let not_row = &lines[1];
        let empty_row = &lines[2];
        assert_eq!(not_row.label, "NOT");
        assert_eq!(empty_row.label, "(empty)");
        assert_eq!(empty_row.path.to_string(), "andGroup.expressions.0.notExpression");

        let mut store = FilterStore::from_expression(tree.clone(), Default::default());
        store.add_expression(&empty_row.path, ExpressionKind::Filter).unwrap();
        assert_eq!(
            *store.expression(),
            FilterExpression::and([FilterExpression::not(FilterExpression::blank(ExpressionKind::Filter))])
        );

        let mut store = FilterStore::from_expression(tree, Default::default());
        store.remove_expression(&not_row.path).unwrap();
        assert_eq!(*store.expression(), FilterExpression::and([]));
    }
}
