use std::fmt::Display;
use std::sync::Arc;

use tracing::debug;

use crate::core::path::{Step, StepKind};
use crate::core::{
    ExpressionKind, ExpressionPath, FilterExpression, FilterMode, GroupKind, LeafFilter, PathError,
    PathKey, PathSegment,
};

/// FilterStore owns one filter expression tree for an editing session
///
/// Every mutation works on a copy of the root `Arc`: nodes between the root
/// and the edited location are cloned, everything else is shared with earlier
/// snapshots. A rejected edit leaves the tree untouched.
#[derive(Debug, Clone)]
pub struct FilterStore {
    root: Arc<FilterExpression>,
    mode: FilterMode,
}

impl Default for FilterStore {
    fn default() -> Self {
        Self::new(FilterMode::Advanced)
    }
}

impl FilterStore {
    /// Create a store; simple mode starts with one empty leaf filter
    pub fn new(mode: FilterMode) -> Self {
        let mut store = Self { root: Arc::new(FilterExpression::Empty), mode };
        store.ensure_mode();
        store
    }

    /// Start from an existing tree
    pub fn from_expression(expression: FilterExpression, mode: FilterMode) -> Self {
        let mut store = Self { root: Arc::new(expression), mode };
        store.ensure_mode();
        store
    }

    pub fn expression(&self) -> &FilterExpression {
        &self.root
    }

    /// Cheap handle on the current tree
    pub fn snapshot(&self) -> Arc<FilterExpression> {
        Arc::clone(&self.root)
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: FilterMode) {
        self.mode = mode;
        self.ensure_mode();
    }

    /// In simple mode, re-seed the root with an empty leaf unless it already is
    /// a leaf. Returns true when the tree was replaced.
    pub fn ensure_mode(&mut self) -> bool {
        if self.mode == FilterMode::Simple && !matches!(*self.root, FilterExpression::Filter(_)) {
            debug!("seeding simple-mode filter");
            self.root = Arc::new(FilterExpression::blank(ExpressionKind::Filter));
            return true;
        }
        false
    }

    /// Drop the tree, keeping the mode's starting shape
    pub fn reset(&mut self) {
        self.root = Arc::new(FilterExpression::Empty);
        self.ensure_mode();
    }

    /// Attach a fresh `kind` node at `path`.
    ///
    /// The empty path replaces the root. A path ending in `notExpression`
    /// writes the operand of that negation; a path ending in an index writes
    /// that slot of the group, appending when the index equals the length.
    pub fn add_expression(&mut self, path: &ExpressionPath, kind: ExpressionKind) -> Result<(), PathError> {
        self.commit("add", path, |root| {
            let steps = path.steps_until(path.len())?;
            let node = FilterExpression::blank(kind);
            let Some((last, parents)) = steps.split_last() else {
                *root = Arc::new(node);
                return Ok(());
            };
            let parent = Arc::make_mut(node_at(root, parents, path)?);
            write_slot(parent, last, node, path)
        })
    }

    /// Remove the node `path` addresses.
    ///
    /// Paths of length one or zero clear the whole tree. A path may end at a
    /// list index or at the tag key of the node to remove (`...0.filter`,
    /// `...notExpression`). Group members are spliced out; a negation's
    /// operand becomes the empty placeholder.
    pub fn remove_expression(&mut self, path: &ExpressionPath) -> Result<(), PathError> {
        self.commit("remove", path, |root| {
            if path.len() <= 1 {
                *root = Arc::new(FilterExpression::Empty);
                return Ok(());
            }
            let last_position = path.len() - 1;
            let (location, tag) = match path.last() {
                Some(PathSegment::Key(key)) if key.is_tag() => (last_position, Some(*key)),
                Some(PathSegment::Index(_)) => (path.len(), None),
                _ => {
                    return Err(PathError::Malformed {
                        path: path.clone(),
                        position: last_position,
                        reason: "a removal path must end at a node tag or a list index",
                    });
                }
            };
            let steps = path.steps_until(location)?;
            let Some((last, parents)) = steps.split_last() else {
                check_tag(root, tag, path)?;
                *root = Arc::new(FilterExpression::Empty);
                return Ok(());
            };
            let parent = Arc::make_mut(node_at(root, parents, path)?);
            remove_slot(parent, last, tag, path)
        })
    }

    /// Replace the leaf filter at `path` (which ends at `filter`) with `update(leaf)`
    pub fn update_filter<F>(&mut self, path: &ExpressionPath, update: F) -> Result<(), PathError>
    where
        F: FnOnce(LeafFilter) -> LeafFilter,
    {
        self.try_update_filter(path, |leaf| Ok::<_, PathError>(update(leaf)))
    }

    /// Like `update_filter`, for updates that can refuse the change
    pub fn try_update_filter<E, F>(&mut self, path: &ExpressionPath, update: F) -> Result<(), E>
    where
        E: From<PathError> + Display,
        F: FnOnce(LeafFilter) -> Result<LeafFilter, E>,
    {
        self.commit("update", path, |root| {
            let Some(PathSegment::Key(PathKey::Filter)) = path.last() else {
                return Err(PathError::Malformed {
                    path: path.clone(),
                    position: path.len().saturating_sub(1),
                    reason: "a leaf filter path must end at `filter`",
                }
                .into());
            };
            let steps = path.steps_until(path.len() - 1)?;
            let node = Arc::make_mut(node_at(root, &steps, path)?);
            let found = node.kind_name();
            let FilterExpression::Filter(leaf) = node else {
                return Err(PathError::TagMismatch {
                    path: path.clone(),
                    position: path.len() - 1,
                    expected: PathKey::Filter,
                    found,
                }
                .into());
            };
            *leaf = update(std::mem::take(leaf))?;
            Ok(())
        })
    }

    fn commit<E, F>(&mut self, op: &'static str, path: &ExpressionPath, edit: F) -> Result<(), E>
    where
        E: Display,
        F: FnOnce(&mut Arc<FilterExpression>) -> Result<(), E>,
    {
        let mut root = Arc::clone(&self.root);
        match edit(&mut root) {
            Ok(()) => {
                debug!(op, %path, "filter expression updated");
                self.root = root;
                Ok(())
            }
            Err(err) => {
                debug!(op, %path, error = %err, "filter expression edit rejected");
                Err(err)
            }
        }
    }
}

fn tag_mismatch(path: &ExpressionPath, step: &Step, found: &'static str) -> PathError {
    PathError::TagMismatch { path: path.clone(), position: step.position, expected: step.kind.parent_key(), found }
}

fn index_out_of_range(path: &ExpressionPath, step: &Step, index: usize, len: usize) -> PathError {
    PathError::IndexOutOfRange { path: path.clone(), position: step.position + 2, index, len }
}

/// Walk `steps` from `node`, cloning shared nodes on the way down
fn node_at<'a>(
    node: &'a mut Arc<FilterExpression>,
    steps: &[Step],
    path: &ExpressionPath,
) -> Result<&'a mut Arc<FilterExpression>, PathError> {
    let Some((step, rest)) = steps.split_first() else {
        return Ok(node);
    };
    let child = child_mut(Arc::make_mut(node), step, path)?;
    node_at(child, rest, path)
}

fn child_mut<'a>(
    node: &'a mut FilterExpression,
    step: &Step,
    path: &ExpressionPath,
) -> Result<&'a mut Arc<FilterExpression>, PathError> {
    let found = node.kind_name();
    match (step.kind, node) {
        (StepKind::Operand, FilterExpression::NotExpression(operand)) => Ok(operand),
        (StepKind::Member { group: GroupKind::And, index }, FilterExpression::AndGroup(list))
        | (StepKind::Member { group: GroupKind::Or, index }, FilterExpression::OrGroup(list)) => {
            let len = list.expressions.len();
            list.expressions.get_mut(index).ok_or_else(|| index_out_of_range(path, step, index, len))
        }
        _ => Err(tag_mismatch(path, step, found)),
    }
}

fn write_slot(
    parent: &mut FilterExpression,
    step: &Step,
    node: FilterExpression,
    path: &ExpressionPath,
) -> Result<(), PathError> {
    let found = parent.kind_name();
    match (step.kind, parent) {
        (StepKind::Operand, FilterExpression::NotExpression(operand)) => {
            *operand = Arc::new(node);
            Ok(())
        }
        (StepKind::Member { group: GroupKind::And, index }, FilterExpression::AndGroup(list))
        | (StepKind::Member { group: GroupKind::Or, index }, FilterExpression::OrGroup(list)) => {
            let len = list.expressions.len();
            match index.cmp(&len) {
                std::cmp::Ordering::Less => list.expressions[index] = Arc::new(node),
                std::cmp::Ordering::Equal => list.expressions.push(Arc::new(node)),
                std::cmp::Ordering::Greater => return Err(index_out_of_range(path, step, index, len)),
            }
            Ok(())
        }
        _ => Err(tag_mismatch(path, step, found)),
    }
}

fn remove_slot(
    parent: &mut FilterExpression,
    step: &Step,
    tag: Option<PathKey>,
    path: &ExpressionPath,
) -> Result<(), PathError> {
    let found = parent.kind_name();
    match (step.kind, parent) {
        (StepKind::Operand, FilterExpression::NotExpression(operand)) => {
            check_tag(operand, tag, path)?;
            *operand = Arc::new(FilterExpression::Empty);
            Ok(())
        }
        (StepKind::Member { group: GroupKind::And, index }, FilterExpression::AndGroup(list))
        | (StepKind::Member { group: GroupKind::Or, index }, FilterExpression::OrGroup(list)) => {
            let len = list.expressions.len();
            let member = list.expressions.get(index).ok_or_else(|| index_out_of_range(path, step, index, len))?;
            check_tag(member, tag, path)?;
            list.expressions.remove(index);
            Ok(())
        }
        _ => Err(tag_mismatch(path, step, found)),
    }
}

/// A removal path ending in a tag key must name the tag the node carries
fn check_tag(node: &FilterExpression, tag: Option<PathKey>, path: &ExpressionPath) -> Result<(), PathError> {
    match tag {
        Some(expected) if node.tag() != Some(expected) => Err(PathError::TagMismatch {
            path: path.clone(),
            position: path.len() - 1,
            expected,
            found: node.kind_name(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FilterKind, MatchType, StringFilter};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn path(s: &str) -> ExpressionPath {
        s.parse().unwrap()
    }

    fn named(name: &str) -> FilterExpression {
        FilterExpression::leaf(LeafFilter::named(name))
    }

    fn members(expr: &FilterExpression) -> &[Arc<FilterExpression>] {
        match expr {
            FilterExpression::AndGroup(list) | FilterExpression::OrGroup(list) => &list.expressions,
            other => panic!("not a group: {other:?}"),
        }
    }

    fn store_with(expr: FilterExpression) -> FilterStore {
        FilterStore::from_expression(expr, FilterMode::Advanced)
    }

    #[test]
    fn new_store_is_empty() {
        assert!(FilterStore::default().expression().is_empty());
        assert!(FilterStore::new(FilterMode::Advanced).expression().is_empty());
    }

    #[test]
    fn add_at_root_replaces_root() {
        let mut store = FilterStore::default();
        store.add_expression(&ExpressionPath::root(), ExpressionKind::Filter).unwrap();
        assert_eq!(serde_json::to_value(store.expression()).unwrap(), json!({"filter": {}}));

        store.add_expression(&ExpressionPath::root(), ExpressionKind::And).unwrap();
        assert_eq!(serde_json::to_value(store.expression()).unwrap(), json!({"andGroup": {"expressions": []}}));
    }

    #[test]
    fn add_into_group_appends_and_shares_siblings() {
        let mut store = store_with(FilterExpression::and([named("a"), named("b")]));
        let before = store.snapshot();

        store.add_expression(&path("andGroup.expressions.2"), ExpressionKind::Filter).unwrap();

        let after = store.snapshot();
        let (old, new) = (members(&before), members(&after));
        assert_eq!(new.len(), 3);
        assert!(Arc::ptr_eq(&old[0], &new[0]));
        assert!(Arc::ptr_eq(&old[1], &new[1]));
        assert_eq!(*new[2], FilterExpression::blank(ExpressionKind::Filter));
        // the earlier snapshot is untouched
        assert_eq!(old.len(), 2);
    }

    #[test]
    fn add_overwrites_an_existing_slot() {
        let mut store = store_with(FilterExpression::or([FilterExpression::Empty, named("b")]));
        store.add_expression(&path("orGroup.expressions.0"), ExpressionKind::Not).unwrap();
        assert_eq!(*store.expression(), FilterExpression::or([FilterExpression::not(FilterExpression::Empty), named("b")]));
    }

    #[test]
    fn add_fills_a_negation_operand() {
        let mut store = FilterStore::default();
        store.add_expression(&ExpressionPath::root(), ExpressionKind::Not).unwrap();
        store.add_expression(&path("notExpression"), ExpressionKind::Or).unwrap();
        store.add_expression(&path("notExpression.orGroup.expressions.0"), ExpressionKind::Filter).unwrap();
        assert_eq!(
            serde_json::to_value(store.expression()).unwrap(),
            json!({"notExpression": {"orGroup": {"expressions": [{"filter": {}}]}}})
        );
    }

    #[test]
    fn add_past_the_end_is_rejected_and_leaves_tree_alone() {
        let mut store = store_with(FilterExpression::and([named("a")]));
        let before = store.snapshot();
        let err = store.add_expression(&path("andGroup.expressions.3"), ExpressionKind::Filter).unwrap_err();
        assert_eq!(
            err,
            PathError::IndexOutOfRange { path: path("andGroup.expressions.3"), position: 2, index: 3, len: 1 }
        );
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn add_through_the_wrong_group_is_rejected() {
        let mut store = store_with(FilterExpression::and([]));
        let err = store.add_expression(&path("orGroup.expressions.0"), ExpressionKind::Filter).unwrap_err();
        assert!(matches!(err, PathError::TagMismatch { expected: PathKey::OrGroup, found: "andGroup", .. }), "{err}");

        let err = store.add_expression(&path("filter"), ExpressionKind::Filter).unwrap_err();
        assert!(matches!(err, PathError::Malformed { position: 0, .. }), "{err}");
    }

    #[test]
    fn remove_from_list_splices() {
        let mut store = store_with(FilterExpression::and([named("a"), named("b"), named("c")]));
        let before = store.snapshot();
        store.remove_expression(&path("andGroup.expressions.1")).unwrap();
        let after = store.snapshot();
        let (old, new) = (members(&before), members(&after));
        assert_eq!(new.len(), 2);
        assert!(Arc::ptr_eq(&old[0], &new[0]));
        assert!(Arc::ptr_eq(&old[2], &new[1]));
    }

    #[test]
    fn remove_by_member_tag_splices_too() {
        let mut store = store_with(FilterExpression::and([named("a"), FilterExpression::not(named("b"))]));
        store.remove_expression(&path("andGroup.expressions.1.notExpression")).unwrap();
        assert_eq!(*store.expression(), FilterExpression::and([named("a")]));

        store.remove_expression(&path("andGroup.expressions.0.filter")).unwrap();
        assert_eq!(*store.expression(), FilterExpression::and([]));
    }

    #[test]
    fn remove_with_wrong_member_tag_is_rejected() {
        let mut store = store_with(FilterExpression::and([named("a")]));
        let err = store.remove_expression(&path("andGroup.expressions.0.orGroup")).unwrap_err();
        assert!(matches!(err, PathError::TagMismatch { position: 3, expected: PathKey::OrGroup, found: "filter", .. }), "{err}");
        assert_eq!(members(store.expression()).len(), 1);
    }

    #[test]
    fn remove_negation_operand_sets_placeholder() {
        let mut store = store_with(FilterExpression::not(FilterExpression::not(named("a"))));
        store.remove_expression(&path("notExpression.notExpression")).unwrap();
        assert_eq!(*store.expression(), FilterExpression::not(FilterExpression::Empty));

        let mut store = store_with(FilterExpression::not(named("a")));
        store.remove_expression(&path("notExpression.filter")).unwrap();
        assert_eq!(*store.expression(), FilterExpression::not(FilterExpression::Empty));
    }

    #[test]
    fn short_removal_paths_reset_the_tree() {
        for p in ["", "filter", "andGroup", "notExpression"] {
            let mut store = store_with(FilterExpression::and([named("a")]));
            store.remove_expression(&path(p)).unwrap();
            assert!(store.expression().is_empty(), "{p:?}");
        }
    }

    #[test]
    fn removal_path_ending_at_a_list_is_rejected() {
        let mut store = store_with(FilterExpression::and([named("a")]));
        let err = store.remove_expression(&path("andGroup.expressions")).unwrap_err();
        assert!(matches!(err, PathError::Malformed { position: 1, .. }), "{err}");
    }

    #[test]
    fn update_filter_is_surgical() {
        let mut store = store_with(FilterExpression::and([named("x"), named("y")]));
        let before = store.snapshot();
        store
            .update_filter(&path("andGroup.expressions.0.filter"), |f| LeafFilter { field_name: Some("z".into()), ..f })
            .unwrap();
        let after = store.snapshot();
        let (old, new) = (members(&before), members(&after));
        assert_eq!(new[0].as_leaf().and_then(|l| l.field_name.as_deref()), Some("z"));
        assert_eq!(new[1].as_leaf().and_then(|l| l.field_name.as_deref()), Some("y"));
        assert!(Arc::ptr_eq(&old[1], &new[1]));
        assert_eq!(old[0].as_leaf().and_then(|l| l.field_name.as_deref()), Some("x"));
    }

    #[test]
    fn update_requires_a_leaf() {
        let mut store = store_with(FilterExpression::and([FilterExpression::Empty]));
        let err = store.update_filter(&path("andGroup.expressions.0.filter"), |f| f).unwrap_err();
        assert!(matches!(err, PathError::TagMismatch { position: 3, found: "empty", .. }), "{err}");

        let err = store.update_filter(&path("andGroup.expressions.0"), |f| f).unwrap_err();
        assert!(matches!(err, PathError::Malformed { .. }), "{err}");
    }

    #[test]
    fn failed_try_update_keeps_the_old_leaf() {
        let mut store = store_with(named("a"));
        let result: Result<(), PathError> = store.try_update_filter(&path("filter"), |_| {
            Err(PathError::UnknownSegment("refused".into()))
        });
        assert!(result.is_err());
        assert_eq!(*store.expression(), named("a"));
    }

    #[test]
    fn simple_mode_keeps_a_root_leaf() {
        let mut store = FilterStore::new(FilterMode::Simple);
        assert_eq!(*store.expression(), FilterExpression::blank(ExpressionKind::Filter));

        store.remove_expression(&path("filter")).unwrap();
        assert!(store.expression().is_empty());
        assert!(store.ensure_mode());
        assert!(matches!(store.expression(), FilterExpression::Filter(_)));
        assert!(!store.ensure_mode());

        let mut store = FilterStore::from_expression(FilterExpression::and([]), FilterMode::Advanced);
        store.set_mode(FilterMode::Simple);
        assert!(matches!(store.expression(), FilterExpression::Filter(_)));
    }

    #[test]
    fn end_to_end_country_filter() {
        let mut store = FilterStore::default();
        store.add_expression(&ExpressionPath::root(), ExpressionKind::And).unwrap();
        store.add_expression(&path("andGroup.expressions.0"), ExpressionKind::Filter).unwrap();
        store
            .update_filter(&path("andGroup.expressions.0.filter"), |f| LeafFilter {
                field_name: Some("country".into()),
                kind: Some(FilterKind::String(StringFilter {
                    match_type: MatchType::Exact,
                    value: "US".into(),
                    case_sensitive: false,
                })),
                ..f
            })
            .unwrap();
        assert_eq!(
            serde_json::to_value(store.expression()).unwrap(),
            json!({"andGroup": {"expressions": [
                {"filter": {"fieldName": "country", "stringFilter": {"matchType": "EXACT", "value": "US", "caseSensitive": false}}}
            ]}})
        );
    }
}
