//! Editor commands for a filter session.
//!
//! Each `FilterEdit` is one user action (add a node, pick a field, switch the
//! condition kind, type into a value box). `FilterEditor` replays them
//! against a `FilterStore`, applying the option rules of the filter type and
//! the field catalog on the way.
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::{
    ExpressionKind, ExpressionPath, FilterKind, FilterKindTag, FilterType, LeafFilter, MatchType,
    NumericOperation, PathError, split_in_list, to_numeric_value,
};
use crate::services::field_catalog::{CatalogError, FieldCatalog};
use crate::services::filter_store::FilterStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FilterEdit {
    Add {
        #[serde(default)]
        path: ExpressionPath,
        kind: ExpressionKind,
    },
    Remove {
        #[serde(default)]
        path: ExpressionPath,
    },
    /// Drop the whole tree
    Reset,
    /// Set or clear `fieldName`; blank text clears it
    SetField {
        path: ExpressionPath,
        #[serde(default)]
        name: Option<String>,
    },
    /// Replace the payload with a fresh one of `kind`
    SetKind { path: ExpressionPath, kind: FilterKindTag },
    SetString {
        path: ExpressionPath,
        #[serde(default)]
        match_type: Option<MatchType>,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        case_sensitive: Option<bool>,
    },
    SetNumeric {
        path: ExpressionPath,
        #[serde(default)]
        operation: Option<NumericOperation>,
        /// Raw text from the value box
        #[serde(default)]
        value: Option<String>,
    },
    SetInList {
        path: ExpressionPath,
        /// Comma separated values
        #[serde(default)]
        values: Option<String>,
        #[serde(default)]
        case_sensitive: Option<bool>,
    },
    SetBetween {
        path: ExpressionPath,
        #[serde(default)]
        from: Option<String>,
        #[serde(default)]
        to: Option<String>,
    },
}

impl FilterEdit {
    /// Read a JSON5 array of edits
    pub fn parse_script(text: &str) -> Result<Vec<FilterEdit>, json5::Error> {
        json5::from_str(text)
    }

    /// The `op` tag of this edit
    pub fn op(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Remove { .. } => "remove",
            Self::Reset => "reset",
            Self::SetField { .. } => "set_field",
            Self::SetKind { .. } => "set_kind",
            Self::SetString { .. } => "set_string",
            Self::SetNumeric { .. } => "set_numeric",
            Self::SetInList { .. } => "set_in_list",
            Self::SetBetween { .. } => "set_between",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("filter at `{path}` has a {found} condition, not {expected}")]
    KindMismatch {
        path: ExpressionPath,
        expected: FilterKindTag,
        found: &'static str,
    },
    #[error("{kind} conditions are not available for {filter_type} filters")]
    KindNotAllowed { kind: FilterKindTag, filter_type: FilterType },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

fn kind_mismatch(path: &ExpressionPath, expected: FilterKindTag, leaf: &LeafFilter) -> EditError {
    EditError::KindMismatch {
        path: path.clone(),
        expected,
        found: leaf.kind_tag().map(|tag| tag.label()).unwrap_or("missing"),
    }
}

#[derive(Debug, Clone)]
pub struct FilterEditor {
    store: FilterStore,
    filter_type: FilterType,
    catalog: Option<FieldCatalog>,
}

impl FilterEditor {
    pub fn new(store: FilterStore, filter_type: FilterType) -> Self {
        Self { store, filter_type, catalog: None }
    }

    /// Restrict `set_field` to the names in `catalog`
    pub fn with_catalog(mut self, catalog: FieldCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn store(&self) -> &FilterStore {
        &self.store
    }

    pub fn into_store(self) -> FilterStore {
        self.store
    }

    /// Apply one edit. On error the tree is left as it was.
    pub fn apply(&mut self, edit: &FilterEdit) -> Result<(), EditError> {
        trace!(op = edit.op(), ?edit, "applying filter edit");
        match edit {
            FilterEdit::Add { path, kind } => self.store.add_expression(path, *kind)?,
            FilterEdit::Remove { path } => self.store.remove_expression(path)?,
            FilterEdit::Reset => self.store.reset(),
            FilterEdit::SetField { path, name } => {
                let name = name.as_deref().map(str::trim).filter(|name| !name.is_empty());
                if let (Some(catalog), Some(name)) = (&self.catalog, name) {
                    catalog.check_field(name, path)?;
                }
                let field_name = name.map(str::to_string);
                self.store.update_filter(path, |leaf| LeafFilter { field_name, ..leaf })?;
            }
            FilterEdit::SetKind { path, kind } => {
                if !self.filter_type.allows(*kind) {
                    return Err(EditError::KindNotAllowed { kind: *kind, filter_type: self.filter_type });
                }
                self.store.update_filter(path, |leaf| leaf.with_kind(FilterKind::fresh(*kind)))?;
            }
            FilterEdit::SetString { path, match_type, value, case_sensitive } => {
                self.store.try_update_filter(path, |mut leaf| {
                    let Some(FilterKind::String(filter)) = leaf.kind.as_mut() else {
                        return Err(kind_mismatch(path, FilterKindTag::String, &leaf));
                    };
                    if let Some(match_type) = match_type {
                        filter.match_type = *match_type;
                    }
                    if let Some(value) = value {
                        filter.value = value.clone();
                    }
                    if let Some(case_sensitive) = case_sensitive {
                        filter.case_sensitive = *case_sensitive;
                    }
                    Ok(leaf)
                })?;
            }
            FilterEdit::SetNumeric { path, operation, value } => {
                self.store.try_update_filter(path, |mut leaf| {
                    let Some(FilterKind::Numeric(filter)) = leaf.kind.as_mut() else {
                        return Err(kind_mismatch(path, FilterKindTag::Numeric, &leaf));
                    };
                    if let Some(operation) = operation {
                        filter.operation = *operation;
                    }
                    if let Some(text) = value {
                        filter.value = to_numeric_value(text);
                    }
                    Ok(leaf)
                })?;
            }
            FilterEdit::SetInList { path, values, case_sensitive } => {
                self.store.try_update_filter(path, |mut leaf| {
                    let Some(FilterKind::InList(filter)) = leaf.kind.as_mut() else {
                        return Err(kind_mismatch(path, FilterKindTag::InList, &leaf));
                    };
                    if let Some(text) = values {
                        filter.values = split_in_list(text);
                    }
                    if let Some(case_sensitive) = case_sensitive {
                        filter.case_sensitive = *case_sensitive;
                    }
                    Ok(leaf)
                })?;
            }
            FilterEdit::SetBetween { path, from, to } => {
                self.store.try_update_filter(path, |mut leaf| {
                    let Some(FilterKind::Between(filter)) = leaf.kind.as_mut() else {
                        return Err(kind_mismatch(path, FilterKindTag::Between, &leaf));
                    };
                    if let Some(text) = from {
                        filter.from_value = to_numeric_value(text);
                    }
                    if let Some(text) = to {
                        filter.to_value = to_numeric_value(text);
                    }
                    Ok(leaf)
                })?;
            }
        }
        self.store.ensure_mode();
        Ok(())
    }

    /// Apply edits in order, stopping at the first failure
    pub fn apply_all<'a>(&mut self, edits: impl IntoIterator<Item = &'a FilterEdit>) -> Result<(), EditError> {
        for edit in edits {
            self.apply(edit)?;
        }
        Ok(())
    }
}
