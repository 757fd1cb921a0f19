use std::collections::BTreeSet;

use derive_deref::{Deref, DerefMut};
use serde::{Deserialize, Serialize};

use crate::core::{ExpressionPath, FilterExpression};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("unknown field `{field}` at `{path}`")]
    UnknownField { field: String, path: ExpressionPath },
}

/// Field names a filter may reference (dimensions or metrics of a property)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, DerefMut, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldCatalog(pub BTreeSet<String>);

impl FieldCatalog {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    /// Reject `field` unless the catalog lists it
    pub fn check_field(&self, field: &str, path: &ExpressionPath) -> Result<(), CatalogError> {
        if self.0.contains(field) {
            Ok(())
        } else {
            Err(CatalogError::UnknownField { field: field.to_string(), path: path.clone() })
        }
    }

    /// Every leaf whose field name is not in the catalog, in tree order.
    /// Leaves without a field name are skipped.
    pub fn unknown_fields(&self, expression: &FilterExpression) -> Vec<CatalogError> {
        expression
            .leaves()
            .into_iter()
            .filter_map(|(path, leaf)| {
                let field = leaf.field_name.as_deref()?;
                self.check_field(field, &path).err()
            })
            .collect()
    }

    /// First unknown field in `expression`, if any
    pub fn check(&self, expression: &FilterExpression) -> Result<(), CatalogError> {
        match self.unknown_fields(expression).into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
