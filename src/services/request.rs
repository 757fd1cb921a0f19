use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{FilterExpression, FilterMode, FilterType};
use crate::services::filter_store::FilterStore;

/// Filter members of a `runReport` request body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_filter: Option<Arc<FilterExpression>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_filter: Option<Arc<FilterExpression>>,
}

impl ReportFilters {
    /// Place the store's filter, if it belongs in a request, in the member for `filter_type`
    pub fn with_filter(mut self, filter_type: FilterType, store: &FilterStore) -> Self {
        let filter = request_filter(store);
        match filter_type {
            FilterType::Dimension => self.dimension_filter = filter,
            FilterType::Metric => self.metric_filter = filter,
        }
        self
    }
}

/// The expression a request should carry for `store`.
///
/// Nothing is sent for the empty placeholder, and in simple mode nothing is
/// sent until the root leaf names a field.
pub fn request_filter(store: &FilterStore) -> Option<Arc<FilterExpression>> {
    let expression = store.expression();
    let include = match (store.mode(), expression) {
        (_, FilterExpression::Empty) => false,
        (FilterMode::Advanced, _) => true,
        (FilterMode::Simple, FilterExpression::Filter(leaf)) => leaf.field_name.is_some(),
        (FilterMode::Simple, _) => false,
    };
    include.then(|| store.snapshot())
}
