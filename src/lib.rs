pub mod config;
pub mod core;
pub mod logging;
pub mod services;
pub mod session;

// Re-export commonly used types
pub use crate::core::{ExpressionKind, ExpressionPath, FilterExpression, FilterMode, FilterType, LeafFilter, PathError};
pub use crate::services::{EditError, FieldCatalog, FilterEdit, FilterEditor, FilterStore, ReportFilters};
