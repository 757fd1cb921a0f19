pub mod field_catalog;
pub mod filter_edit;
pub mod filter_store;
pub mod request;

pub use field_catalog::{CatalogError, FieldCatalog};
pub use filter_edit::{EditError, FilterEdit, FilterEditor};
pub use filter_store::FilterStore;
pub use request::{ReportFilters, request_filter};
