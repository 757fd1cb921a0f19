//! One command-line filter session: settings resolved from config and flags,
//! script replay, and output rendering.
use color_eyre::Result;
use color_eyre::eyre::WrapErr;

use crate::config::{Config, OutputFormat};
use crate::core::{FilterMode, FilterType};
use crate::services::{CatalogError, FieldCatalog, FilterEdit, FilterEditor, FilterStore, ReportFilters};

/// Values given on the command line; `None` falls back to the config
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub mode: Option<FilterMode>,
    pub filter_type: Option<FilterType>,
    pub output: Option<OutputFormat>,
    pub fields: Option<Vec<String>>,
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub mode: FilterMode,
    pub filter_type: FilterType,
    pub output: OutputFormat,
    /// `None` when no field list applies
    pub catalog: Option<FieldCatalog>,
    /// Unknown fields fail the edit instead of producing warnings
    pub strict: bool,
}

/// Result of replaying a script
#[derive(Debug, Clone)]
pub struct Replay {
    pub store: FilterStore,
    pub warnings: Vec<CatalogError>,
}

impl Session {
    pub fn resolve(cfg: &Config, overrides: Overrides) -> Self {
        let filter_type = overrides.filter_type.unwrap_or(cfg.filter.filter_type);
        let catalog = match overrides.fields {
            Some(fields) => Some(FieldCatalog::new(fields.iter().map(|f| f.trim()).filter(|f| !f.is_empty()))),
            None => cfg.fields.catalog(filter_type).cloned(),
        }
        .filter(|catalog| !catalog.is_empty());

        Self {
            mode: overrides.mode.unwrap_or(cfg.filter.mode),
            filter_type,
            output: overrides.output.unwrap_or(cfg.filter.output),
            catalog,
            strict: overrides.strict,
        }
    }

    /// A fresh editor; strict sessions check field names on every edit
    pub fn editor(&self) -> FilterEditor {
        let editor = FilterEditor::new(FilterStore::new(self.mode), self.filter_type);
        match (&self.catalog, self.strict) {
            (Some(catalog), true) => editor.with_catalog(catalog.clone()),
            _ => editor,
        }
    }

    /// Apply `script` in order. Unknown fields left in the final tree are
    /// reported as warnings.
    pub fn replay(&self, script: &[FilterEdit]) -> Result<Replay> {
        let mut editor = self.editor();
        for (i, edit) in script.iter().enumerate() {
            editor
                .apply(edit)
                .wrap_err_with(|| format!("edit #{} ({}) failed", i + 1, edit.op()))?;
        }
        let store = editor.into_store();
        let warnings = match &self.catalog {
            Some(catalog) => catalog.unknown_fields(store.expression()),
            None => Vec::new(),
        };
        Ok(Replay { store, warnings })
    }

    /// Text printed for `store` in this session's output format
    pub fn render(&self, store: &FilterStore) -> Result<String> {
        let filters = ReportFilters::default().with_filter(self.filter_type, store);
        Ok(match self.output {
            OutputFormat::Json => serde_json::to_string(&filters)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(&filters)?,
            OutputFormat::Outline => store.expression().outline(),
        })
    }
}
