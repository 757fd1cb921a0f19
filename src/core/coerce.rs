//! Conversions from editor text to payload values.
use crate::core::expression::NumericValue;

/// Convert numeric text to a `NumericValue`.
///
/// Text without a decimal point must be an int64 and is kept verbatim (after
/// trimming). Text with a decimal point must be a finite double. Anything
/// else, including the empty string, is unset.
pub fn to_numeric_value(text: &str) -> NumericValue {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return NumericValue::Unset;
    }
    if !trimmed.contains('.') {
        return match trimmed.parse::<i64>() {
            Ok(_) => NumericValue::Int64(trimmed.to_string()),
            Err(_) => NumericValue::Unset,
        };
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => NumericValue::Double(value),
        _ => NumericValue::Unset,
    }
}

/// Text shown in the value field for an existing value
pub fn numeric_value_text(value: &NumericValue) -> String {
    match value {
        NumericValue::Unset => String::new(),
        NumericValue::Int64(text) => text.clone(),
        NumericValue::Double(value) => value.to_string(),
    }
}

/// Split comma separated text into trimmed, non-empty values in order
pub fn split_in_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
