pub mod coerce;
pub mod expression;
pub mod outline;
pub mod path;
pub mod types;

pub use coerce::{numeric_value_text, split_in_list, to_numeric_value};
pub use expression::*;
pub use outline::OutlineLine;
pub use path::{ExpressionPath, PathError, PathKey, PathSegment};
pub use types::*;
