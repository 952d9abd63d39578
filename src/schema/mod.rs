//! Header validation, type inference and reconciliation with the destination table.

pub mod field_names;
pub mod inference;
pub mod reconcile;

pub use field_names::{validate_header, FieldNameRules, ValidatedHeader};
pub use inference::{infer_column, infer_column_with, infer_types, infer_types_with, take_sample, InferenceOptions};
pub use reconcile::reconcile;
