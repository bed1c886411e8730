//! Record content model and the field value algebra.

mod convert;
mod record;
mod value;

pub use convert::{convert, is_conversion_supported, merge, stringify, MergeStrategy};
pub use record::RecordContent;
pub use value::{FieldType, FieldValue};
