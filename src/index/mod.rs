pub mod field_index;

pub use field_index::{FieldIndex, IndexKey};
