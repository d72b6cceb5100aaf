mod field_map;
mod logical_record;
mod wire_record;

pub use field_map::{FieldMap, KEY_FIELD};
pub use logical_record::LogicalRecord;
pub use wire_record::WireRecord;
