mod entry_name;
mod feature;
mod feature_type;
mod field_value;

pub use entry_name::EntryName;
pub use feature::Feature;
pub use feature_type::{FeatureType, TypesMap};
pub use field_value::FieldValue;
