mod conversion;
mod selection;
mod transformation;
mod transformer;

pub use conversion::{Conversion, ConvertingSource};
pub use selection::{FnSelection, KeyMatch, KeyValue, Selection};
pub use transformation::{
    FnTransformation, Identity, Rename, Retain, SelectFields, Transformation, TransformationRef,
};
pub use transformer::TransformingSource;
