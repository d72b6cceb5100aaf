/// Reserved field carrying the record's basename.
pub const KEY_FIELD: &str = "__key__";

/// Field-level access shared by logical and wire records.
///
/// Stages and selections are written once against this trait and work on
/// either record representation.
pub trait FieldMap {
    type Value: Clone + PartialEq + Send + Sync;

    fn field_names(&self) -> Vec<&str>;

    fn field(&self, name: &str) -> Option<&Self::Value>;

    fn set_field(&mut self, name: &str, value: Self::Value);

    /// Drop every field for which `keep` returns false.
    fn retain_fields(&mut self, keep: &dyn Fn(&str) -> bool);

    fn field_count(&self) -> usize;

    /// A record is empty when it has no fields, or only the key field.
    fn is_empty_record(&self) -> bool {
        match self.field_count() {
            0 => true,
            1 => self.field(KEY_FIELD).is_some(),
            _ => false,
        }
    }
}
