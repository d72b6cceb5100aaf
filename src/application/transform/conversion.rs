use async_trait::async_trait;
use tracing::debug;

use crate::application::errors::Result;
use crate::application::ports::{RecordSource, SourceRef};
use crate::domain::entities::{LogicalRecord, WireRecord};
use crate::domain::value_objects::TypesMap;

/// Logical → wire conversion policy.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Conversion {
    /// Every field in its natural list kind; raw bytes become a bytes list.
    #[default]
    Verbatim,
    /// Fields named in the table are decoded to that type; the rest fall back
    /// to `Verbatim`.
    Typed(TypesMap),
}

impl Conversion {
    pub fn from_types(types: TypesMap) -> Self {
        if types.is_empty() {
            Conversion::Verbatim
        } else {
            Conversion::Typed(types)
        }
    }

    pub fn convert(&self, record: LogicalRecord) -> Result<WireRecord> {
        let mut wire = WireRecord::new();
        for (name, value) in record.into_fields() {
            let target = match self {
                Conversion::Verbatim => None,
                Conversion::Typed(types) => types.get(&name).copied(),
            };
            let feature = value.into_feature(&name, target)?;
            wire.insert(name, feature);
        }
        Ok(wire)
    }
}

/// Source adapter turning logical records into wire records.
pub struct ConvertingSource {
    upstream: SourceRef<LogicalRecord>,
    conversion: Conversion,
}

impl ConvertingSource {
    pub fn new(upstream: SourceRef<LogicalRecord>, conversion: Conversion) -> Self {
        Self {
            upstream,
            conversion,
        }
    }
}

#[async_trait]
impl RecordSource<WireRecord> for ConvertingSource {
    async fn read(&self) -> Result<Option<WireRecord>> {
        match self.upstream.read().await? {
            Some(record) => {
                let wire = self.conversion.convert(record)?;
                debug!(fields = wire.len(), key = ?wire.key(), "Converted record");
                Ok(Some(wire))
            }
            None => Ok(None),
        }
    }
}
