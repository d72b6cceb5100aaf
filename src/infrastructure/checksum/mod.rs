mod record_checksum;

pub use record_checksum::RecordChecksum;
