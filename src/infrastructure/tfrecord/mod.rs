mod proto;
mod reader;
mod writer;

pub use proto::{decode_wire_record, encode_wire_record, Example};
pub use reader::RecordReader;
pub use writer::{RecordWriter, FRAME_OVERHEAD};
