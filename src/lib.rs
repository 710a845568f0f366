//! # vibescol — columnar append-only storage engine
//!
//! Format guarantees (frozen in v1):
//! - All numeric fields are little-endian; never negotiated
//! - Every block is self-describing: min/max id, min/max/sum value, count,
//!   encoding, and a mandatory CRC-64; corrupt payloads abort reads
//! - The footer is the authoritative block index; blocks are never searched
//!   linearly to answer a query
//! - A file's trailing magic matches its leading magic; a CRC-64 mismatch
//!   against the recorded `file_crc64` marks the whole file corrupt
//! - Integer encoding (raw vs. zig-zag varint) is a closed, explicit tag per
//!   block; there is no negotiated or sniffed encoding

pub mod aggregate;
pub mod bitmap;
pub mod block;
pub mod builder;
pub mod error;
pub mod file_header;
pub mod footer;
pub mod memtable;
pub mod multireader;
pub mod reader;
pub mod varint;
pub mod writer;

pub use aggregate::{aggregate, AggregateOptions, AggregateResult};
pub use bitmap::GlobalIdBitmap;
pub use block::{decode_block, encode_block, BlockHeader, CompressionType, DataLayout, EncodingType};
pub use builder::BlockBuilder;
pub use error::{Error, Result};
pub use file_header::{ColumnType, FileHeader};
pub use footer::{Footer, FooterEntry};
pub use memtable::MemTable;
pub use multireader::{aggregate_stack, MultiReaderStack};
pub use reader::FileReader;
pub use writer::{FileWriter, WriterOptions};
