//! Crate-wide error type. One flat `thiserror` enum rather than one per
//! module, since this crate has a single on-disk format rather than a set
//! of pluggable codecs that would otherwise want their own error types.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Magic or version mismatch, footer length exceeds file size, or a
    /// data-layout offset falls outside the block payload.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// CRC mismatch (block or file), varint overflow, or a count/sum
    /// disagreement between a block header and its decoded payload.
    #[error("corrupt data: {0}")]
    Corrupt(String),

    /// Mismatched ID/value slice lengths, an empty block, or an unknown
    /// aggregation kind requested from the in-memory store facade.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
