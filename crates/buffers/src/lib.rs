//! Byte buffer primitives used by the pekel codec.
//!
//! - [`Writer`] grows automatically and writes little-endian integers.
//! - [`Reader`] walks a borrowed byte slice and never panics on short input.

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("unexpected end of buffer")]
    EndOfBuffer,
    #[error("invalid UTF-8")]
    InvalidUtf8,
}
