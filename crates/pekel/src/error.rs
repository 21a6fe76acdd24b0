//! Encoder and decoder error types.

use std::io;

use pekel_buffers::BufferError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    /// The value, or an element nested in it, has no pekel representation.
    #[error("value is not pekelable: {0}")]
    NotEncodable(String),
    #[error("i/o error while writing pekel stream: {0}")]
    Io(#[from] io::Error),
}

/// Structural violations detected by the decoder's stack machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MalformedKind {
    #[error("stray data on the stack ({0} entries left)")]
    StrayData(usize),
    #[error("could not find marker")]
    MissingMark,
    #[error("opcode {opcode:#04x} needs {needed} stack values, found {available}")]
    StackUnderflow {
        opcode: u8,
        needed: usize,
        available: usize,
    },
    #[error("unexpected end of stream")]
    Truncated,
    #[error("negative length prefix {0}")]
    NegativeLength(i32),
    #[error("text payload is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),
    #[error("unrecognized opcode {opcode:#04x} at offset {offset}")]
    UnrecognizedOpcode { opcode: u8, offset: usize },
    #[error("malformed pekel stream: {0}")]
    MalformedStream(#[from] MalformedKind),
    #[error("container nesting exceeds the limit of {limit}")]
    DepthLimit { limit: usize },
    #[error("i/o error while reading pekel stream: {0}")]
    Io(io::Error),
}

impl DecodeError {
    /// True for errors caused by the bytes themselves rather than the transport.
    pub fn is_corrupt(&self) -> bool {
        !matches!(self, DecodeError::Io(_))
    }
}

impl From<BufferError> for DecodeError {
    fn from(e: BufferError) -> Self {
        match e {
            BufferError::EndOfBuffer => MalformedKind::Truncated.into(),
            BufferError::InvalidUtf8 => MalformedKind::InvalidUtf8.into(),
        }
    }
}

impl From<io::Error> for DecodeError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            MalformedKind::Truncated.into()
        } else {
            DecodeError::Io(e)
        }
    }
}
