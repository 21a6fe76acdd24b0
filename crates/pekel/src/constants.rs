//! Opcode table.
//!
//! Byte values are shared with pickle protocol 2, so streams written here
//! load with any pickle implementation and vice versa for this subset.

use crate::DecodeError;

/// The only protocol version this codec reads and writes.
pub const PROTOCOL_VERSION: u8 = 2;

/// Largest byte length that still uses a one-byte length prefix.
pub const SHORT_LEN_MAX: usize = 0xff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Proto = 0x80,
    Stop = b'.',
    None = b'N',
    NewTrue = 0x88,
    NewFalse = 0x89,
    BinInt1 = b'K',
    BinInt2 = b'M',
    BinInt = b'J',
    Long1 = 0x8a,
    Long4 = 0x8b,
    ShortBinString = b'U',
    BinString = b'T',
    BinUnicode = b'X',
    Mark = b'(',
    EmptyTuple = b')',
    Tuple1 = 0x85,
    Tuple2 = 0x86,
    Tuple3 = 0x87,
    Tuple = b't',
    EmptyList = b']',
    List = b'l',
}

impl Opcode {
    /// Number of stack values a fixed-arity tuple opcode consumes.
    pub fn tuple_arity(self) -> Option<usize> {
        match self {
            Opcode::Tuple1 => Some(1),
            Opcode::Tuple2 => Some(2),
            Opcode::Tuple3 => Some(3),
            _ => None,
        }
    }

    /// Opcode building a tuple of `arity` values without a mark, if one exists.
    pub fn for_small_tuple(arity: usize) -> Option<Opcode> {
        match arity {
            0 => Some(Opcode::EmptyTuple),
            1 => Some(Opcode::Tuple1),
            2 => Some(Opcode::Tuple2),
            3 => Some(Opcode::Tuple3),
            _ => None,
        }
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> u8 {
        op as u8
    }
}

impl TryFrom<u8> for Opcode {
    type Error = DecodeError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        let op = match byte {
            0x80 => Opcode::Proto,
            b'.' => Opcode::Stop,
            b'N' => Opcode::None,
            0x88 => Opcode::NewTrue,
            0x89 => Opcode::NewFalse,
            b'K' => Opcode::BinInt1,
            b'M' => Opcode::BinInt2,
            b'J' => Opcode::BinInt,
            0x8a => Opcode::Long1,
            0x8b => Opcode::Long4,
            b'U' => Opcode::ShortBinString,
            b'T' => Opcode::BinString,
            b'X' => Opcode::BinUnicode,
            b'(' => Opcode::Mark,
            b')' => Opcode::EmptyTuple,
            0x85 => Opcode::Tuple1,
            0x86 => Opcode::Tuple2,
            0x87 => Opcode::Tuple3,
            b't' => Opcode::Tuple,
            b']' => Opcode::EmptyList,
            b'l' => Opcode::List,
            other => return Err(DecodeError::UnrecognizedOpcode { opcode: other, offset: 0 }),
        };
        Ok(op)
    }
}
