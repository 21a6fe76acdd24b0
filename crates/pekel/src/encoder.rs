//! `PekelEncoder`: writes values as pickle protocol 2 opcodes.
//!
//! Stream layout: `PROTO 0x02`, the value depth-first, then `STOP`.
//!
//! Integers take the smallest form that holds them:
//! - `0..=0xff`           → `BININT1` + u8
//! - `0..=0xffff`         → `BININT2` + u16 LE
//! - `i32` range          → `BININT`  + i32 LE
//! - otherwise            → `LONG1`/`LONG4` + minimal two's-complement bytes
//!
//! Tuples of arity 0–3 use dedicated opcodes after their elements; longer
//! tuples and all non-empty lists are bracketed by `MARK` … `TUPLE`/`LIST`.

use std::io::Write;

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use pekel_buffers::Writer;
use tracing::debug;

use crate::constants::{Opcode, PROTOCOL_VERSION, SHORT_LEN_MAX};
use crate::long::encode_long;
use crate::value::json_number_to_int;
use crate::{EncodeError, PekelValue};

pub struct PekelEncoder {
    pub writer: Writer,
}

impl Default for PekelEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PekelEncoder {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(),
        }
    }

    /// Encoder whose buffer starts at (and grows in steps of) `alloc_size` bytes.
    pub fn with_alloc_size(alloc_size: usize) -> Self {
        Self {
            writer: Writer::with_alloc_size(alloc_size),
        }
    }

    /// Encodes a complete stream. On error nothing is returned and the
    /// partially written bytes are discarded.
    pub fn encode(&mut self, value: &PekelValue) -> Result<Vec<u8>, EncodeError> {
        self.framed(|enc| enc.write_any(value))
    }

    /// Encodes a JSON document directly, without building a [`PekelValue`].
    ///
    /// Floats and objects are rejected with [`EncodeError::NotEncodable`].
    pub fn encode_json(&mut self, value: &serde_json::Value) -> Result<Vec<u8>, EncodeError> {
        let mut path = String::from("$");
        self.framed(|enc| enc.write_json(value, &mut path))
    }

    /// Encodes a complete stream into `out`.
    pub fn write_to<W: Write>(&mut self, value: &PekelValue, out: &mut W) -> Result<(), EncodeError> {
        let bytes = self.encode(value)?;
        out.write_all(&bytes)?;
        Ok(())
    }

    fn framed(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<(), EncodeError>,
    ) -> Result<Vec<u8>, EncodeError> {
        self.writer.reset();
        self.writer.u8u8(Opcode::Proto.into(), PROTOCOL_VERSION);
        if let Err(e) = body(self) {
            debug!(written = self.writer.len(), "pekel encode failed: {e}");
            self.writer.reset();
            return Err(e);
        }
        self.writer.u8(Opcode::Stop.into());
        let bytes = self.writer.flush();
        debug!(len = bytes.len(), "pekel encode");
        Ok(bytes)
    }

    pub fn write_any(&mut self, value: &PekelValue) -> Result<(), EncodeError> {
        match value {
            PekelValue::Unit => self.write_none(),
            PekelValue::Bool(b) => self.write_boolean(*b),
            PekelValue::Integer(i) => self.write_integer(i),
            PekelValue::Bytes(b) => self.write_bin(b)?,
            PekelValue::Text(s) => self.write_str(s)?,
            PekelValue::Tuple(items) => self.write_tuple(items)?,
            PekelValue::List(items) => self.write_list(items)?,
        }
        Ok(())
    }

    fn write_json(&mut self, value: &serde_json::Value, path: &mut String) -> Result<(), EncodeError> {
        match value {
            serde_json::Value::Null => self.write_none(),
            serde_json::Value::Bool(b) => self.write_boolean(*b),
            serde_json::Value::Number(n) => {
                let int = json_number_to_int(n, path)?;
                self.write_integer(&int);
            }
            serde_json::Value::String(s) => self.write_str(s)?,
            serde_json::Value::Array(arr) => {
                if arr.is_empty() {
                    self.writer.u8(Opcode::EmptyList.into());
                    return Ok(());
                }
                self.writer.u8(Opcode::Mark.into());
                for (i, item) in arr.iter().enumerate() {
                    let len = path.len();
                    path.push_str(&format!("[{i}]"));
                    self.write_json(item, path)?;
                    path.truncate(len);
                }
                self.writer.u8(Opcode::List.into());
            }
            serde_json::Value::Object(_) => {
                return Err(EncodeError::NotEncodable(format!("object at {path}")));
            }
        }
        Ok(())
    }

    pub fn write_none(&mut self) {
        self.writer.u8(Opcode::None.into());
    }

    pub fn write_boolean(&mut self, b: bool) {
        let op = if b { Opcode::NewTrue } else { Opcode::NewFalse };
        self.writer.u8(op.into());
    }

    pub fn write_integer(&mut self, int: &BigInt) {
        if let Some(small) = int.to_i64() {
            if self.write_small_int(small) {
                return;
            }
        }
        let encoded = encode_long(int);
        if encoded.len() <= SHORT_LEN_MAX {
            self.writer.u8u8(Opcode::Long1.into(), encoded.len() as u8);
        } else {
            // A BigInt needing more than 2 GiB of bytes cannot be held in memory.
            self.writer.u8i32(Opcode::Long4.into(), encoded.len() as i32);
        }
        self.writer.buf(&encoded);
    }

    /// Writes `int` in one of the fixed-width forms. Returns false if it
    /// needs a long form.
    fn write_small_int(&mut self, int: i64) -> bool {
        if (0..=0xff).contains(&int) {
            self.writer.u8u8(Opcode::BinInt1.into(), int as u8);
        } else if (0..=0xffff).contains(&int) {
            self.writer.u8u16(Opcode::BinInt2.into(), int as u16);
        } else if let Ok(int) = i32::try_from(int) {
            self.writer.u8i32(Opcode::BinInt.into(), int);
        } else {
            return false;
        }
        true
    }

    pub fn write_bin(&mut self, buf: &[u8]) -> Result<(), EncodeError> {
        if buf.len() <= SHORT_LEN_MAX {
            self.writer.u8u8(Opcode::ShortBinString.into(), buf.len() as u8);
        } else {
            let len = length_prefix(buf.len(), "bytes")?;
            self.writer.u8i32(Opcode::BinString.into(), len);
        }
        self.writer.buf(buf);
        Ok(())
    }

    /// Text always uses the 4-byte length form.
    pub fn write_str(&mut self, s: &str) -> Result<(), EncodeError> {
        let len = length_prefix(s.len(), "text")?;
        self.writer.u8i32(Opcode::BinUnicode.into(), len);
        self.writer.utf8(s);
        Ok(())
    }

    pub fn write_tuple(&mut self, items: &[PekelValue]) -> Result<(), EncodeError> {
        match Opcode::for_small_tuple(items.len()) {
            Some(op) => {
                for item in items {
                    self.write_any(item)?;
                }
                self.writer.u8(op.into());
            }
            None => {
                self.writer.u8(Opcode::Mark.into());
                for item in items {
                    self.write_any(item)?;
                }
                self.writer.u8(Opcode::Tuple.into());
            }
        }
        Ok(())
    }

    pub fn write_list(&mut self, items: &[PekelValue]) -> Result<(), EncodeError> {
        if items.is_empty() {
            self.writer.u8(Opcode::EmptyList.into());
            return Ok(());
        }
        self.writer.u8(Opcode::Mark.into());
        for item in items {
            self.write_any(item)?;
        }
        self.writer.u8(Opcode::List.into());
        Ok(())
    }
}

fn length_prefix(len: usize, what: &str) -> Result<i32, EncodeError> {
    i32::try_from(len).map_err(|_| {
        EncodeError::NotEncodable(format!(
            "{what} of {len} bytes exceeds the 4-byte length prefix"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn enc(value: impl Into<PekelValue>) -> Vec<u8> {
        PekelEncoder::new().encode(&value.into()).unwrap()
    }

    #[test]
    fn header_and_terminator_frame_the_body() {
        assert_eq!(enc(()), [0x80, 0x02, b'N', b'.']);
        assert_eq!(enc(true), [0x80, 0x02, 0x88, b'.']);
        assert_eq!(enc(false), [0x80, 0x02, 0x89, b'.']);
    }

    #[test]
    fn integer_size_classes() {
        assert_eq!(enc(255), [0x80, 0x02, b'K', 0xff, b'.']);
        assert_eq!(enc(256), [0x80, 0x02, b'M', 0x00, 0x01, b'.']);
        assert_eq!(enc(65535), [0x80, 0x02, b'M', 0xff, 0xff, b'.']);
        assert_eq!(enc(65536), [0x80, 0x02, b'J', 0x00, 0x00, 0x01, 0x00, b'.']);
        assert_eq!(enc(-1), [0x80, 0x02, b'J', 0xff, 0xff, 0xff, 0xff, b'.']);
        assert_eq!(enc(i32::MIN), [0x80, 0x02, b'J', 0x00, 0x00, 0x00, 0x80, b'.']);
        assert_eq!(
            enc(i32::MIN as i64 - 1),
            [0x80, 0x02, 0x8a, 0x05, 0xff, 0xff, 0xff, 0x7f, 0xff, b'.']
        );
    }

    #[test]
    fn long4_for_integers_over_255_bytes() {
        let value = BigInt::from(1) << 2040usize;
        let out = enc(value);
        assert_eq!(out[2], 0x8b);
        assert_eq!(&out[3..7], &256i32.to_le_bytes());
        assert_eq!(out.len(), 2 + 1 + 4 + 256 + 1);
    }

    #[test]
    fn bytes_switch_to_long_form_after_255() {
        let short = enc(vec![b'x'; 255]);
        assert_eq!(&short[2..4], &[b'U', 0xff]);
        let long = enc(vec![b'x'; 256]);
        assert_eq!(&long[2..7], &[b'T', 0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn text_has_no_short_form() {
        assert_eq!(
            enc("é"),
            [0x80, 0x02, b'X', 0x02, 0x00, 0x00, 0x00, 0xc3, 0xa9, b'.']
        );
    }

    #[test]
    fn small_tuples_never_mark() {
        for arity in 0..=3 {
            let tuple = PekelValue::Tuple((0..arity).map(PekelValue::from).collect());
            assert!(!enc(tuple).contains(&b'('), "arity {arity}");
        }
        let tuple = PekelValue::Tuple((0..4).map(PekelValue::from).collect());
        assert_eq!(enc(tuple)[2], b'(');
    }

    #[test]
    fn nested_containers() {
        let value = PekelValue::List(vec![PekelValue::Tuple(vec![]), PekelValue::List(vec![])]);
        assert_eq!(enc(value), [0x80, 0x02, b'(', b')', b']', b'l', b'.']);
    }

    #[test]
    fn encoder_is_reusable() {
        let mut encoder = PekelEncoder::with_alloc_size(8);
        let a = encoder.encode(&PekelValue::from(vec![0u8; 100])).unwrap();
        let b = encoder.encode(&PekelValue::from(1)).unwrap();
        assert_eq!(a.len(), 2 + 2 + 100 + 1);
        assert_eq!(b, [0x80, 0x02, b'K', 0x01, b'.']);
    }

    #[test]
    fn json_matches_value_encoding() {
        let doc = json!([null, true, 300, "hi", [], [1, [2]]]);
        let direct = PekelEncoder::new().encode_json(&doc).unwrap();
        let via_value = enc(PekelValue::try_from(&doc).unwrap());
        assert_eq!(direct, via_value);
    }

    #[test]
    fn json_rejection_discards_partial_output() {
        let mut encoder = PekelEncoder::new();
        let err = encoder.encode_json(&json!([1, 2, {"k": 3}])).unwrap_err();
        assert!(matches!(err, EncodeError::NotEncodable(msg) if msg == "object at $[2]"));
        let err = encoder.encode_json(&json!(0.5)).unwrap_err();
        assert!(matches!(err, EncodeError::NotEncodable(_)));
        // No leftovers from the failed calls.
        assert_eq!(
            encoder.encode(&PekelValue::Unit).unwrap(),
            [0x80, 0x02, b'N', b'.']
        );
    }

    #[test]
    fn write_to_stream() {
        let mut out = Vec::new();
        PekelEncoder::new()
            .write_to(&PekelValue::from(0), &mut out)
            .unwrap();
        assert_eq!(out, [0x80, 0x02, b'K', 0x00, b'.']);
    }
}
