//! `PekelDecoder`: a stack machine that rebuilds values from opcodes.
//!
//! Each opcode either pushes a value, pushes a mark, or folds entries at the
//! top of the stack into a container. Containers are assembled from the
//! stack rather than by recursion, so nesting depth in the input never
//! grows the call stack.

use pekel_buffers::Reader;
use tracing::{debug, trace};

use crate::constants::{Opcode, PROTOCOL_VERSION};
use crate::long::decode_long;
use crate::source::Source;
use crate::{DecodeError, MalformedKind, PekelValue};

/// Decoder limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Maximum container nesting. A scalar has depth 0, `[1]` has depth 1.
    pub max_depth: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self { max_depth: 512 }
    }
}

#[derive(Debug)]
enum Slot {
    Mark,
    Value { value: PekelValue, depth: usize },
}

pub struct PekelDecoder {
    options: DecoderOptions,
    stack: Vec<Slot>,
    /// Stack indices of every `Slot::Mark`, innermost last.
    marks: Vec<usize>,
}

impl Default for PekelDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PekelDecoder {
    pub fn new() -> Self {
        Self::with_options(DecoderOptions::default())
    }

    pub fn with_options(options: DecoderOptions) -> Self {
        Self {
            options,
            stack: Vec::new(),
            marks: Vec::new(),
        }
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Decodes one stream from the start of `input`. Bytes after the
    /// terminator are ignored.
    pub fn decode(&mut self, input: &[u8]) -> Result<PekelValue, DecodeError> {
        self.decode_with_consumed(input).map(|(value, _)| value)
    }

    /// Like [`decode`](Self::decode), also returning how many bytes the
    /// stream occupied, terminator included.
    pub fn decode_with_consumed(&mut self, input: &[u8]) -> Result<(PekelValue, usize), DecodeError> {
        let mut reader = Reader::new(input);
        let value = self.read(&mut reader)?;
        Ok((value, reader.x))
    }

    /// Runs the dispatch loop until `STOP`.
    pub fn read<S: Source>(&mut self, src: &mut S) -> Result<PekelValue, DecodeError> {
        self.stack.clear();
        self.marks.clear();
        let result = self.run(src);
        match &result {
            Ok(_) => debug!(offset = src.offset(), "pekel decode"),
            Err(e) => debug!(offset = src.offset(), "pekel decode failed: {e}"),
        }
        self.stack.clear();
        self.marks.clear();
        result
    }

    fn run<S: Source>(&mut self, src: &mut S) -> Result<PekelValue, DecodeError> {
        loop {
            let offset = src.offset();
            let byte = src.byte()?;
            let op = Opcode::try_from(byte)
                .map_err(|_| DecodeError::UnrecognizedOpcode { opcode: byte, offset })?;
            trace!(offset, ?op, depth = self.stack.len());
            if op == Opcode::Stop {
                break;
            }
            self.dispatch(op, src)?;
        }
        if self.stack.len() != 1 {
            return Err(MalformedKind::StrayData(self.stack.len()).into());
        }
        match self.stack.pop() {
            Some(Slot::Value { value, .. }) => Ok(value),
            // A lone mark is stray data too.
            _ => Err(MalformedKind::StrayData(1).into()),
        }
    }

    fn dispatch<S: Source>(&mut self, op: Opcode, src: &mut S) -> Result<(), DecodeError> {
        match op {
            Opcode::Proto => {
                let version = src.byte()?;
                if version != PROTOCOL_VERSION {
                    return Err(DecodeError::UnsupportedVersion(version));
                }
            }
            Opcode::Stop => {}
            Opcode::None => self.push(PekelValue::Unit),
            Opcode::NewTrue => self.push(PekelValue::Bool(true)),
            Opcode::NewFalse => self.push(PekelValue::Bool(false)),
            Opcode::BinInt1 => {
                let v = src.byte()?;
                self.push(v.into());
            }
            Opcode::BinInt2 => {
                let v = src.u16_le()?;
                self.push(v.into());
            }
            Opcode::BinInt => {
                let v = src.i32_le()?;
                self.push(v.into());
            }
            Opcode::Long1 => {
                let size = src.byte()? as usize;
                let data = src.take(size)?;
                self.push(PekelValue::Integer(decode_long(&data)));
            }
            Opcode::Long4 => {
                let size = read_len(src)?;
                let data = src.take(size)?;
                self.push(PekelValue::Integer(decode_long(&data)));
            }
            Opcode::ShortBinString => {
                let size = src.byte()? as usize;
                let data = src.take(size)?;
                self.push(PekelValue::Bytes(data));
            }
            Opcode::BinString => {
                let size = read_len(src)?;
                let data = src.take(size)?;
                self.push(PekelValue::Bytes(data));
            }
            Opcode::BinUnicode => {
                let size = read_len(src)?;
                let text = src.text(size)?;
                self.push(PekelValue::Text(text));
            }
            Opcode::Mark => {
                self.marks.push(self.stack.len());
                self.stack.push(Slot::Mark);
            }
            Opcode::EmptyTuple => self.push_container(PekelValue::Tuple(Vec::new()), 0)?,
            Opcode::EmptyList => self.push_container(PekelValue::List(Vec::new()), 0)?,
            Opcode::Tuple1 | Opcode::Tuple2 | Opcode::Tuple3 => {
                let n = op.tuple_arity().unwrap_or_default();
                let (items, depth) = self.pop_top(op, n)?;
                self.push_container(PekelValue::Tuple(items), depth)?;
            }
            Opcode::Tuple => {
                let (items, depth) = self.pop_to_mark()?;
                self.push_container(PekelValue::Tuple(items), depth)?;
            }
            Opcode::List => {
                let (items, depth) = self.pop_to_mark()?;
                self.push_container(PekelValue::List(items), depth)?;
            }
        }
        Ok(())
    }

    fn push(&mut self, value: PekelValue) {
        self.stack.push(Slot::Value { value, depth: 0 });
    }

    /// Pushes a container whose deepest element has nesting `inner`.
    fn push_container(&mut self, value: PekelValue, inner: usize) -> Result<(), DecodeError> {
        let depth = inner + 1;
        if depth > self.options.max_depth {
            return Err(DecodeError::DepthLimit {
                limit: self.options.max_depth,
            });
        }
        self.stack.push(Slot::Value { value, depth });
        Ok(())
    }

    /// Pops the top `n` values, which must all sit above the nearest mark.
    fn pop_top(&mut self, op: Opcode, n: usize) -> Result<(Vec<PekelValue>, usize), DecodeError> {
        let floor = self.marks.last().map_or(0, |m| m + 1);
        let available = self.stack.len() - floor;
        if available < n {
            return Err(MalformedKind::StackUnderflow {
                opcode: op.into(),
                needed: n,
                available,
            }
            .into());
        }
        let start = self.stack.len() - n;
        Ok(self.drain_values(start))
    }

    /// Pops everything above the nearest mark, and the mark itself.
    fn pop_to_mark(&mut self) -> Result<(Vec<PekelValue>, usize), DecodeError> {
        let mark = self.marks.pop().ok_or(MalformedKind::MissingMark)?;
        let result = self.drain_values(mark + 1);
        self.stack.truncate(mark);
        Ok(result)
    }

    /// Removes the values from `start` to the top, in original order, along
    /// with their maximum depth. Callers ensure no mark lies in that range.
    fn drain_values(&mut self, start: usize) -> (Vec<PekelValue>, usize) {
        let mut depth = 0;
        let items: Vec<PekelValue> = self
            .stack
            .drain(start..)
            .filter_map(|slot| match slot {
                Slot::Value { value, depth: d } => {
                    depth = depth.max(d);
                    Some(value)
                }
                Slot::Mark => None,
            })
            .collect();
        (items, depth)
    }
}

/// Reads a 4-byte signed length prefix.
fn read_len<S: Source>(src: &mut S) -> Result<usize, DecodeError> {
    let len = src.i32_le()?;
    usize::try_from(len).map_err(|_| MalformedKind::NegativeLength(len).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn dec(bytes: &[u8]) -> Result<PekelValue, DecodeError> {
        PekelDecoder::new().decode(bytes)
    }

    #[test]
    fn scalars() {
        assert_eq!(dec(b"\x80\x02N.").unwrap(), PekelValue::Unit);
        assert_eq!(dec(b"\x80\x02\x88.").unwrap(), PekelValue::Bool(true));
        assert_eq!(dec(b"\x80\x02K\xff.").unwrap(), PekelValue::from(255));
        assert_eq!(dec(b"\x80\x02M\x00\x01.").unwrap(), PekelValue::from(256));
        assert_eq!(dec(b"\x80\x02J\x00\xff\xff\xff.").unwrap(), PekelValue::from(-256));
        assert_eq!(
            dec(b"\x80\x02\x8a\x05\x00\x00\x00\x80\x00.").unwrap(),
            PekelValue::Integer(BigInt::from(1u64 << 31))
        );
        assert_eq!(dec(b"\x80\x02\x8a\x00.").unwrap(), PekelValue::from(0));
        assert_eq!(
            dec(b"\x80\x02\x8b\x01\x00\x00\x00\xff.").unwrap(),
            PekelValue::from(-1)
        );
        assert_eq!(dec(b"\x80\x02U\x01\xff.").unwrap(), PekelValue::Bytes(vec![0xff]));
        assert_eq!(
            dec(b"\x80\x02T\x02\x00\x00\x00ab.").unwrap(),
            PekelValue::Bytes(b"ab".to_vec())
        );
        assert_eq!(
            dec(b"\x80\x02X\x02\x00\x00\x00\xc3\xa9.").unwrap(),
            PekelValue::from("é")
        );
    }

    #[test]
    fn containers() {
        assert_eq!(dec(b"\x80\x02).").unwrap(), PekelValue::Tuple(vec![]));
        assert_eq!(dec(b"\x80\x02].").unwrap(), PekelValue::List(vec![]));
        assert_eq!(
            dec(b"\x80\x02K\x01K\x02\x86.").unwrap(),
            PekelValue::Tuple(vec![1.into(), 2.into()])
        );
        assert_eq!(
            dec(b"\x80\x02(K\x01K\x02K\x03K\x04t.").unwrap(),
            PekelValue::Tuple((1..=4).map(PekelValue::from).collect())
        );
        assert_eq!(
            dec(b"\x80\x02(K\x01(K\x02l\x85l.").unwrap(),
            PekelValue::List(vec![
                1.into(),
                PekelValue::Tuple(vec![PekelValue::List(vec![2.into()])])
            ])
        );
    }

    #[test]
    fn header_is_optional() {
        assert_eq!(dec(b"K\x07.").unwrap(), PekelValue::from(7));
    }

    #[test]
    fn unsupported_version() {
        let err = dec(b"\x80\x03K\x00.").unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedVersion(3)));
    }

    #[test]
    fn unrecognized_opcode_reports_offset() {
        let err = dec(b"\x80\x02K\x00}.").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnrecognizedOpcode {
                opcode: b'}',
                offset: 4
            }
        ));
    }

    #[test]
    fn stray_data() {
        let err = dec(b"\x80\x02K\x01K\x02.").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MalformedStream(MalformedKind::StrayData(2))
        ));
        let err = dec(b"\x80\x02.").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MalformedStream(MalformedKind::StrayData(0))
        ));
        let err = dec(b"\x80\x02(.").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MalformedStream(MalformedKind::StrayData(1))
        ));
    }

    #[test]
    fn missing_mark() {
        for bytes in [&b"\x80\x02K\x01t."[..], &b"\x80\x02K\x01l."[..]] {
            let err = dec(bytes).unwrap_err();
            assert!(matches!(
                err,
                DecodeError::MalformedStream(MalformedKind::MissingMark)
            ));
        }
    }

    #[test]
    fn small_tuple_cannot_reach_below_mark() {
        let err = dec(b"\x80\x02K\x01(K\x02\x86.").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MalformedStream(MalformedKind::StackUnderflow {
                opcode: 0x86,
                needed: 2,
                available: 1
            })
        ));
        let err = dec(b"\x80\x02\x87.").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MalformedStream(MalformedKind::StackUnderflow { available: 0, .. })
        ));
    }

    #[test]
    fn negative_length() {
        let err = dec(b"\x80\x02T\xff\xff\xff\xff.").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MalformedStream(MalformedKind::NegativeLength(-1))
        ));
    }

    #[test]
    fn truncated_and_empty_input() {
        for bytes in [
            &b""[..],
            &b"\x80"[..],
            &b"\x80\x02K"[..],
            &b"\x80\x02K\x01"[..],
            &b"\x80\x02U\x05abc"[..],
            &b"\x80\x02X\x05\x00\x00"[..],
        ] {
            let err = dec(bytes).unwrap_err();
            assert!(
                matches!(err, DecodeError::MalformedStream(MalformedKind::Truncated)),
                "{bytes:?}: {err:?}"
            );
        }
    }

    #[test]
    fn invalid_utf8_text() {
        let err = dec(b"\x80\x02X\x01\x00\x00\x00\xff.").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MalformedStream(MalformedKind::InvalidUtf8)
        ));
    }

    #[test]
    fn consumed_stops_at_terminator() {
        let (value, used) = PekelDecoder::new()
            .decode_with_consumed(b"\x80\x02K\x01.trailing")
            .unwrap();
        assert_eq!(value, PekelValue::from(1));
        assert_eq!(used, 5);
    }

    #[test]
    fn depth_limit() {
        let mut bytes = b"\x80\x02".to_vec();
        bytes.extend(std::iter::repeat(b'(').take(10));
        bytes.push(b']');
        bytes.extend(std::iter::repeat(b'l').take(10));
        bytes.push(b'.');

        let mut decoder = PekelDecoder::with_options(DecoderOptions { max_depth: 11 });
        let value = decoder.decode(&bytes).unwrap();
        let mut depth = 0;
        let mut cur = &value;
        while let PekelValue::List(items) = cur {
            depth += 1;
            match items.first() {
                Some(next) => cur = next,
                None => break,
            }
        }
        assert_eq!(depth, 11);

        let mut decoder = PekelDecoder::with_options(DecoderOptions { max_depth: 10 });
        let err = decoder.decode(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::DepthLimit { limit: 10 }));
    }

    #[test]
    fn decoder_recovers_after_error() {
        let mut decoder = PekelDecoder::new();
        assert!(decoder.decode(b"\x80\x02(K\x01").is_err());
        assert_eq!(decoder.decode(b"\x80\x02K\x02.").unwrap(), PekelValue::from(2));
    }
}
