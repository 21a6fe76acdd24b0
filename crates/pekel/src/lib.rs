//! Portable binary serialization in the pickle protocol 2 wire format.
//!
//! Only primitive and container values are supported: `None`, booleans,
//! arbitrary-precision integers, byte strings, text, tuples and lists. No
//! object graphs, no references, no custom types. Streams written here are
//! byte-identical to what other conforming implementations write for the
//! same value.
//!
//! ```
//! use pekel::{decode, encode, PekelValue};
//!
//! let value = PekelValue::List(vec![1.into(), 2.into()]);
//! let bytes = encode(&value).unwrap();
//! assert_eq!(bytes, b"\x80\x02(K\x01K\x02l.");
//! assert_eq!(decode(&bytes).unwrap(), value);
//! ```

mod constants;
mod decoder;
mod encoder;
mod error;
mod long;
mod source;
mod value;

use std::io::{Read, Write};

pub use constants::{Opcode, PROTOCOL_VERSION};
pub use decoder::{DecoderOptions, PekelDecoder};
pub use encoder::PekelEncoder;
pub use error::{DecodeError, EncodeError, MalformedKind};
pub use long::{decode_long, encode_long};
pub use source::{IoSource, Source};
pub use value::PekelValue;

pub use num_bigint::BigInt;

/// Encodes `value` into a new buffer.
pub fn encode(value: &PekelValue) -> Result<Vec<u8>, EncodeError> {
    PekelEncoder::new().encode(value)
}

/// Encodes `value` and writes the whole stream to `out`.
pub fn encode_to<W: Write>(value: &PekelValue, out: &mut W) -> Result<(), EncodeError> {
    PekelEncoder::new().write_to(value, out)
}

/// Decodes one stream from the start of `input`.
pub fn decode(input: &[u8]) -> Result<PekelValue, DecodeError> {
    PekelDecoder::new().decode(input)
}

/// Decodes one stream from `input`, reading nothing past its terminator.
pub fn decode_from<R: Read>(input: R) -> Result<PekelValue, DecodeError> {
    let mut src = IoSource::new(input);
    PekelDecoder::new().read(&mut src)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> PekelValue {
        PekelValue::Tuple(vec![
            PekelValue::Unit,
            true.into(),
            (-70000).into(),
            PekelValue::Integer(BigInt::from(u64::MAX) * 3u32),
            b"raw".to_vec().into(),
            "text".into(),
            PekelValue::List(vec![PekelValue::Tuple(vec![]), 5.into()]),
        ])
    }

    #[test]
    fn buffer_roundtrip() {
        let value = sample();
        let bytes = encode(&value).unwrap();
        assert_eq!(decode(&bytes).unwrap(), value);
    }

    #[test]
    fn stream_roundtrip_leaves_following_data_unread() {
        let mut out = Vec::new();
        encode_to(&sample(), &mut out).unwrap();
        encode_to(&PekelValue::from("second"), &mut out).unwrap();

        let mut cursor = Cursor::new(out);
        assert_eq!(decode_from(&mut cursor).unwrap(), sample());
        assert_eq!(decode_from(&mut cursor).unwrap(), PekelValue::from("second"));
        assert!(decode_from(&mut cursor).is_err());
    }

    #[test]
    fn stream_and_buffer_decoders_agree_on_errors() {
        let bad = b"\x80\x02K\x01K\x02.";
        assert!(matches!(
            decode_from(&bad[..]),
            Err(DecodeError::MalformedStream(MalformedKind::StrayData(2)))
        ));
        assert!(matches!(
            decode(bad),
            Err(DecodeError::MalformedStream(MalformedKind::StrayData(2)))
        ));
    }
}
