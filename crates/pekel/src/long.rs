//! Two's-complement byte form of arbitrary-precision integers.
//!
//! Used by the `LONG1`/`LONG4` opcodes. Bytes are little-endian and minimal:
//! the most significant byte carries the sign bit and no redundant
//! sign-extension byte is kept. Zero is the empty sequence.

use num_bigint::BigInt;
use num_traits::Zero;

pub fn encode_long(value: &BigInt) -> Vec<u8> {
    if value.is_zero() {
        return Vec::new();
    }
    value.to_signed_bytes_le()
}

pub fn decode_long(bytes: &[u8]) -> BigInt {
    if bytes.is_empty() {
        return BigInt::zero();
    }
    BigInt::from_signed_bytes_le(bytes)
}
