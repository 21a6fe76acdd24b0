//! Byte inputs the decoder can pull from.

use std::io::{self, Read};

use pekel_buffers::Reader;

use crate::DecodeError;

/// Reads up to this many bytes at a time when a payload length comes from
/// an untrusted stream.
const IO_CHUNK: usize = 64 * 1024;

/// A forward-only byte input.
pub trait Source {
    fn byte(&mut self) -> Result<u8, DecodeError>;

    /// Reads exactly `n` bytes.
    fn take(&mut self, n: usize) -> Result<Vec<u8>, DecodeError>;

    /// Reads exactly `n` bytes of UTF-8 text.
    fn text(&mut self, n: usize) -> Result<String, DecodeError> {
        let bytes = self.take(n)?;
        String::from_utf8(bytes).map_err(|_| crate::MalformedKind::InvalidUtf8.into())
    }

    /// Bytes consumed so far.
    fn offset(&self) -> usize;

    fn u16_le(&mut self) -> Result<u16, DecodeError> {
        let lo = self.byte()?;
        let hi = self.byte()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn i32_le(&mut self) -> Result<i32, DecodeError> {
        let mut buf = [0u8; 4];
        for b in buf.iter_mut() {
            *b = self.byte()?;
        }
        Ok(i32::from_le_bytes(buf))
    }
}

impl Source for Reader<'_> {
    fn byte(&mut self) -> Result<u8, DecodeError> {
        Ok(self.try_u8()?)
    }

    fn take(&mut self, n: usize) -> Result<Vec<u8>, DecodeError> {
        Ok(self.try_buf(n)?.to_vec())
    }

    fn text(&mut self, n: usize) -> Result<String, DecodeError> {
        Ok(self.try_utf8(n)?.to_owned())
    }

    fn offset(&self) -> usize {
        self.x
    }

    fn u16_le(&mut self) -> Result<u16, DecodeError> {
        Ok(self.try_u16()?)
    }

    fn i32_le(&mut self) -> Result<i32, DecodeError> {
        Ok(self.try_i32()?)
    }
}

/// Adapts any [`Read`] into a [`Source`].
///
/// Reads only what the decoder asks for, so the stream is left positioned
/// right after the terminator. Wrap unbuffered handles in a
/// [`std::io::BufReader`].
pub struct IoSource<R> {
    inner: R,
    offset: usize,
}

impl<R: Read> IoSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Source for IoSource<R> {
    fn byte(&mut self) -> Result<u8, DecodeError> {
        let mut b = [0u8; 1];
        self.inner.read_exact(&mut b)?;
        self.offset += 1;
        Ok(b[0])
    }

    fn take(&mut self, n: usize) -> Result<Vec<u8>, DecodeError> {
        // Grow with the data actually received, not with the declared length.
        let mut out = Vec::with_capacity(n.min(IO_CHUNK));
        let read = Read::take(&mut self.inner, n as u64).read_to_end(&mut out)?;
        self.offset += read;
        if read < n {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        Ok(out)
    }

    fn offset(&self) -> usize {
        self.offset
    }
}
