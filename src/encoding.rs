//! Length-prefixed encoding helpers for wire formats.

use crate::types::Error;

pub fn enc_len(len: usize) -> Result<[u8; 4], Error> {
    // Lengths are encoded as 4-byte big-endian.
    if len > u32::MAX as usize {
        return Err(Error::InvalidEncoding);
    }
    Ok((len as u32).to_be_bytes())
}

/// Append-only builder for a canonical encoding.
#[derive(Default)]
pub struct Writer {
    out: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(mut self, v: u8) -> Self {
        self.out.push(v);
        self
    }

    pub fn u32(mut self, v: u32) -> Self {
        self.out.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn fixed(mut self, bytes: &[u8]) -> Self {
        self.out.extend_from_slice(bytes);
        self
    }

    /// Length-prefix encoding: [len||bytes].
    pub fn bytes(mut self, bytes: &[u8]) -> Result<Self, Error> {
        self.out.extend_from_slice(&enc_len(bytes.len())?);
        self.out.extend_from_slice(bytes);
        Ok(self)
    }

    pub fn finish(self) -> Vec<u8> {
        self.out
    }
}

/// Cursor over an encoded buffer; every read is bounds-checked.
pub struct Reader<'a> {
    input: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input }
    }

    pub fn fixed<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        if self.input.len() < N {
            return Err(Error::InvalidEncoding);
        }
        let mut raw = [0u8; N];
        raw.copy_from_slice(&self.input[..N]);
        self.input = &self.input[N..];
        Ok(raw)
    }

    pub fn u8(&mut self) -> Result<u8, Error> {
        Ok(self.fixed::<1>()?[0])
    }

    pub fn u32(&mut self) -> Result<u32, Error> {
        Ok(u32::from_be_bytes(self.fixed::<4>()?))
    }

    /// Decode a single length-prefixed byte string.
    pub fn bytes(&mut self) -> Result<&'a [u8], Error> {
        let len = self.u32()? as usize;
        if self.input.len() < len {
            return Err(Error::InvalidEncoding);
        }
        let (data, rest) = self.input.split_at(len);
        self.input = rest;
        Ok(data)
    }

    /// Fails unless the whole buffer was consumed.
    pub fn finish(self) -> Result<(), Error> {
        if !self.input.is_empty() {
            return Err(Error::InvalidEncoding);
        }
        Ok(())
    }
}
