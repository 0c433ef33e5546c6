//! Minimal XDR reader/writer
//!
//! Big-endian 4-byte alignment throughout: unsigned/signed integers,
//! booleans, fixed and variable-length opaque data, and counted arrays are
//! all the Stellar envelope subset needs.

use crate::error::{AdapterError, Result};

fn err(msg: impl Into<String>) -> AdapterError {
    AdapterError::Codec(format!("xdr: {}", msg.into()))
}

/// XDR writer
#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u32(u32::from(value));
    }

    /// Fixed-length opaque: raw bytes, zero-padded to a 4-byte boundary
    pub fn write_opaque_fixed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
        self.pad(data.len());
    }

    /// Variable-length opaque: length word, bytes, padding
    pub fn write_opaque_var(&mut self, data: &[u8]) {
        self.write_u32(data.len() as u32);
        self.write_opaque_fixed(data);
    }

    /// Splice already-encoded XDR verbatim
    pub fn write_raw(&mut self, raw: &[u8]) {
        self.buf.extend_from_slice(raw);
    }

    fn pad(&mut self, len: usize) {
        for _ in 0..(4 - len % 4) % 4 {
            self.buf.push(0);
        }
    }
}

/// XDR reader
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_at_end(&self) -> bool {
        self.pos == self.data.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(err("unexpected end of input"));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(i64::from_be_bytes(arr))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_be_bytes(arr))
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u32()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(err(format!("bad bool {}", other))),
        }
    }

    pub fn read_opaque_fixed(&mut self, len: usize) -> Result<&'a [u8]> {
        let data = self.take(len)?;
        self.take((4 - len % 4) % 4)?;
        Ok(data)
    }

    pub fn read_opaque_var(&mut self, max: usize) -> Result<&'a [u8]> {
        let len = self.read_u32()? as usize;
        if len > max {
            return Err(err(format!("opaque length {} exceeds {}", len, max)));
        }
        self.read_opaque_fixed(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers() {
        let mut w = Writer::new();
        w.write_u32(7);
        w.write_i64(-2);
        w.write_bool(true);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 16);

        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_u32().unwrap(), 7);
        assert_eq!(r.read_i64().unwrap(), -2);
        assert!(r.read_bool().unwrap());
        assert!(r.is_at_end());
    }

    #[test]
    fn test_opaque_padding() {
        let mut w = Writer::new();
        w.write_opaque_var(&[1, 2, 3, 4, 5]);
        let bytes = w.into_bytes();
        // 4 length + 5 data + 3 pad
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[9..], &[0, 0, 0]);

        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_opaque_var(64).unwrap(), &[1, 2, 3, 4, 5]);
        assert!(r.is_at_end());
    }

    #[test]
    fn test_opaque_bound_enforced() {
        let mut w = Writer::new();
        w.write_opaque_var(&[0u8; 80]);
        let bytes = w.into_bytes();
        assert!(Reader::new(&bytes).read_opaque_var(64).is_err());
    }
}
