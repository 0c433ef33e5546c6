//! Minimal canonical CBOR reader/writer
//!
//! Covers exactly the shapes a Shelley-era transaction uses: unsigned
//! integers, byte and text strings, definite-length arrays and maps, bool
//! and null. Integers use the shortest header form; lengths are always
//! definite, which is what the ledger's canonical form requires.

use crate::error::{AdapterError, Result};

const MAJOR_UINT: u8 = 0;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_SIMPLE: u8 = 7;

const SIMPLE_FALSE: u8 = 0xf4;
const SIMPLE_TRUE: u8 = 0xf5;
const SIMPLE_NULL: u8 = 0xf6;

fn err(msg: impl Into<String>) -> AdapterError {
    AdapterError::Codec(format!("cbor: {}", msg.into()))
}

// ============================================================================
// Writer
// ============================================================================

/// Canonical CBOR writer
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

    fn write_header(&mut self, major: u8, value: u64) {
        let tag = major << 5;
        if value < 24 {
            self.buf.push(tag | value as u8);
        } else if value <= 0xff {
            self.buf.push(tag | 24);
            self.buf.push(value as u8);
        } else if value <= 0xffff {
            self.buf.push(tag | 25);
            self.buf.extend_from_slice(&(value as u16).to_be_bytes());
        } else if value <= 0xffff_ffff {
            self.buf.push(tag | 26);
            self.buf.extend_from_slice(&(value as u32).to_be_bytes());
        } else {
            self.buf.push(tag | 27);
            self.buf.extend_from_slice(&value.to_be_bytes());
        }
    }

    pub fn write_uint(&mut self, value: u64) {
        self.write_header(MAJOR_UINT, value);
    }

    pub fn write_bytes(&mut self, value: &[u8]) {
        self.write_header(MAJOR_BYTES, value.len() as u64);
        self.buf.extend_from_slice(value);
    }

    pub fn write_array_header(&mut self, len: usize) {
        self.write_header(MAJOR_ARRAY, len as u64);
    }

    pub fn write_map_header(&mut self, len: usize) {
        self.write_header(MAJOR_MAP, len as u64);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(if value { SIMPLE_TRUE } else { SIMPLE_FALSE });
    }

    pub fn write_null(&mut self) {
        self.buf.push(SIMPLE_NULL);
    }

    /// Splice an already-encoded value verbatim
    pub fn write_raw(&mut self, raw: &[u8]) {
        self.buf.extend_from_slice(raw);
    }
}

// ============================================================================
// Reader
// ============================================================================

/// CBOR reader that can hand back the raw span of any value
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

    fn read_header(&mut self) -> Result<(u8, u64)> {
        let initial = self.take(1)?[0];
        let major = initial >> 5;
        let info = initial & 0x1f;
        let value = match info {
            0..=23 => info as u64,
            24 => self.take(1)?[0] as u64,
            25 => {
                let b = self.take(2)?;
                u16::from_be_bytes([b[0], b[1]]) as u64
            }
            26 => {
                let b = self.take(4)?;
                u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u64
            }
            27 => {
                let b = self.take(8)?;
                let mut arr = [0u8; 8];
                arr.copy_from_slice(b);
                u64::from_be_bytes(arr)
            }
            _ => return Err(err("indefinite lengths are not canonical")),
        };
        Ok((major, value))
    }

    pub fn read_uint(&mut self) -> Result<u64> {
        match self.read_header()? {
            (MAJOR_UINT, value) => Ok(value),
            (major, _) => Err(err(format!("expected uint, found major {}", major))),
        }
    }

    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        match self.read_header()? {
            (MAJOR_BYTES, len) => self.take(len as usize),
            (major, _) => Err(err(format!("expected bytes, found major {}", major))),
        }
    }

    pub fn read_array_len(&mut self) -> Result<usize> {
        match self.read_header()? {
            (MAJOR_ARRAY, len) => Ok(len as usize),
            (major, _) => Err(err(format!("expected array, found major {}", major))),
        }
    }

    pub fn read_map_len(&mut self) -> Result<usize> {
        match self.read_header()? {
            (MAJOR_MAP, len) => Ok(len as usize),
            (major, _) => Err(err(format!("expected map, found major {}", major))),
        }
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.take(1)?[0] {
            SIMPLE_TRUE => Ok(true),
            SIMPLE_FALSE => Ok(false),
            other => Err(err(format!("expected bool, found 0x{:02x}", other))),
        }
    }

    /// Peek at the next initial byte without consuming it
    pub fn peek(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| err("unexpected end of input"))
    }

    /// Consume the next value and return its raw encoded bytes
    pub fn read_raw_value(&mut self) -> Result<&'a [u8]> {
        let start = self.pos;
        self.skip_value()?;
        Ok(&self.data[start..self.pos])
    }

    /// Skip one value of any supported type
    pub fn skip_value(&mut self) -> Result<()> {
        let (major, value) = self.read_header()?;
        match major {
            MAJOR_UINT | 1 => Ok(()),
            MAJOR_BYTES | MAJOR_TEXT => {
                self.take(value as usize)?;
                Ok(())
            }
            MAJOR_ARRAY => {
                for _ in 0..value {
                    self.skip_value()?;
                }
                Ok(())
            }
            MAJOR_MAP => {
                for _ in 0..value {
                    self.skip_value()?;
                    self.skip_value()?;
                }
                Ok(())
            }
            6 => self.skip_value(),
            MAJOR_SIMPLE => Ok(()),
            _ => Err(err(format!("unsupported major type {}", major))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint_shortest_form() {
        for (value, expected) in [
            (0u64, vec![0x00]),
            (23, vec![0x17]),
            (24, vec![0x18, 24]),
            (255, vec![0x18, 255]),
            (256, vec![0x19, 0x01, 0x00]),
            (65536, vec![0x1a, 0x00, 0x01, 0x00, 0x00]),
            (u32::MAX as u64 + 1, vec![0x1b, 0, 0, 0, 1, 0, 0, 0, 0]),
        ] {
            let mut w = Writer::new();
            w.write_uint(value);
            let bytes = w.into_bytes();
            assert_eq!(bytes, expected, "value {}", value);
            assert_eq!(Reader::new(&bytes).read_uint().unwrap(), value);
        }
    }

    #[test]
    fn test_bytes_and_containers() {
        let mut w = Writer::new();
        w.write_array_header(2);
        w.write_bytes(&[0xde, 0xad]);
        w.write_map_header(1);
        w.write_uint(0);
        w.write_bool(true);
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_array_len().unwrap(), 2);
        assert_eq!(r.read_bytes().unwrap(), &[0xde, 0xad]);
        assert_eq!(r.read_map_len().unwrap(), 1);
        assert_eq!(r.read_uint().unwrap(), 0);
        assert!(r.read_bool().unwrap());
        assert!(r.is_at_end());
    }

    #[test]
    fn test_raw_value_spans() {
        let mut w = Writer::new();
        w.write_array_header(2);
        w.write_map_header(1);
        w.write_uint(7);
        w.write_bytes(&[1, 2, 3]);
        w.write_uint(9);
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        r.read_array_len().unwrap();
        let map_raw = r.read_raw_value().unwrap();
        assert_eq!(map_raw, &[0xa1, 0x07, 0x43, 1, 2, 3]);
        assert_eq!(r.read_uint().unwrap(), 9);
    }

    #[test]
    fn test_indefinite_length_rejected() {
        // 0x9f is an indefinite-length array header
        assert!(Reader::new(&[0x9f]).read_array_len().is_err());
    }
}
