//! Minimal BCS (Binary Canonical Serialization) writer.
//!
//! Only the shapes the rotation payloads need: fixed-width little-endian
//! integers, fixed byte arrays, ULEB128-length-prefixed byte vectors and
//! strings, and enum variant tags. BCS has exactly one encoding per value,
//! which is what lets the chain rebuild signed bytes independently.

/// Append-only BCS encoder.
#[derive(Debug, Default, Clone)]
pub struct BcsWriter {
    buf: Vec<u8>,
}

impl BcsWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// ULEB128 length / variant index.
    pub fn uleb128(&mut self, mut value: u64) -> &mut Self {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.buf.push(byte);
                return self;
            }
            self.buf.push(byte | 0x80);
        }
    }

    /// Enum variant tag.
    pub fn variant(&mut self, index: u32) -> &mut Self {
        self.uleb128(u64::from(index))
    }

    /// Fixed-size array (e.g. an account address): no length prefix.
    pub fn fixed(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// `vector<u8>`: length prefix followed by the bytes.
    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.uleb128(bytes.len() as u64);
        self.fixed(bytes)
    }

    /// UTF-8 string, encoded like `vector<u8>`.
    pub fn str(&mut self, value: &str) -> &mut Self {
        self.bytes(value.as_bytes())
    }

    /// Sequence length prefix; the caller writes the elements.
    pub fn seq_len(&mut self, len: usize) -> &mut Self {
        self.uleb128(len as u64)
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Encode a single value as a standalone `vector<u8>` (entry function
/// arguments are each BCS-encoded on their own).
pub fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut w = BcsWriter::new();
    w.bytes(bytes);
    w.finish()
}
