//! Little-endian binary encoding for snapshots and recordings.
//!
//! Layout conventions:
//! - fixed-width integers are little-endian, `bool` is one byte
//! - sequences of records carry a `u16` count prefix
//! - byte blobs carry an `i32` length prefix
//!
//! Versioned aggregates write their own leading version byte.

use crate::error::CodecError;

/// Growable output buffer.
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    bytes: Vec<u8>,
}

impl Encoder {
    /// Create an empty encoder.
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Consume the encoder and return the written bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Write a `u8`.
    pub fn put_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    /// Write a `bool` as one byte.
    pub fn put_bool(&mut self, value: bool) {
        self.bytes.push(u8::from(value));
    }

    /// Write a `u16`.
    pub fn put_u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Write an `i32`.
    pub fn put_i32(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a `u32`.
    pub fn put_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a `u64`.
    pub fn put_u64(&mut self, value: u64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Write raw bytes without a prefix.
    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Write a byte blob with an `i32` length prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob is longer than `i32::MAX`.
    pub fn put_blob(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        let len = i32::try_from(bytes.len()).map_err(|_| CodecError::CountOverflow {
            len: bytes.len(),
            width: 32,
        })?;
        self.put_i32(len);
        self.put_raw(bytes);
        Ok(())
    }

    /// Write a UTF-8 string with a `u8` length prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is longer than 255 bytes.
    pub fn put_str(&mut self, text: &str) -> Result<(), CodecError> {
        let len = u8::try_from(text.len()).map_err(|_| CodecError::CountOverflow {
            len: text.len(),
            width: 8,
        })?;
        self.put_u8(len);
        self.put_raw(text.as_bytes());
        Ok(())
    }

    /// Write a `u16` count prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if `len` exceeds `u16::MAX`.
    pub fn put_count(&mut self, len: usize) -> Result<(), CodecError> {
        let count = u16::try_from(len).map_err(|_| CodecError::CountOverflow { len, width: 16 })?;
        self.put_u16(count);
        Ok(())
    }

    /// Write a slice of records with a `u16` count prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is too long or a record fails to encode.
    pub fn put_seq<T: Encode>(&mut self, items: &[T]) -> Result<(), CodecError> {
        self.put_count(items.len())?;
        for item in items {
            item.encode(self)?;
        }
        Ok(())
    }
}

/// Cursor over an input byte slice.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Decoder<'a> {
    /// Create a decoder at the start of `bytes`.
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Fail unless every byte has been consumed.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TrailingBytes`] if input remains.
    pub const fn finish(&self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .offset
            .checked_add(needed)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(CodecError::Truncated {
                offset: self.offset,
                needed,
            })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read a `u8`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is exhausted.
    pub fn get_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take_array::<1>()?[0])
    }

    /// Read a one-byte `bool`; any non-zero byte is `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is exhausted.
    pub fn get_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.get_u8()? != 0)
    }

    /// Read a `u16`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is exhausted.
    pub fn get_u16(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    /// Read an `i32`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is exhausted.
    pub fn get_i32(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    /// Read a `u32`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is exhausted.
    pub fn get_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    /// Read a `u64`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is exhausted.
    pub fn get_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    /// Read `len` raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is exhausted.
    pub fn get_raw(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        self.take(len)
    }

    /// Read a byte blob with an `i32` length prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the length is negative or the input is exhausted.
    pub fn get_blob(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.get_i32()?;
        let len = usize::try_from(len).map_err(|_| CodecError::NegativeLength(len))?;
        Ok(self.take(len)?.to_vec())
    }

    /// Read a UTF-8 string with a `u8` length prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is exhausted or not valid UTF-8.
    pub fn get_str(&mut self) -> Result<String, CodecError> {
        let len = usize::from(self.get_u8()?);
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    /// Read a version byte and check it against the newest known version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version is zero or newer than `supported`.
    pub fn get_version(&mut self, record: &'static str, supported: u8) -> Result<u8, CodecError> {
        let found = self.get_u8()?;
        if found == 0 || found > supported {
            return Err(CodecError::UnsupportedVersion {
                record,
                found,
                supported,
            });
        }
        Ok(found)
    }

    /// Read a `u16`-prefixed sequence of records.
    ///
    /// # Errors
    ///
    /// Returns an error if any record fails to decode.
    pub fn get_seq<T: Decode>(&mut self) -> Result<Vec<T>, CodecError> {
        let count = usize::from(self.get_u16()?);
        let mut items = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            items.push(T::decode(self)?);
        }
        Ok(items)
    }
}

/// A record with a fixed binary layout.
pub trait Encode {
    /// Append this record to `enc`.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested collection overflows its count prefix.
    fn encode(&self, enc: &mut Encoder) -> Result<(), CodecError>;

    /// Encode into a fresh byte vector.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut enc = Encoder::new();
        self.encode(&mut enc)?;
        Ok(enc.into_bytes())
    }
}

/// A record that can be read back from its binary layout.
pub trait Decode: Sized {
    /// Read one record from `dec`.
    ///
    /// # Errors
    ///
    /// Returns an error on truncated or malformed input.
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, CodecError>;

    /// Decode a complete byte slice, rejecting trailing bytes.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed input or trailing bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(bytes);
        let value = Self::decode(&mut dec)?;
        dec.finish()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_little_endian() {
        let mut enc = Encoder::new();
        enc.put_u16(0x0102);
        enc.put_i32(-2);
        enc.put_bool(true);
        let bytes = enc.into_bytes();
        assert_eq!(bytes, vec![0x02, 0x01, 0xFE, 0xFF, 0xFF, 0xFF, 1]);

        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.get_u16().unwrap(), 0x0102);
        assert_eq!(dec.get_i32().unwrap(), -2);
        assert!(dec.get_bool().unwrap());
        assert!(dec.finish().is_ok());
    }

    #[test]
    fn test_truncated_input() {
        let mut dec = Decoder::new(&[1, 2, 3]);
        let err = dec.get_u32().unwrap_err();
        assert!(matches!(err, CodecError::Truncated { offset: 0, needed: 4 }));
    }

    #[test]
    fn test_blob_prefix() {
        let mut enc = Encoder::new();
        enc.put_blob(&[9, 8, 7]).unwrap();
        let bytes = enc.into_bytes();
        assert_eq!(&bytes[..4], &3i32.to_le_bytes());

        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.get_blob().unwrap(), vec![9, 8, 7]);
    }

    #[test]
    fn test_string_prefix() {
        let mut enc = Encoder::new();
        enc.put_str("ur").unwrap();
        let bytes = enc.into_bytes();
        assert_eq!(bytes, vec![2, b'u', b'r']);
        assert_eq!(Decoder::new(&bytes).get_str().unwrap(), "ur");

        let long = "x".repeat(256);
        assert!(matches!(
            Encoder::new().put_str(&long),
            Err(CodecError::CountOverflow { width: 8, .. })
        ));
        assert!(matches!(
            Decoder::new(&[1, 0xFF]).get_str(),
            Err(CodecError::InvalidUtf8)
        ));
    }

    #[test]
    fn test_negative_blob_length() {
        let bytes = (-1i32).to_le_bytes();
        let mut dec = Decoder::new(&bytes);
        assert!(matches!(
            dec.get_blob(),
            Err(CodecError::NegativeLength(-1))
        ));
    }

    #[test]
    fn test_version_check() {
        let mut dec = Decoder::new(&[3]);
        let err = dec.get_version("rules", 2).unwrap_err();
        assert!(matches!(
            err,
            CodecError::UnsupportedVersion { found: 3, supported: 2, .. }
        ));
    }

    #[test]
    fn test_count_overflow() {
        let mut enc = Encoder::new();
        assert!(enc.put_count(70_000).is_err());
        assert!(enc.put_count(65_535).is_ok());
    }
}
