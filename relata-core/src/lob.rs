//! Large-object holders used to bind BLOB and CLOB parameters.

use crate::{SqlError, SqlResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Cursor, Read};

/// Longest UTF-8 encoding of one character, in bytes.
const MAX_UTF8_LEN: u64 = 4;

fn reader_error(e: impl fmt::Display) -> SqlError {
    SqlError::InvalidArgument {
        argument: "reader".to_string(),
        reason: e.to_string(),
    }
}

/// Binary payload plus declared length for a BLOB parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobData {
    data: Vec<u8>,
}

impl BlobData {
    /// Wrap an in-memory byte sequence.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    /// Read exactly `length` bytes from a stream.
    ///
    /// Fails when the stream ends before `length` bytes were read. The
    /// buffer grows with the data actually read, not with `length`.
    pub fn from_reader<R: Read>(reader: R, length: usize) -> SqlResult<Self> {
        let mut data = Vec::new();
        reader
            .take(length as u64)
            .read_to_end(&mut data)
            .map_err(reader_error)?;
        if data.len() < length {
            return Err(SqlError::InvalidArgument {
                argument: "length".to_string(),
                reason: format!("stream ended after {} of {} bytes", data.len(), length),
            });
        }
        Ok(Self { data })
    }

    /// Encode text as UTF-8 bytes.
    pub fn from_text(text: &str) -> Self {
        Self {
            data: text.as_bytes().to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Stream view of the payload, as a driver would consume it.
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(&self.data)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl fmt::Display for BlobData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.data))
    }
}

/// Character payload plus declared length for a CLOB parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClobData {
    text: String,
}

impl ClobData {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Read `length` characters from a UTF-8 stream.
    ///
    /// At most `4 * length` bytes are consumed. Fails when the stream is not
    /// valid UTF-8 or holds fewer characters.
    pub fn from_reader<R: Read>(reader: R, length: usize) -> SqlResult<Self> {
        let mut bytes = Vec::new();
        reader
            .take((length as u64).saturating_mul(MAX_UTF8_LEN))
            .read_to_end(&mut bytes)
            .map_err(reader_error)?;
        let text = match std::str::from_utf8(&bytes) {
            Ok(text) => text,
            // the byte limit may cut the last character short
            Err(e) if e.error_len().is_none() => {
                std::str::from_utf8(&bytes[..e.valid_up_to()]).map_err(reader_error)?
            }
            Err(e) => return Err(reader_error(e)),
        };
        let available = text.chars().count();
        if available < length {
            return Err(SqlError::InvalidArgument {
                argument: "length".to_string(),
                reason: format!("stream ended after {} of {} characters", available, length),
            });
        }
        Ok(Self {
            text: text.chars().take(length).collect(),
        })
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.text.as_bytes())
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for ClobData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_from_reader_reads_declared_length() {
        let source: &[u8] = b"abcdef";
        let blob = BlobData::from_reader(source, 4).unwrap();
        assert_eq!(blob.as_bytes(), b"abcd");
        assert_eq!(blob.len(), 4);
    }

    #[test]
    fn test_blob_from_short_reader_fails() {
        let source: &[u8] = b"ab";
        let err = BlobData::from_reader(source, 4).unwrap_err();
        assert!(matches!(err, SqlError::InvalidArgument { .. }));
    }

    #[test]
    fn test_blob_reader_yields_payload() {
        let blob = BlobData::from_text("hi");
        let mut out = Vec::new();
        blob.reader().read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hi");
        assert_eq!(blob.to_string(), "6869");
    }

    #[test]
    fn test_clob_counts_characters_not_bytes() {
        let clob = ClobData::new("grüße");
        assert_eq!(clob.len(), 5);
        assert!(clob.as_str().len() > 5);
    }

    #[test]
    fn test_clob_from_reader_truncates_to_length() {
        let source: &[u8] = "grüße welt".as_bytes();
        let clob = ClobData::from_reader(source, 5).unwrap();
        assert_eq!(clob.as_str(), "grüße");
    }

    #[test]
    fn test_clob_from_short_reader_fails() {
        let source: &[u8] = b"abc";
        assert!(ClobData::from_reader(source, 10).is_err());
    }

    #[test]
    fn test_oversized_declared_length_is_an_error() {
        let source: &[u8] = b"ab";
        let err = BlobData::from_reader(source, usize::MAX).unwrap_err();
        assert!(matches!(err, SqlError::InvalidArgument { .. }));
        let source: &[u8] = b"ab";
        assert!(ClobData::from_reader(source, usize::MAX).is_err());
    }

    #[test]
    fn test_clob_read_is_bounded_by_length() {
        let clob = ClobData::from_reader(std::io::repeat(b'a'), 3).unwrap();
        assert_eq!(clob.as_str(), "aaa");
        // four bytes per character cover the widest encoding
        let source = "€€€€".as_bytes();
        assert_eq!(ClobData::from_reader(source, 2).unwrap().as_str(), "€€");
    }

    #[test]
    fn test_clob_rejects_invalid_utf8() {
        let source: &[u8] = &[b'a', 0xFF, b'b'];
        assert!(ClobData::from_reader(source, 3).is_err());
    }
}
