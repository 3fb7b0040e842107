//! WebAssembly module binary support.
//!
//! The backend's collaborator on the input side: section-structured binary
//! data is decoded into the structured descriptors the pipeline consumes.
//! Only the pieces the backend needs are implemented — LEB128 integers
//! ([`leb128`]) and import section entries ([`import`]) — not every module
//! section format.
//!
//! The decoder is also where each local function gets the stable
//! diagnostic identity ([`function_label`]) that tags stage dumps and
//! determinism-verifier snapshots.

pub mod import;
pub mod leb128;

use thiserror::Error;

pub use import::{
    decode_import, encode_import, ExternType, Features, GlobalType, Import, ImportDesc, Limits,
    MemoryType, TableType, ValType,
};

/// Error type for module binary decoding and encoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BinaryError {
    #[error("unexpected end of section data")]
    UnexpectedEof,

    #[error("malformed UTF-8 in {context}")]
    InvalidUtf8 { context: &'static str },

    #[error("LEB128 value does not fit in u32")]
    Leb128Overflow,

    #[error("invalid byte for {context}: {value:#04x}")]
    InvalidByte { context: &'static str, value: u8 },

    #[error("mutable globals are not enabled in the configured feature set")]
    MutableGlobalsDisabled,

    #[error("import[{index}] error decoding {field}: {source}")]
    ImportField {
        index: u32,
        field: &'static str,
        #[source]
        source: Box<BinaryError>,
    },

    #[error("encoding {kind} imports is not implemented")]
    UnsupportedEncode { kind: &'static str },
}

/// Forward-only cursor over one section's bytes.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// True when the cursor has consumed the whole buffer.
    pub fn is_at_end(&self) -> bool {
        self.pos == self.buf.len()
    }

    pub fn read_byte(&mut self) -> Result<u8, BinaryError> {
        let byte = *self.buf.get(self.pos).ok_or(BinaryError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], BinaryError> {
        let end = self.pos.checked_add(len).ok_or(BinaryError::UnexpectedEof)?;
        let bytes = self.buf.get(self.pos..end).ok_or(BinaryError::UnexpectedEof)?;
        self.pos = end;
        Ok(bytes)
    }
}

/// Stable diagnostic identity for a local function.
///
/// Uses the name-section name when the module carries one and an
/// index-derived label otherwise, so every function has a printable key
/// for stage dumps and verifier snapshots.
pub fn function_label(index: u32, name: Option<&str>) -> String {
    match name {
        Some(name) => name.to_string(),
        None => format!("function[{index}]"),
    }
}
