//! Import section entries of the module binary format.
//!
//! Decoding covers all four import kinds. Encoding is only implemented
//! for function imports; the non-function encode paths were never
//! implemented in the original system and stay a surfaced gap here rather
//! than guessing at a format.

use super::{leb128, BinaryError, ByteReader};

/// The kind of entity an import (or export) refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternType {
    Func,
    Table,
    Memory,
    Global,
}

impl ExternType {
    pub fn from_byte(byte: u8) -> Result<Self, BinaryError> {
        match byte {
            0x00 => Ok(ExternType::Func),
            0x01 => Ok(ExternType::Table),
            0x02 => Ok(ExternType::Memory),
            0x03 => Ok(ExternType::Global),
            value => Err(BinaryError::InvalidByte {
                context: "importdesc",
                value,
            }),
        }
    }

    pub fn byte(self) -> u8 {
        match self {
            ExternType::Func => 0x00,
            ExternType::Table => 0x01,
            ExternType::Memory => 0x02,
            ExternType::Global => 0x03,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ExternType::Func => "func",
            ExternType::Table => "table",
            ExternType::Memory => "memory",
            ExternType::Global => "global",
        }
    }
}

/// Value types a global import can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValType {
    I32,
    I64,
    F32,
    F64,
}

impl ValType {
    fn from_byte(byte: u8) -> Result<Self, BinaryError> {
        match byte {
            0x7f => Ok(ValType::I32),
            0x7e => Ok(ValType::I64),
            0x7d => Ok(ValType::F32),
            0x7c => Ok(ValType::F64),
            value => Err(BinaryError::InvalidByte {
                context: "value type",
                value,
            }),
        }
    }
}

/// Size bounds shared by table and memory types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min: u32,
    pub max: Option<u32>,
}

/// Table descriptor: funcref element type plus limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableType {
    pub limits: Limits,
}

/// Memory descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType {
    pub limits: Limits,
}

/// Global descriptor: value type plus mutability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    pub val_type: ValType,
    pub mutable: bool,
}

/// Feature set gating decode of newer constructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Features(u64);

impl Features {
    pub const NONE: Features = Features(0);
    pub const MUTABLE_GLOBAL: Features = Features(1 << 0);

    pub fn contains(self, other: Features) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: Features) -> Features {
        Features(self.0 | other.0)
    }
}

/// What an import entry binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportDesc {
    /// Index into the module's type section.
    Func { type_index: u32 },
    Table(TableType),
    Memory(MemoryType),
    Global(GlobalType),
}

impl ImportDesc {
    pub fn extern_type(&self) -> ExternType {
        match self {
            ImportDesc::Func { .. } => ExternType::Func,
            ImportDesc::Table(_) => ExternType::Table,
            ImportDesc::Memory(_) => ExternType::Memory,
            ImportDesc::Global(_) => ExternType::Global,
        }
    }
}

/// One import section entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Module namespace the import is resolved in.
    pub module: String,
    /// Name within that namespace.
    pub name: String,
    pub desc: ImportDesc,
}

/// Decode the `idx`-th import entry at the reader's cursor.
pub fn decode_import(
    reader: &mut ByteReader<'_>,
    idx: u32,
    features: Features,
) -> Result<Import, BinaryError> {
    let module = decode_utf8(reader, "import module").map_err(|e| import_field(idx, "module", e))?;
    let name = decode_utf8(reader, "import name").map_err(|e| import_field(idx, "name", e))?;

    let kind_byte = reader.read_byte().map_err(|e| import_field(idx, "type", e))?;
    let kind = ExternType::from_byte(kind_byte).map_err(|e| import_field(idx, "type", e))?;

    let desc = match kind {
        ExternType::Func => ImportDesc::Func {
            type_index: leb128::decode_u32(reader).map_err(|e| import_field(idx, "func", e))?,
        },
        ExternType::Table => ImportDesc::Table(
            decode_table_type(reader).map_err(|e| import_field(idx, "table", e))?,
        ),
        ExternType::Memory => ImportDesc::Memory(
            decode_memory_type(reader).map_err(|e| import_field(idx, "memory", e))?,
        ),
        ExternType::Global => ImportDesc::Global(
            decode_global_type(reader, features).map_err(|e| import_field(idx, "global", e))?,
        ),
    };

    Ok(Import { module, name, desc })
}

/// Encode an import entry in the v1 binary format.
///
/// Only function imports are supported; the other kinds return
/// [`BinaryError::UnsupportedEncode`].
pub fn encode_import(import: &Import) -> Result<Vec<u8>, BinaryError> {
    let mut data = encode_size_prefixed(import.module.as_bytes());
    data.extend_from_slice(&encode_size_prefixed(import.name.as_bytes()));
    data.push(import.desc.extern_type().byte());
    match import.desc {
        ImportDesc::Func { type_index } => {
            data.extend_from_slice(&leb128::encode_u32(type_index));
            Ok(data)
        }
        ImportDesc::Table(_) | ImportDesc::Memory(_) | ImportDesc::Global(_) => {
            Err(BinaryError::UnsupportedEncode {
                kind: import.desc.extern_type().name(),
            })
        }
    }
}

fn import_field(index: u32, field: &'static str, source: BinaryError) -> BinaryError {
    BinaryError::ImportField {
        index,
        field,
        source: Box::new(source),
    }
}

fn decode_utf8(reader: &mut ByteReader<'_>, context: &'static str) -> Result<String, BinaryError> {
    let len = leb128::decode_u32(reader)?;
    let bytes = reader.read_bytes(len as usize)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| BinaryError::InvalidUtf8 { context })
}

fn decode_limits(reader: &mut ByteReader<'_>) -> Result<Limits, BinaryError> {
    let flag = reader.read_byte()?;
    let min = leb128::decode_u32(reader)?;
    let max = match flag {
        0x00 => None,
        0x01 => Some(leb128::decode_u32(reader)?),
        value => {
            return Err(BinaryError::InvalidByte {
                context: "limits flag",
                value,
            })
        }
    };
    Ok(Limits { min, max })
}

fn decode_table_type(reader: &mut ByteReader<'_>) -> Result<TableType, BinaryError> {
    let elem = reader.read_byte()?;
    if elem != 0x70 {
        return Err(BinaryError::InvalidByte {
            context: "table element type",
            value: elem,
        });
    }
    Ok(TableType {
        limits: decode_limits(reader)?,
    })
}

fn decode_memory_type(reader: &mut ByteReader<'_>) -> Result<MemoryType, BinaryError> {
    Ok(MemoryType {
        limits: decode_limits(reader)?,
    })
}

fn decode_global_type(
    reader: &mut ByteReader<'_>,
    features: Features,
) -> Result<GlobalType, BinaryError> {
    let val_type = ValType::from_byte(reader.read_byte()?)?;
    let mutable = match reader.read_byte()? {
        0x00 => false,
        0x01 => true,
        value => {
            return Err(BinaryError::InvalidByte {
                context: "global mutability",
                value,
            })
        }
    };
    if mutable && !features.contains(Features::MUTABLE_GLOBAL) {
        return Err(BinaryError::MutableGlobalsDisabled);
    }
    Ok(GlobalType { val_type, mutable })
}

fn encode_size_prefixed(bytes: &[u8]) -> Vec<u8> {
    let mut out = leb128::encode_u32(bytes.len() as u32);
    out.extend_from_slice(bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8], features: Features) -> Result<Import, BinaryError> {
        decode_import(&mut ByteReader::new(bytes), 0, features)
    }

    #[test]
    fn function_import_roundtrips() {
        let import = Import {
            module: "env".to_string(),
            name: "memcpy".to_string(),
            desc: ImportDesc::Func { type_index: 3 },
        };
        let encoded = encode_import(&import).unwrap();
        let decoded = decode(&encoded, Features::NONE).unwrap();
        assert_eq!(decoded, import);
    }

    #[test]
    fn table_import_decodes() {
        // "e" "t" table funcref limits{1..=2}
        let bytes = [0x01, b'e', 0x01, b't', 0x01, 0x70, 0x01, 0x01, 0x02];
        let import = decode(&bytes, Features::NONE).unwrap();
        assert_eq!(
            import.desc,
            ImportDesc::Table(TableType {
                limits: Limits {
                    min: 1,
                    max: Some(2)
                }
            })
        );
    }

    #[test]
    fn memory_import_decodes() {
        let bytes = [0x01, b'e', 0x01, b'm', 0x02, 0x00, 0x10];
        let import = decode(&bytes, Features::NONE).unwrap();
        assert_eq!(
            import.desc,
            ImportDesc::Memory(MemoryType {
                limits: Limits { min: 16, max: None }
            })
        );
    }

    #[test]
    fn immutable_global_needs_no_feature() {
        let bytes = [0x01, b'e', 0x01, b'g', 0x03, 0x7f, 0x00];
        let import = decode(&bytes, Features::NONE).unwrap();
        assert_eq!(
            import.desc,
            ImportDesc::Global(GlobalType {
                val_type: ValType::I32,
                mutable: false
            })
        );
    }

    #[test]
    fn mutable_global_is_feature_gated() {
        let bytes = [0x01, b'e', 0x01, b'g', 0x03, 0x7e, 0x01];
        let err = decode(&bytes, Features::NONE).unwrap_err();
        assert!(matches!(
            err,
            BinaryError::ImportField {
                index: 0,
                field: "global",
                ..
            }
        ));

        let import = decode(&bytes, Features::MUTABLE_GLOBAL).unwrap();
        assert_eq!(
            import.desc,
            ImportDesc::Global(GlobalType {
                val_type: ValType::I64,
                mutable: true
            })
        );
    }

    #[test]
    fn invalid_desc_byte_is_reported_with_index() {
        let bytes = [0x01, b'e', 0x01, b'x', 0x07];
        let err = decode_import(&mut ByteReader::new(&bytes), 4, Features::NONE).unwrap_err();
        match err {
            BinaryError::ImportField { index, field, source } => {
                assert_eq!(index, 4);
                assert_eq!(field, "type");
                assert_eq!(
                    *source,
                    BinaryError::InvalidByte {
                        context: "importdesc",
                        value: 0x07
                    }
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_function_encode_is_a_known_gap() {
        let import = Import {
            module: "env".to_string(),
            name: "tbl".to_string(),
            desc: ImportDesc::Table(TableType {
                limits: Limits { min: 0, max: None },
            }),
        };
        assert_eq!(
            encode_import(&import).unwrap_err(),
            BinaryError::UnsupportedEncode { kind: "table" }
        );
    }

    #[test]
    fn truncated_name_is_eof_in_context() {
        let bytes = [0x01, b'e', 0x05, b'x'];
        let err = decode(&bytes, Features::NONE).unwrap_err();
        assert!(matches!(
            err,
            BinaryError::ImportField {
                field: "name",
                ..
            }
        ));
    }
}
