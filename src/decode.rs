// Copyright 2022 - 2023 Wenmeng See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
//
// Recursive decoder. Ported from `cpk_decode`/`cpk_decode_rh` in
// libconspack's `decode.c`, reshaped for ownership-strict Rust: instead of
// mutating a `cpk_object_t` union in place and overwriting its header with
// an error sentinel on failure, each step returns a `Result` and a
// half-built value is simply never constructed on the error path.

use log::{trace, warn};

use crate::error::{CpkErrorValue, ErrorKind};
use crate::header::{self, consts::*, Kind};
use crate::io::ByteSource;
use crate::size::decode_size;
use crate::value::{ContainerKind, Number, Value};
use crate::CpkResult;

fn bad_header(source: &impl ByteSource, byte: u8) -> CpkErrorValue {
    warn!("unclassifiable header byte 0x{:02x} at {}", byte, source.position());
    CpkErrorValue::new(ErrorKind::BadHeader, Some(byte), source.position())
}

fn bad_type(source: &impl ByteSource) -> CpkErrorValue {
    warn!("type constraint violated at {}", source.position());
    CpkErrorValue::new(ErrorKind::BadType, None, source.position())
}

fn container_kind_from_header(header: u8) -> ContainerKind {
    match header::container_kind(header) {
        header::ContainerKind::Vector => ContainerKind::Vector,
        header::ContainerKind::List => ContainerKind::List,
        header::ContainerKind::Map => ContainerKind::Map,
        header::ContainerKind::TypedMap => ContainerKind::TypedMap,
    }
}

/// One node's shell: its effective header and any *scalar* payload that
/// required no recursion to read. Compound shells carry just enough to let
/// `decode_tree` know which, and how many, children to pull next — this is
/// the Rust shape of `decode_one`'s "populate shell, leave children null"
/// contract.
enum Shell {
    Bool(bool),
    Number(Number),
    RationalShell,
    ComplexShell,
    StringBytes(Vec<u8>),
    ContainerShell {
        kind: ContainerKind,
        size: u32,
        fixed_header: Option<u8>,
    },
    Ref(u32),
    Tag(u32),
    Index(u32),
    RemoteRefShell,
    ConsShell,
    PackageShell,
    SymbolShell { keyword: bool },
}

/// Reads exactly one node's header and scalar payload, recursing into
/// nothing. `preset_header` implements `skip_header=true`: the caller
/// (the fixed-header container loop) has already decided this element's
/// header, so no header byte is read from the stream at all.
fn decode_shell(source: &mut impl ByteSource, preset_header: Option<u8>) -> CpkResult<Shell> {
    let header = match preset_header {
        Some(h) => h,
        None => source.read8()?,
    };

    let kind = header::classify(header).ok_or_else(|| bad_header(source, header))?;
    trace!("decode_shell: header=0x{:02x} kind={:?}", header, kind);

    match kind {
        Kind::Bool => {
            let val = source.read8()?;
            Ok(Shell::Bool(val != 0))
        }

        Kind::Number => decode_number_shell(source, header),

        Kind::String => {
            let size = decode_size(source, header)? as usize;
            let bytes = source.read_bytes(size)?;
            Ok(Shell::StringBytes(bytes))
        }

        Kind::Container => {
            let mut size = decode_size(source, header)?;
            let fixed_header = if header::container_is_fixed(header) {
                Some(source.read8()?)
            } else {
                None
            };
            if header::container_is_map(header) {
                size *= 2;
            }
            Ok(Shell::ContainerShell {
                kind: container_kind_from_header(header),
                size,
                fixed_header,
            })
        }

        Kind::Ref | Kind::Tag | Kind::Index => {
            let val = if header::ref_is_inline(header) {
                header::ref_inline_value(header) as u32
            } else {
                decode_size(source, header)?
            };
            Ok(match kind {
                Kind::Ref => Shell::Ref(val),
                Kind::Tag => Shell::Tag(val),
                _ => Shell::Index(val),
            })
        }

        Kind::RemoteRef => Ok(Shell::RemoteRefShell),
        Kind::Cons => Ok(Shell::ConsShell),
        Kind::Package => Ok(Shell::PackageShell),
        Kind::Symbol => Ok(Shell::SymbolShell {
            keyword: header::symbol_is_keyword(header),
        }),
    }
}

fn decode_number_shell(source: &mut impl ByteSource, header: u8) -> CpkResult<Shell> {
    match header::number_subtype(header) {
        INT8 => Ok(Shell::Number(Number::Int8(source.read8()? as i8))),
        UINT8 => Ok(Shell::Number(Number::UInt8(source.read8()?))),
        INT16 => Ok(Shell::Number(Number::Int16(source.read16()? as i16))),
        UINT16 => Ok(Shell::Number(Number::UInt16(source.read16()?))),
        INT32 => Ok(Shell::Number(Number::Int32(source.read32()? as i32))),
        UINT32 => Ok(Shell::Number(Number::UInt32(source.read32()?))),
        INT64 => Ok(Shell::Number(Number::Int64(source.read64()? as i64))),
        UINT64 => Ok(Shell::Number(Number::UInt64(source.read64()?))),
        SINGLE_FLOAT => Ok(Shell::Number(Number::Single(f32::from_bits(
            source.read32()?,
        )))),
        DOUBLE_FLOAT => Ok(Shell::Number(Number::Double(f64::from_bits(
            source.read64()?,
        )))),
        INT128 => {
            let bytes = source.read_bytes(16)?;
            let mut arr = [0u8; 16];
            arr.copy_from_slice(&bytes);
            Ok(Shell::Number(Number::Int128(arr)))
        }
        UINT128 => {
            let bytes = source.read_bytes(16)?;
            let mut arr = [0u8; 16];
            arr.copy_from_slice(&bytes);
            Ok(Shell::Number(Number::UInt128(arr)))
        }
        RATIONAL => Ok(Shell::RationalShell),
        COMPLEX => Ok(Shell::ComplexShell),
        _ => Err(bad_header(source, header).into()),
    }
}

fn require_number(source: &impl ByteSource, v: Value) -> CpkResult<Value> {
    match v {
        Value::Number(_) => Ok(v),
        _ => Err(bad_type(source).into()),
    }
}

/// Returns a fully resolved tree: reads one shell, then — depending on
/// kind — recursively resolves its children in the same order `encode`
/// walks them, since the two must agree.
pub fn decode_tree(source: &mut impl ByteSource) -> CpkResult<Value> {
    decode_tree_with_header(source, None)
}

fn decode_tree_with_header(
    source: &mut impl ByteSource,
    preset_header: Option<u8>,
) -> CpkResult<Value> {
    let shell = decode_shell(source, preset_header)?;

    match shell {
        Shell::Bool(b) => Ok(Value::Bool(b)),
        Shell::Number(n) => Ok(Value::Number(n)),

        Shell::RationalShell => {
            let numerator = decode_tree(source)?;
            let numerator = require_number(source, numerator)?;
            let denominator = decode_tree(source)?;
            let denominator = require_number(source, denominator)?;
            Ok(Value::Rational {
                numerator: Box::new(numerator),
                denominator: Box::new(denominator),
            })
        }

        Shell::ComplexShell => {
            let real = decode_tree(source)?;
            let real = require_number(source, real)?;
            let imaginary = decode_tree(source)?;
            let imaginary = require_number(source, imaginary)?;
            Ok(Value::Complex {
                real: Box::new(real),
                imaginary: Box::new(imaginary),
            })
        }

        Shell::StringBytes(bytes) => Ok(Value::String(bytes)),

        Shell::ContainerShell {
            kind,
            size,
            fixed_header,
        } => {
            let mut children = Vec::with_capacity(size as usize);
            for _ in 0..size {
                let child = decode_tree_with_header(source, fixed_header)?;
                children.push(child);
            }
            Ok(Value::Container {
                kind,
                fixed_header,
                children,
            })
        }

        Shell::Ref(v) => Ok(Value::Ref(v)),
        Shell::Tag(v) => Ok(Value::Tag(v)),
        Shell::Index(v) => Ok(Value::Index(v)),

        Shell::RemoteRefShell => {
            let inner = decode_tree(source)?;
            Ok(Value::RemoteRef(Box::new(inner)))
        }

        Shell::ConsShell => {
            let car = decode_tree(source)?;
            let cdr = decode_tree(source)?;
            Ok(Value::Cons {
                car: Box::new(car),
                cdr: Box::new(cdr),
            })
        }

        Shell::PackageShell => {
            let name = decode_tree(source)?;
            Ok(Value::Package {
                name: Box::new(name),
            })
        }

        Shell::SymbolShell { keyword } => {
            let package = if keyword {
                None
            } else {
                Some(Box::new(decode_tree(source)?))
            };
            let name = decode_tree(source)?;
            Ok(Value::Symbol {
                package,
                name: Box::new(name),
                keyword,
            })
        }
    }
}

/// Decodes exactly one value from `bytes`.
pub fn decode(bytes: &[u8]) -> CpkResult<Value> {
    let mut source = crate::io::SliceSource::new(bytes);
    decode_tree(&mut source)
}

/// Like [`decode`], but never returns `Err` — a failure is folded into
/// `Value::Error` for callers that want the C-API "errors are values"
/// shape rather than an idiomatic `Result`. An `Error` value is terminal:
/// callers must not treat it as a decoded value.
pub fn decode_lenient(bytes: &[u8]) -> Value {
    match decode(bytes) {
        Ok(v) => v,
        Err(crate::CpkError::Decode(e)) => Value::Error(e),
        // `decode` reads from an in-memory SliceSource, which never raises
        // CpkError::Io; kept exhaustive for when `decode_lenient` grows a
        // descriptor-backed sibling.
        Err(crate::CpkError::Io(_)) => {
            Value::Error(CpkErrorValue::new(ErrorKind::Eof, None, 0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_int8() {
        assert_eq!(decode(&[0x10, 0x2A]).unwrap(), Value::Number(Number::Int8(42)));
    }

    #[test]
    fn decodes_double() {
        let bytes = [0x19, 0x40, 0x59, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(
            decode(&bytes).unwrap(),
            Value::Number(Number::Double(100.0))
        );
    }

    #[test]
    fn decodes_string() {
        let bytes = [0x40, 0x05, b'h', b'e', b'l', b'l', b'o'];
        assert_eq!(decode(&bytes).unwrap(), Value::String(b"hello".to_vec()));
    }

    #[test]
    fn decodes_vector() {
        let bytes = [0x20, 0x03, 0x10, 0x00, 0x10, 0x01, 0x10, 0x02];
        let v = decode(&bytes).unwrap();
        assert_eq!(
            v,
            Value::Container {
                kind: ContainerKind::Vector,
                fixed_header: None,
                children: vec![
                    Value::Number(Number::Int8(0)),
                    Value::Number(Number::Int8(1)),
                    Value::Number(Number::Int8(2)),
                ],
            }
        );
    }

    #[test]
    fn decodes_fixed_header_vector() {
        let bytes = [0x24, 0x03, 0x10, 0x00, 0x01, 0x02];
        let v = decode(&bytes).unwrap();
        assert_eq!(
            v,
            Value::Container {
                kind: ContainerKind::Vector,
                fixed_header: Some(0x10),
                children: vec![
                    Value::Number(Number::Int8(0)),
                    Value::Number(Number::Int8(1)),
                    Value::Number(Number::Int8(2)),
                ],
            }
        );
    }

    #[test]
    fn decodes_symbol_package_then_name() {
        let bytes = [
            0x82, 0x40, 0x04, b'n', b'a', b'm', b'e', 0x40, 0x07, b'p', b'a', b'c', b'k', b'a',
            b'g', b'e',
        ];
        let v = decode(&bytes).unwrap();
        assert_eq!(
            v,
            Value::Symbol {
                package: Some(Box::new(Value::String(b"name".to_vec()))),
                name: Box::new(Value::String(b"package".to_vec())),
                keyword: false,
            }
        );
    }

    #[test]
    fn truncated_input_is_eof_with_position() {
        let bytes = [0x10];
        let err = decode(&bytes).unwrap_err();
        match err {
            crate::CpkError::Decode(e) => {
                assert_eq!(e.kind, ErrorKind::Eof);
                assert_eq!(e.position, 1);
            }
            _ => panic!("expected decode error"),
        }
    }

    #[test]
    fn map_size_doubles() {
        let bytes = [
            CONTAINER | CONTAINER_MAP,
            0x01,
            0x10,
            0x00,
            0x10,
            0x01,
        ];
        let v = decode(&bytes).unwrap();
        match v {
            Value::Container { children, .. } => assert_eq!(children.len(), 2),
            _ => panic!("expected container"),
        }
    }

    #[test]
    fn reserved_size_class_is_bad_size() {
        let bytes = [STRING | 0x03];
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            crate::CpkError::Decode(crate::error::CpkErrorValue {
                kind: ErrorKind::BadSize,
                ..
            })
        ));
    }

    #[test]
    fn rational_requires_number_children() {
        // Rational header, then a Bool (not a Number) as numerator.
        let bytes = [NUMBER | RATIONAL, BOOL, 0x01];
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            crate::CpkError::Decode(crate::error::CpkErrorValue {
                kind: ErrorKind::BadType,
                ..
            })
        ));
    }

    #[test]
    fn round_trip_cons_of_number_and_string() {
        use crate::encode::encode;
        use crate::io::GrowableBuffer;

        let v = Value::Cons {
            car: Box::new(Value::Number(Number::Int32(7))),
            cdr: Box::new(Value::String(b"x".to_vec())),
        };
        let mut sink = GrowableBuffer::new();
        encode(&v, &mut sink).unwrap();
        let bytes = sink.into_vec();
        assert_eq!(decode(&bytes).unwrap(), v);
    }
}
