// Copyright 2022 - 2023 Wenmeng See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
//
// Walks a `Value` tree and emits bytes. Ported from `cpk_encode_container`/
// `cpk_encode_string`/`cpk_encode_ref` in libconspack's `encode.c`, extended
// with the recursive compound-value walk the C source left to callers.

use log::trace;

use crate::error::{CpkErrorValue, ErrorKind};
use crate::header::{self, consts::*};
use crate::io::ByteSink;
use crate::size::encode_size;
use crate::value::{ContainerKind, Number, Value};
use crate::CpkResult;

fn container_subtype_bits(kind: ContainerKind) -> u8 {
    match kind {
        ContainerKind::Vector => CONTAINER_VECTOR,
        ContainerKind::List => CONTAINER_LIST,
        ContainerKind::Map => CONTAINER_MAP,
        ContainerKind::TypedMap => CONTAINER_TMAP,
    }
}

fn is_map_like(kind: ContainerKind) -> bool {
    matches!(kind, ContainerKind::Map | ContainerKind::TypedMap)
}

/// Top-level entry point: encodes one value (and, recursively, all of its
/// children) into `sink`.
pub fn encode(value: &Value, sink: &mut impl ByteSink) -> CpkResult<()> {
    encode_with_header(value, None, sink)
}

/// Like `encode`, but `preset_header` implements the fixed-element-header
/// optimization's `skip_header=true`: when `Some`, the caller (the
/// fixed-header container loop) already wrote this element's header byte
/// once, so none of the branches below may write one of their own — only
/// the size-class bits or inline payload bits already living in that byte
/// may be reused. This mirrors `decode_shell`'s `preset_header` handling
/// exactly, branch for branch, so encode and decode can never disagree on
/// how many bytes an element occupies.
fn encode_with_header(
    value: &Value,
    preset_header: Option<u8>,
    sink: &mut impl ByteSink,
) -> CpkResult<()> {
    match value {
        Value::Bool(b) => {
            if preset_header.is_none() {
                sink.write8(BOOL)?;
            }
            sink.write8(if *b { 1 } else { 0 })?;
        }

        Value::Number(n) => {
            if preset_header.is_none() {
                sink.write8(NUMBER | n.subtype())?;
            }
            encode_number_payload(n, sink)?;
        }

        Value::Rational {
            numerator,
            denominator,
        } => {
            require_number(numerator)?;
            require_number(denominator)?;
            if preset_header.is_none() {
                sink.write8(NUMBER | RATIONAL)?;
            }
            encode(numerator, sink)?;
            encode(denominator, sink)?;
        }

        Value::Complex { real, imaginary } => {
            require_number(real)?;
            require_number(imaginary)?;
            if preset_header.is_none() {
                sink.write8(NUMBER | COMPLEX)?;
            }
            encode(real, sink)?;
            encode(imaginary, sink)?;
        }

        Value::String(bytes) => match preset_header {
            None => encode_string(sink, bytes)?,
            Some(header) => {
                write_size_in_class(sink, header, bytes.len() as u32)?;
                sink.write_bytes(bytes)?;
            }
        },

        Value::Container {
            kind,
            fixed_header,
            children,
        } => {
            let wire_count = if is_map_like(*kind) {
                (children.len() / 2) as u32
            } else {
                children.len() as u32
            };
            match preset_header {
                None => encode_container(sink, *kind, wire_count, *fixed_header)?,
                Some(header) => {
                    write_size_in_class(sink, header, wire_count)?;
                    if let Some(fh) = fixed_header {
                        sink.write8(*fh)?;
                    }
                }
            }
            match fixed_header {
                Some(fh) => {
                    for child in children {
                        encode_with_header(child, Some(*fh), sink)?;
                    }
                }
                None => {
                    for child in children {
                        encode(child, sink)?;
                    }
                }
            }
        }

        Value::Ref(val) | Value::Tag(val) | Value::Index(val) => {
            let kind_byte = match value {
                Value::Ref(_) => REF,
                Value::Tag(_) => TAG,
                _ => INDEX,
            };
            match preset_header {
                None => encode_ref(sink, kind_byte, *val)?,
                Some(header) if header::ref_is_inline(header) => {
                    // The value is already fully carried by the shared
                    // header's low bits — nothing more to write.
                }
                Some(header) => write_size_in_class(sink, header, *val)?,
            }
        }

        Value::RemoteRef(inner) => {
            if preset_header.is_none() {
                sink.write8(REMOTE_REF)?;
            }
            encode(inner, sink)?;
        }

        Value::Cons { car, cdr } => {
            if preset_header.is_none() {
                sink.write8(CONS)?;
            }
            encode(car, sink)?;
            encode(cdr, sink)?;
        }

        Value::Package { name } => {
            if preset_header.is_none() {
                sink.write8(PACKAGE)?;
            }
            encode(name, sink)?;
        }

        Value::Symbol {
            package,
            name,
            keyword,
        } => {
            if preset_header.is_none() {
                let header = SYMBOL | if *keyword { SYMBOL_KEYWORD } else { 0 };
                sink.write8(header)?;
            }
            if !*keyword {
                let package = package.as_ref().ok_or_else(|| {
                    CpkErrorValue::new(ErrorKind::BadType, None, 0)
                })?;
                encode(package, sink)?;
            }
            encode(name, sink)?;
        }

        Value::Error(e) => {
            // Not a wire kind; encoding an error value is a programmer
            // error in the caller, not a recoverable wire condition.
            return Err(CpkErrorValue::new(ErrorKind::BadType, e.value, e.position).into());
        }
    }

    Ok(())
}

fn require_number(v: &Value) -> CpkResult<()> {
    match v {
        Value::Number(_) => Ok(()),
        _ => Err(CpkErrorValue::new(ErrorKind::BadType, None, 0).into()),
    }
}

/// Writes `n` using the size-class bits already present in `header`,
/// without writing a header byte of its own.
fn write_size_in_class(sink: &mut impl ByteSink, header: u8, n: u32) -> CpkResult<()> {
    use crate::header::SizeBits;
    match crate::header::size_bits(header) {
        SizeBits::Eight => sink.write8(n as u8),
        SizeBits::Sixteen => sink.write16(n as u16),
        SizeBits::ThirtyTwo => sink.write32(n),
        SizeBits::Reserved => {
            Err(CpkErrorValue::new(ErrorKind::BadSize, Some(header), 0).into())
        }
    }
}

fn encode_number_payload(n: &Number, sink: &mut impl ByteSink) -> CpkResult<()> {
    match n {
        Number::Int8(v) => sink.write8(*v as u8),
        Number::UInt8(v) => sink.write8(*v),
        Number::Int16(v) => sink.write16(*v as u16),
        Number::UInt16(v) => sink.write16(*v),
        Number::Int32(v) => sink.write32(*v as u32),
        Number::UInt32(v) => sink.write32(*v),
        Number::Int64(v) => sink.write64(*v as u64),
        Number::UInt64(v) => sink.write64(*v),
        Number::Single(v) => sink.write32(v.to_bits()),
        Number::Double(v) => sink.write64(v.to_bits()),
        Number::Int128(bytes) | Number::UInt128(bytes) => sink.write_bytes(bytes),
    }
}

/// Writes the String header (size + size class), then the raw octets —
/// strings are opaque octet sequences, never null-terminated on the wire.
pub fn encode_string(sink: &mut impl ByteSink, bytes: &[u8]) -> CpkResult<()> {
    encode_size(sink, STRING, bytes.len() as u32)?;
    sink.write_bytes(bytes)
}

/// Writes a container header: subtype, size class, and FIXED bit, then
/// (if fixed) the single shared element header byte. Callers write
/// elements next.
pub fn encode_container(
    sink: &mut impl ByteSink,
    kind: ContainerKind,
    count: u32,
    fixed_header: Option<u8>,
) -> CpkResult<()> {
    let mut header_base = CONTAINER | container_subtype_bits(kind);
    if fixed_header.is_some() {
        header_base |= CONTAINER_FIXED;
    }
    trace!("encoding container; kind={:?} count={} fixed={}", kind, count, fixed_header.is_some());
    encode_size(sink, header_base, count)?;
    if let Some(fh) = fixed_header {
        sink.write8(fh)?;
    }
    Ok(())
}

/// Writes a Ref/Tag/Index value: a single inline byte when `val < 16`,
/// otherwise a sized form. `kind_byte` selects which header family
/// (`REF`/`TAG`/`INDEX`) the bits are OR'd into.
pub fn encode_ref(sink: &mut impl ByteSink, kind_byte: u8, val: u32) -> CpkResult<()> {
    if val < 16 {
        sink.write8(kind_byte | REFTAG_INLINE | val as u8)
    } else {
        encode_size(sink, kind_byte, val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::GrowableBuffer;

    fn encoded(v: &Value) -> Vec<u8> {
        let mut sink = GrowableBuffer::new();
        encode(v, &mut sink).unwrap();
        sink.into_vec()
    }

    #[test]
    fn encodes_int8() {
        assert_eq!(encoded(&Value::Number(Number::Int8(42))), vec![0x10, 0x2A]);
    }

    #[test]
    fn encodes_double() {
        let bytes = encoded(&Value::Number(Number::Double(100.0)));
        assert_eq!(
            bytes,
            vec![0x19, 0x40, 0x59, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn encodes_string() {
        let v = Value::String(b"hello".to_vec());
        assert_eq!(
            encoded(&v),
            vec![0x40, 0x05, b'h', b'e', b'l', b'l', b'o']
        );
    }

    #[test]
    fn encodes_inline_ref() {
        let mut sink = GrowableBuffer::new();
        encode_ref(&mut sink, REF, 5).unwrap();
        assert_eq!(sink.into_vec(), vec![REF | REFTAG_INLINE | 5]);
    }

    #[test]
    fn encodes_vector_without_fixed_header() {
        let v = Value::Container {
            kind: ContainerKind::Vector,
            fixed_header: None,
            children: vec![
                Value::Number(Number::Int8(0)),
                Value::Number(Number::Int8(1)),
                Value::Number(Number::Int8(2)),
            ],
        };
        assert_eq!(
            encoded(&v),
            vec![0x20, 0x03, 0x10, 0x00, 0x10, 0x01, 0x10, 0x02]
        );
    }

    #[test]
    fn encodes_vector_with_fixed_header_one_byte_shorter_per_element() {
        let v = Value::Container {
            kind: ContainerKind::Vector,
            fixed_header: Some(0x10),
            children: vec![
                Value::Number(Number::Int8(0)),
                Value::Number(Number::Int8(1)),
                Value::Number(Number::Int8(2)),
            ],
        };
        assert_eq!(encoded(&v), vec![0x24, 0x03, 0x10, 0x00, 0x01, 0x02]);
    }

    #[test]
    fn fixed_header_container_of_cons_elements_does_not_repeat_the_tag_byte() {
        let v = Value::Container {
            kind: ContainerKind::Vector,
            fixed_header: Some(CONS),
            children: vec![
                Value::Cons {
                    car: Box::new(Value::Number(Number::Int8(1))),
                    cdr: Box::new(Value::Number(Number::Int8(2))),
                },
                Value::Cons {
                    car: Box::new(Value::Number(Number::Int8(3))),
                    cdr: Box::new(Value::Number(Number::Int8(4))),
                },
            ],
        };
        assert_eq!(
            encoded(&v),
            vec![
                0x24, 0x02, CONS, 0x10, 0x01, 0x10, 0x02, 0x10, 0x03, 0x10, 0x04,
            ]
        );
        assert_eq!(crate::decode::decode(&encoded(&v)).unwrap(), v);
    }

    #[test]
    fn fixed_header_container_of_inline_refs_writes_no_per_element_bytes() {
        let fixed = REF | REFTAG_INLINE | 5;
        let v = Value::Container {
            kind: ContainerKind::Vector,
            fixed_header: Some(fixed),
            children: vec![Value::Ref(5), Value::Ref(5)],
        };
        assert_eq!(encoded(&v), vec![0x24, 0x02, fixed]);
        assert_eq!(crate::decode::decode(&encoded(&v)).unwrap(), v);
    }

    #[test]
    fn rejects_non_number_rational_child() {
        let v = Value::Rational {
            numerator: Box::new(Value::Bool(true)),
            denominator: Box::new(Value::Number(Number::Int8(1))),
        };
        let mut sink = GrowableBuffer::new();
        assert!(encode(&v, &mut sink).is_err());
    }
}
