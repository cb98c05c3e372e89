// Copyright 2022 - 2023 Wenmeng See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
//
// Recursive pretty-printer. Ported from `explain_object_r` and friends in
// libconspack's `explain.c`: a parenthesized, keyword-tagged rendering of a
// decoded tree. Unlike the wire codec, this walker cannot fail — there is no
// header to misclassify, only a `Value` already built by `decode_tree`.

use std::fmt::Write as _;

use crate::value::{ContainerKind, Number, Value};

fn write_container_kind(out: &mut String, kind: ContainerKind) {
    let s = match kind {
        ContainerKind::Vector => ":vector",
        ContainerKind::List => ":list",
        ContainerKind::Map => ":map",
        ContainerKind::TypedMap => ":tmap",
    };
    out.push_str(s);
}

fn explain_number(out: &mut String, n: &Number) {
    out.push_str(":number ");
    match n {
        Number::Int8(v) => write!(out, ":int8 {v}").unwrap(),
        Number::UInt8(v) => write!(out, ":uint8 {v}").unwrap(),
        Number::Int16(v) => write!(out, ":int16 {v}").unwrap(),
        Number::UInt16(v) => write!(out, ":uint16 {v}").unwrap(),
        Number::Int32(v) => write!(out, ":int32 {v}").unwrap(),
        Number::UInt32(v) => write!(out, ":uint32 {v}").unwrap(),
        Number::Int64(v) => write!(out, ":int64 {v}").unwrap(),
        Number::UInt64(v) => write!(out, ":uint64 {v}").unwrap(),
        Number::Single(v) => write!(out, ":single-float {v:.7}").unwrap(),
        Number::Double(v) => write!(out, ":double-float {v:.16}").unwrap(),
        Number::Int128(bytes) => write!(out, ":int128 {}", hex(bytes)).unwrap(),
        Number::UInt128(bytes) => write!(out, ":uint128 {}", hex(bytes)).unwrap(),
    }
}

fn hex(bytes: &[u8; 16]) -> String {
    let mut s = String::with_capacity(32);
    for b in bytes {
        write!(s, "{b:02x}").unwrap();
    }
    s
}

fn explain_string(out: &mut String, bytes: &[u8]) {
    out.push_str(":string \"");
    match std::str::from_utf8(bytes) {
        Ok(s) => out.push_str(s),
        Err(_) => write!(out, "{}", hex_bytes(bytes)).unwrap(),
    }
    out.push('"');
}

fn hex_bytes(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(s, "{b:02x}").unwrap();
    }
    s
}

/// Appends the explanation of `value` to `out`, recursing into children.
/// Mirrors `explain_object_r`'s `"(" kind-body ")"` shape exactly, so the
/// rendering of a tree is a single s-expression-like string.
pub fn explain(value: &Value, out: &mut String) {
    out.push('(');
    match value {
        Value::Bool(b) => {
            out.push_str(":boolean ");
            out.push_str(if *b { "t" } else { "nil" });
        }

        Value::Number(n) => explain_number(out, n),

        Value::Rational {
            numerator,
            denominator,
        } => {
            out.push_str(":number :rational ");
            explain(numerator, out);
            out.push(' ');
            explain(denominator, out);
        }

        Value::Complex { real, imaginary } => {
            out.push_str(":number :complex ");
            explain(real, out);
            out.push(' ');
            explain(imaginary, out);
        }

        Value::String(bytes) => explain_string(out, bytes),

        Value::Container { kind, children, .. } => {
            write_container_kind(out, *kind);
            for child in children {
                out.push(' ');
                explain(child, out);
            }
        }

        Value::Ref(v) => {
            write!(out, ":ref {v}").unwrap();
        }
        Value::Tag(v) => {
            write!(out, ":tag {v}").unwrap();
        }
        Value::Index(v) => {
            write!(out, ":index {v}").unwrap();
        }

        Value::RemoteRef(inner) => {
            out.push_str(":rref ");
            explain(inner, out);
        }

        Value::Cons { car, cdr } => {
            out.push_str(":cons ");
            explain(car, out);
            out.push(' ');
            explain(cdr, out);
        }

        Value::Package { name } => {
            out.push_str(":package ");
            explain(name, out);
        }

        Value::Symbol {
            package,
            name,
            keyword,
        } => {
            out.push_str(":symbol ");
            if *keyword {
                out.push_str(":keyword");
            } else if let Some(package) = package {
                explain(package, out);
            }
            out.push(' ');
            explain(name, out);
        }

        // Not a wire kind: an already-decoded error value renders plainly
        // rather than panicking (`CPK_ERROR` never reaches `explain_object_r`
        // in valid use).
        Value::Error(e) => {
            write!(out, ":error {} at byte {}", e.message, e.position).unwrap();
        }
    }
    out.push(')');
}

/// Convenience wrapper returning a fresh `String`.
pub fn explain_to_string(value: &Value) -> String {
    let mut out = String::new();
    explain(value, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explains_int8() {
        let v = Value::Number(Number::Int8(42));
        assert_eq!(explain_to_string(&v), "(:number :int8 42)");
    }

    #[test]
    fn explains_bool() {
        assert_eq!(explain_to_string(&Value::Bool(true)), "(:boolean t)");
        assert_eq!(explain_to_string(&Value::Bool(false)), "(:boolean nil)");
    }

    #[test]
    fn explains_string() {
        let v = Value::String(b"hello".to_vec());
        assert_eq!(explain_to_string(&v), "(:string \"hello\")");
    }

    #[test]
    fn explains_cons() {
        let v = Value::Cons {
            car: Box::new(Value::Number(Number::Int8(1))),
            cdr: Box::new(Value::String(b"x".to_vec())),
        };
        assert_eq!(
            explain_to_string(&v),
            "(:cons (:number :int8 1) (:string \"x\"))"
        );
    }

    #[test]
    fn explains_keyword_symbol_without_package() {
        let v = Value::Symbol {
            package: None,
            name: Box::new(Value::String(b"foo".to_vec())),
            keyword: true,
        };
        assert_eq!(
            explain_to_string(&v),
            "(:symbol :keyword (:string \"foo\"))"
        );
    }

    #[test]
    fn explains_non_keyword_symbol_with_package() {
        let v = Value::Symbol {
            package: Some(Box::new(Value::String(b"cl-user".to_vec()))),
            name: Box::new(Value::String(b"foo".to_vec())),
            keyword: false,
        };
        assert_eq!(
            explain_to_string(&v),
            "(:symbol (:string \"cl-user\") (:string \"foo\"))"
        );
    }

    #[test]
    fn explains_vector_container() {
        let v = Value::Container {
            kind: ContainerKind::Vector,
            fixed_header: None,
            children: vec![
                Value::Number(Number::Int8(0)),
                Value::Number(Number::Int8(1)),
            ],
        };
        assert_eq!(
            explain_to_string(&v),
            "(:vector (:number :int8 0) (:number :int8 1))"
        );
    }

    #[test]
    fn explains_error_value() {
        use crate::error::{CpkErrorValue, ErrorKind};
        let v = Value::Error(CpkErrorValue::new(ErrorKind::Eof, None, 3));
        assert_eq!(explain_to_string(&v), "(:error End of input at byte 3)");
    }
}
