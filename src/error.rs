// Copyright 2022 - 2023 Wenmeng See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::{fmt, result};

/// Stable error-kind taxonomy carried on the wire-facing [`crate::Value::Error`]
/// variant. Kept distinct from [`CpkError`]: this is data a decoder builds
/// while walking a stream, the other is the ambient `std::error::Error` type
/// returned by the public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Stream ended mid-value.
    Eof,
    /// Unclassifiable header byte or number subtype.
    BadHeader,
    /// Reserved size class (`0b11`) selected by a header.
    BadSize,
    /// A compound value's child violated its kind constraint.
    BadType,
}

impl ErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::Eof => "End of input",
            ErrorKind::BadHeader => "Bad header value",
            ErrorKind::BadSize => "Bad size type",
            ErrorKind::BadType => "Bad type",
        }
    }
}

/// The decoded, wire-facing error payload. Mirrors `cpk_error_t`: a kind
/// code, a human message, the offending byte (when one was read), and the
/// byte offset the failure was detected at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpkErrorValue {
    pub kind: ErrorKind,
    pub message: &'static str,
    pub value: Option<u8>,
    pub position: usize,
}

impl CpkErrorValue {
    pub fn new(kind: ErrorKind, value: Option<u8>, position: usize) -> CpkErrorValue {
        CpkErrorValue {
            message: kind.message(),
            kind,
            value,
            position,
        }
    }
}

impl fmt::Display for CpkErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.message, self.position)
    }
}

/// Ambient, `std::error::Error`-compatible error type returned by the
/// public `encode`/`decode` entry points. Modeled on `webparse::WebError`:
/// a flat enum with a `description_str` and `From` conversions rather than
/// a derive-macro hierarchy.
#[derive(Debug)]
pub enum CpkError {
    /// A decode failure with full wire-level detail.
    Decode(CpkErrorValue),
    Io(std::io::Error),
}

impl CpkError {
    #[inline]
    fn description_str(&self) -> &'static str {
        match self {
            CpkError::Decode(e) => e.kind.message(),
            CpkError::Io(_) => "io error",
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, CpkError::Decode(e) if e.kind == ErrorKind::Eof)
    }
}

impl fmt::Display for CpkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpkError::Decode(e) => write!(f, "{}", e),
            CpkError::Io(e) => write!(f, "{}: {}", self.description_str(), e),
        }
    }
}

impl std::error::Error for CpkError {}

impl From<std::io::Error> for CpkError {
    fn from(e: std::io::Error) -> Self {
        CpkError::Io(e)
    }
}

impl From<CpkErrorValue> for CpkError {
    fn from(e: CpkErrorValue) -> Self {
        CpkError::Decode(e)
    }
}

pub type CpkResult<T> = result::Result<T, CpkError>;
