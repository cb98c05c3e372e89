// Copyright 2022 - 2023 Wenmeng See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
//
// Byte sinks and sources. Multi-byte values are always big-endian on the
// wire (conspack never uses the little/native-endian forms `webparse::Buf`
// offers for HTTP/2 framing).

use std::io::{Read, Write};

use crate::error::{CpkError, CpkErrorValue, ErrorKind};
use crate::CpkResult;

/// A byte-addressable input. The in-memory `SliceSource` is what `decode`
/// uses; `FdSource` wraps any `std::io::Read` for descriptor-backed input.
pub trait ByteSource {
    /// Number of unread bytes remaining, when known. Descriptor-backed
    /// sources that cannot report this return `usize::MAX`.
    fn remaining(&self) -> usize;

    /// Current read cursor, used to stamp error positions.
    fn position(&self) -> usize;

    fn read8(&mut self) -> CpkResult<u8>;
    fn read16(&mut self) -> CpkResult<u16>;
    fn read32(&mut self) -> CpkResult<u32>;
    fn read64(&mut self) -> CpkResult<u64>;
    fn read_bytes(&mut self, len: usize) -> CpkResult<Vec<u8>>;
}

/// A byte-addressable output. `GrowableBuffer` is the in-memory sink used by
/// `encode`; `FdSink` wraps any `std::io::Write`.
pub trait ByteSink {
    fn write8(&mut self, val: u8) -> CpkResult<()>;
    fn write16(&mut self, val: u16) -> CpkResult<()>;
    fn write32(&mut self, val: u32) -> CpkResult<()>;
    fn write64(&mut self, val: u64) -> CpkResult<()>;
    fn write_bytes(&mut self, val: &[u8]) -> CpkResult<()>;
}

fn eof_at(position: usize) -> CpkError {
    CpkError::Decode(CpkErrorValue::new(ErrorKind::Eof, None, position))
}

/// In-memory, slice-backed source. Tracks its own cursor rather than
/// shrinking the slice on each read (`webparse`'s `Buf for &[u8]` advances
/// by reslicing); keeping the original slice plus a cursor makes error
/// positions trivial to report.
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> SliceSource<'a> {
        SliceSource { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> CpkResult<&'a [u8]> {
        if self.data.len() - self.pos < len {
            return Err(eof_at(self.pos));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }
}

impl<'a> ByteSource for SliceSource<'a> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn read8(&mut self) -> CpkResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read16(&mut self) -> CpkResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read32(&mut self) -> CpkResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read64(&mut self) -> CpkResult<u64> {
        let b = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_be_bytes(buf))
    }

    fn read_bytes(&mut self, len: usize) -> CpkResult<Vec<u8>> {
        Ok(self.take(len)?.to_vec())
    }
}

/// Growable in-memory output buffer. `Vec<u8>` already doubles its capacity
/// on growth, which is the same policy `cpk_ensure_buffer` implements by
/// hand (`buffer_size = 2 * buffer_size`) — no manual reallocation logic is
/// needed here.
#[derive(Debug, Default)]
pub struct GrowableBuffer {
    buf: Vec<u8>,
}

impl GrowableBuffer {
    pub fn new() -> GrowableBuffer {
        GrowableBuffer { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> GrowableBuffer {
        GrowableBuffer {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

impl ByteSink for GrowableBuffer {
    fn write8(&mut self, val: u8) -> CpkResult<()> {
        self.buf.push(val);
        Ok(())
    }

    fn write16(&mut self, val: u16) -> CpkResult<()> {
        self.buf.extend_from_slice(&val.to_be_bytes());
        Ok(())
    }

    fn write32(&mut self, val: u32) -> CpkResult<()> {
        self.buf.extend_from_slice(&val.to_be_bytes());
        Ok(())
    }

    fn write64(&mut self, val: u64) -> CpkResult<()> {
        self.buf.extend_from_slice(&val.to_be_bytes());
        Ok(())
    }

    fn write_bytes(&mut self, val: &[u8]) -> CpkResult<()> {
        self.buf.extend_from_slice(val);
        Ok(())
    }
}

/// Descriptor-backed source: a thin wrapper around any `Read`. No
/// buffering beyond what the caller's `Read` already provides; wrap it in
/// a `BufReader` first if that matters.
pub struct FdSource<R: Read> {
    inner: R,
    pos: usize,
}

impl<R: Read> FdSource<R> {
    pub fn new(inner: R) -> FdSource<R> {
        FdSource { inner, pos: 0 }
    }
}

impl<R: Read> ByteSource for FdSource<R> {
    fn remaining(&self) -> usize {
        usize::MAX
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn read8(&mut self) -> CpkResult<u8> {
        let mut buf = [0u8; 1];
        self.inner
            .read_exact(&mut buf)
            .map_err(|_| eof_at(self.pos))?;
        self.pos += 1;
        Ok(buf[0])
    }

    fn read16(&mut self) -> CpkResult<u16> {
        let mut buf = [0u8; 2];
        self.inner
            .read_exact(&mut buf)
            .map_err(|_| eof_at(self.pos))?;
        self.pos += 2;
        Ok(u16::from_be_bytes(buf))
    }

    fn read32(&mut self) -> CpkResult<u32> {
        let mut buf = [0u8; 4];
        self.inner
            .read_exact(&mut buf)
            .map_err(|_| eof_at(self.pos))?;
        self.pos += 4;
        Ok(u32::from_be_bytes(buf))
    }

    fn read64(&mut self) -> CpkResult<u64> {
        let mut buf = [0u8; 8];
        self.inner
            .read_exact(&mut buf)
            .map_err(|_| eof_at(self.pos))?;
        self.pos += 8;
        Ok(u64::from_be_bytes(buf))
    }

    fn read_bytes(&mut self, len: usize) -> CpkResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.inner
            .read_exact(&mut buf)
            .map_err(|_| eof_at(self.pos))?;
        self.pos += len;
        Ok(buf)
    }
}

/// Descriptor-backed sink: a thin wrapper around any `Write`.
pub struct FdSink<W: Write> {
    inner: W,
}

impl<W: Write> FdSink<W> {
    pub fn new(inner: W) -> FdSink<W> {
        FdSink { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ByteSink for FdSink<W> {
    fn write8(&mut self, val: u8) -> CpkResult<()> {
        self.inner.write_all(&[val])?;
        Ok(())
    }

    fn write16(&mut self, val: u16) -> CpkResult<()> {
        self.inner.write_all(&val.to_be_bytes())?;
        Ok(())
    }

    fn write32(&mut self, val: u32) -> CpkResult<()> {
        self.inner.write_all(&val.to_be_bytes())?;
        Ok(())
    }

    fn write64(&mut self, val: u64) -> CpkResult<()> {
        self.inner.write_all(&val.to_be_bytes())?;
        Ok(())
    }

    fn write_bytes(&mut self, val: &[u8]) -> CpkResult<()> {
        self.inner.write_all(val)?;
        Ok(())
    }
}
