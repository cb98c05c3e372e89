// Copyright 2022 - 2023 Wenmeng See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
//
// The length-prefixed size-class codec shared by containers, strings, and
// sized refs/tags. Ported from `cpk_encode_size_header`/`cpk_decode_size`.

use crate::error::{CpkErrorValue, ErrorKind};
use crate::header::{self, consts, SizeBits};
use crate::io::{ByteSink, ByteSource};
use crate::CpkResult;

/// Picks the smallest of {8, 16, 32} bits that can hold `n`, mirroring
/// `cpk_encode_size_header`'s `size & 0xFFFF0000` / `0x0000FF00` tests.
pub fn class_for_value(n: u32) -> SizeBits {
    if n & 0xFFFF_0000 != 0 {
        SizeBits::ThirtyTwo
    } else if n & 0x0000_FF00 != 0 {
        SizeBits::Sixteen
    } else {
        SizeBits::Eight
    }
}

fn size_bits_code(bits: SizeBits) -> u8 {
    match bits {
        SizeBits::Eight => consts::SIZE_8,
        SizeBits::Sixteen => consts::SIZE_16,
        SizeBits::ThirtyTwo => consts::SIZE_32,
        SizeBits::Reserved => unreachable!("never chosen for encoding"),
    }
}

/// Writes `header_base | size_class_bits`, then `n` in the chosen width.
/// Shared by `encode_container`, `encode_string`, and the sized (non-inline)
/// ref/tag forms.
pub fn encode_size(sink: &mut impl ByteSink, header_base: u8, n: u32) -> CpkResult<()> {
    let class = class_for_value(n);
    sink.write8(header_base | size_bits_code(class))?;
    match class {
        SizeBits::Eight => sink.write8(n as u8)?,
        SizeBits::Sixteen => sink.write16(n as u16)?,
        SizeBits::ThirtyTwo => sink.write32(n)?,
        SizeBits::Reserved => unreachable!(),
    }
    Ok(())
}

/// Reads the size following an *already-consumed* header byte, using that
/// header's size-class bits to pick the width. Size class `3` is reserved
/// and is rejected with `BadSize` at the header's byte position.
pub fn decode_size(source: &mut impl ByteSource, header: u8) -> CpkResult<u32> {
    match header::size_bits(header) {
        SizeBits::Eight => Ok(source.read8()? as u32),
        SizeBits::Sixteen => Ok(source.read16()? as u32),
        SizeBits::ThirtyTwo => Ok(source.read32()?),
        SizeBits::Reserved => Err(CpkErrorValue::new(
            ErrorKind::BadSize,
            Some(header),
            source.position(),
        )
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{GrowableBuffer, SliceSource};

    #[test]
    fn picks_smallest_class() {
        assert_eq!(class_for_value(0), SizeBits::Eight);
        assert_eq!(class_for_value(0xFF), SizeBits::Eight);
        assert_eq!(class_for_value(0x100), SizeBits::Sixteen);
        assert_eq!(class_for_value(0xFFFF), SizeBits::Sixteen);
        assert_eq!(class_for_value(0x1_0000), SizeBits::ThirtyTwo);
    }

    #[test]
    fn round_trips_each_class() {
        for n in [0u32, 0xFF, 0x100, 0xFFFF, 0x1_0000, 0xFFFF_FFFF] {
            let mut sink = GrowableBuffer::new();
            encode_size(&mut sink, 0x40, n).unwrap();
            let bytes = sink.into_vec();
            let mut src = SliceSource::new(&bytes);
            let header = src.read8().unwrap();
            let decoded = decode_size(&mut src, header).unwrap();
            assert_eq!(decoded, n);
        }
    }

    #[test]
    fn reserved_class_is_bad_size() {
        let mut src = SliceSource::new(&[]);
        let err = decode_size(&mut src, 0x43).unwrap_err();
        assert!(matches!(
            err,
            crate::CpkError::Decode(crate::error::CpkErrorValue {
                kind: ErrorKind::BadSize,
                ..
            })
        ));
    }
}
