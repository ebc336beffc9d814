//! The two variable-length integer codecs the vbyte table family selects
//! between (the signature's "compression mode" bits).
//!
//! - **vlong**: LSB-first 7-bit groups, continuation flagged in the high
//!   bit of every non-final byte. Cheap to decode when most values are
//!   small.
//! - **vlong2**: MSB-first 7-bit groups, the *final* byte flagged in its
//!   high bit. Decodes most-significant-first, and equal-length
//!   encodings compare like their values.
//!
//! The `*_len` estimators are used heavily by the strategy selector's
//! cost model, so they must agree byte-for-byte with the writers.

use std::io;

/// Encoded length of `v` under the vlong codec.
#[inline]
pub fn vlong_len(v: u64) -> usize {
    let bits = 64 - v.leading_zeros() as usize;
    std::cmp::max(1, bits.div_ceil(7))
}

/// Encoded length of `v` under the vlong2 codec. The two codecs happen to
/// agree on length; they differ only in byte order and flag placement.
#[inline]
pub fn vlong2_len(v: u64) -> usize {
    vlong_len(v)
}

/// Append `v` LSB-first, continuation bit on non-final bytes.
pub fn write_vlong(out: &mut Vec<u8>, mut v: u64) {
    loop {
        let b = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            out.push(b);
            return;
        }
        out.push(b | 0x80);
    }
}

/// Read a vlong at `pos`, advancing past it.
pub fn read_vlong(buf: &[u8], pos: &mut usize) -> io::Result<u64> {
    let mut v: u64 = 0;
    let mut shift = 0u32;
    let mut p = *pos;
    loop {
        let b = *buf.get(p).ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "truncated vlong")
        })?;
        p += 1;
        // the 10th byte may only carry bit 0; anything above shifts out
        if shift >= 64 || (shift == 63 && b & 0x7E != 0) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "vlong exceeds 64 bits",
            ));
        }
        v |= u64::from(b & 0x7F) << shift;
        if b & 0x80 == 0 {
            *pos = p;
            return Ok(v);
        }
        shift += 7;
    }
}

/// Append `v` MSB-first, terminator bit on the final byte.
pub fn write_vlong2(out: &mut Vec<u8>, v: u64) {
    let len = vlong2_len(v);
    for i in (0..len).rev() {
        let group = ((v >> (7 * i)) & 0x7F) as u8;
        if i == 0 {
            out.push(group | 0x80);
        } else {
            out.push(group);
        }
    }
}

/// Read a vlong2 at `pos`, advancing past it.
pub fn read_vlong2(buf: &[u8], pos: &mut usize) -> io::Result<u64> {
    let mut v: u64 = 0;
    let mut p = *pos;
    loop {
        let b = *buf.get(p).ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "truncated vlong2")
        })?;
        p += 1;
        if p - *pos > 10 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "vlong2 exceeds 64 bits",
            ));
        }
        v = (v << 7) | u64::from(b & 0x7F);
        if b & 0x80 != 0 {
            *pos = p;
            return Ok(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[u64] = &[
        0,
        1,
        127,
        128,
        255,
        16_383,
        16_384,
        2_097_151,
        2_097_152,
        u32::MAX as u64,
        u64::MAX >> 1,
        u64::MAX,
    ];

    #[test]
    fn test_vlong_round_trip_and_len() {
        for &v in SAMPLES {
            let mut out = Vec::new();
            write_vlong(&mut out, v);
            assert_eq!(out.len(), vlong_len(v), "len mismatch for {}", v);
            let mut pos = 0;
            assert_eq!(read_vlong(&out, &mut pos).unwrap(), v);
            assert_eq!(pos, out.len());
        }
    }

    #[test]
    fn test_vlong2_round_trip_and_len() {
        for &v in SAMPLES {
            let mut out = Vec::new();
            write_vlong2(&mut out, v);
            assert_eq!(out.len(), vlong2_len(v), "len mismatch for {}", v);
            let mut pos = 0;
            assert_eq!(read_vlong2(&out, &mut pos).unwrap(), v);
            assert_eq!(pos, out.len());
        }
    }

    #[test]
    fn test_vlong2_equal_length_encodings_sort_like_values() {
        // pairs sharing an encoded length
        for (a, b) in [(0u64, 127u64), (128, 16_383), (16_384, 2_097_151)] {
            let (mut ea, mut eb) = (Vec::new(), Vec::new());
            write_vlong2(&mut ea, a);
            write_vlong2(&mut eb, b);
            assert_eq!(ea.len(), eb.len());
            assert!(ea < eb, "encoding order broke for {} vs {}", a, b);
        }
    }

    #[test]
    fn test_sequences_are_self_delimiting() {
        let values = [3u64, 300, 0, u64::MAX, 42];
        let mut out = Vec::new();
        for &v in &values {
            write_vlong(&mut out, v);
            write_vlong2(&mut out, v);
        }
        let mut pos = 0;
        for &v in &values {
            assert_eq!(read_vlong(&out, &mut pos).unwrap(), v);
            assert_eq!(read_vlong2(&out, &mut pos).unwrap(), v);
        }
        assert_eq!(pos, out.len());
    }

    #[test]
    fn test_vlong_overflow_bits_rejected() {
        // 10 bytes: the final byte may only carry bit 0
        let mut buf = vec![0x80u8; 9];
        buf.push(0x01);
        let mut pos = 0;
        assert_eq!(read_vlong(&buf, &mut pos).unwrap(), 1u64 << 63);

        buf[9] = 0x02;
        let mut pos = 0;
        assert_eq!(
            read_vlong(&buf, &mut pos).unwrap_err().kind(),
            std::io::ErrorKind::InvalidData
        );

        // an 11th continuation byte overflows outright
        let buf = vec![0x80u8; 11];
        let mut pos = 0;
        assert_eq!(
            read_vlong(&buf, &mut pos).unwrap_err().kind(),
            std::io::ErrorKind::InvalidData
        );
    }

    #[test]
    fn test_truncated_input_is_eof() {
        let mut out = Vec::new();
        write_vlong(&mut out, 1_000_000);
        out.pop();
        let mut pos = 0;
        assert_eq!(
            read_vlong(&out, &mut pos).unwrap_err().kind(),
            std::io::ErrorKind::UnexpectedEof
        );

        let mut out2 = Vec::new();
        write_vlong2(&mut out2, 1_000_000);
        out2.pop();
        let mut pos2 = 0;
        assert_eq!(
            read_vlong2(&out2, &mut pos2).unwrap_err().kind(),
            std::io::ErrorKind::UnexpectedEof
        );
    }
}
