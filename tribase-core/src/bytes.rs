//! Low-level byte cursor helpers shared by every table codec.
//!
//! Readers take a `&[u8]` plus an advancing `pos: &mut usize` and return
//! `io::Result`, so a truncated or corrupt span surfaces as
//! `UnexpectedEof`/`InvalidData` instead of a panic. Writers append to a
//! `Vec<u8>`; the caller owns width selection and value-fit guarantees.

use std::io;

/// Fail with `UnexpectedEof` unless `len` bytes remain at `pos`.
#[inline]
pub fn ensure_len(buf: &[u8], pos: usize, len: usize) -> io::Result<()> {
    if pos + len > buf.len() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "need {} bytes at offset {}, only {} available",
                len,
                pos,
                buf.len().saturating_sub(pos)
            ),
        ));
    }
    Ok(())
}

#[inline]
pub fn read_u8(buf: &[u8], pos: &mut usize) -> io::Result<u8> {
    ensure_len(buf, *pos, 1)?;
    let v = buf[*pos];
    *pos += 1;
    Ok(v)
}

#[inline]
pub fn read_u16(buf: &[u8], pos: &mut usize) -> io::Result<u16> {
    ensure_len(buf, *pos, 2)?;
    let v = u16::from_le_bytes([buf[*pos], buf[*pos + 1]]);
    *pos += 2;
    Ok(v)
}

#[inline]
pub fn read_u32(buf: &[u8], pos: &mut usize) -> io::Result<u32> {
    ensure_len(buf, *pos, 4)?;
    let mut b = [0u8; 4];
    b.copy_from_slice(&buf[*pos..*pos + 4]);
    *pos += 4;
    Ok(u32::from_le_bytes(b))
}

#[inline]
pub fn read_u64(buf: &[u8], pos: &mut usize) -> io::Result<u64> {
    ensure_len(buf, *pos, 8)?;
    let mut b = [0u8; 8];
    b.copy_from_slice(&buf[*pos..*pos + 8]);
    *pos += 8;
    Ok(u64::from_le_bytes(b))
}

/// Read an unsigned value stored at one of the four fixed widths.
#[inline]
pub fn read_uw(buf: &[u8], pos: &mut usize, width: u8) -> io::Result<u64> {
    match width {
        1 => read_u8(buf, pos).map(u64::from),
        2 => read_u16(buf, pos).map(u64::from),
        4 => read_u32(buf, pos).map(u64::from),
        8 => read_u64(buf, pos),
        w => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported field width {}", w),
        )),
    }
}

/// Append `v` at one of the four fixed widths, little-endian.
///
/// The caller guarantees `v` fits the width (the strategy selector picked
/// it from the group's maximum magnitude).
#[inline]
pub fn write_uw(out: &mut Vec<u8>, v: u64, width: u8) {
    match width {
        1 => out.push(v as u8),
        2 => out.extend_from_slice(&(v as u16).to_le_bytes()),
        4 => out.extend_from_slice(&(v as u32).to_le_bytes()),
        _ => out.extend_from_slice(&v.to_le_bytes()),
    }
}

/// Smallest supported fixed width ({1, 2, 4, 8}) holding `max`.
#[inline]
pub fn width_for(max: u64) -> u8 {
    if max <= 0xFF {
        1
    } else if max <= 0xFFFF {
        2
    } else if max <= 0xFFFF_FFFF {
        4
    } else {
        8
    }
}

/// Two-bit width flag for a fixed width: 1→0, 2→1, 4→2, 8→3.
#[inline]
pub fn flag_for_width(width: u8) -> u8 {
    match width {
        1 => 0,
        2 => 1,
        4 => 2,
        _ => 3,
    }
}

/// Inverse of [`flag_for_width`].
#[inline]
pub fn width_for_flag(flag: u8) -> u8 {
    match flag & 3 {
        0 => 1,
        1 => 2,
        2 => 4,
        _ => 8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_advances_pos() {
        let buf = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let mut pos = 0;
        assert_eq!(read_u8(&buf, &mut pos).unwrap(), 0x01);
        assert_eq!(read_u16(&buf, &mut pos).unwrap(), 0x0302);
        assert_eq!(read_u32(&buf, &mut pos).unwrap(), 0x07060504);
        assert_eq!(pos, 7);
    }

    #[test]
    fn test_truncated_read_is_eof() {
        let buf = [0u8; 3];
        let mut pos = 0;
        let err = read_u32(&buf, &mut pos).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
        // pos untouched on failure
        assert_eq!(pos, 0);
    }

    #[test]
    fn test_fixed_width_round_trip() {
        for (v, w) in [
            (0u64, 1u8),
            (255, 1),
            (256, 2),
            (65_535, 2),
            (65_536, 4),
            (u32::MAX as u64, 4),
            (u32::MAX as u64 + 1, 8),
            (u64::MAX, 8),
        ] {
            assert_eq!(width_for(v), w);
            let mut out = Vec::new();
            write_uw(&mut out, v, w);
            assert_eq!(out.len(), w as usize);
            let mut pos = 0;
            assert_eq!(read_uw(&out, &mut pos, w).unwrap(), v);
        }
    }

    #[test]
    fn test_width_flag_round_trip() {
        for w in [1u8, 2, 4, 8] {
            assert_eq!(width_for_flag(flag_for_width(w)), w);
        }
    }

    #[test]
    fn test_bad_width_rejected() {
        let buf = [0u8; 8];
        let mut pos = 0;
        let err = read_uw(&buf, &mut pos, 3).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
