//! Little-endian field readers over packed image bytes.
//!
//! Image records are stored without padding in a canonical byte order, so
//! every multi-byte field is read byte-wise regardless of host endianness or
//! alignment. Callers hand in trusted bytes; a read past the end of the slice
//! panics instead of reading foreign memory.

#[inline(always)]
pub fn read_u8(bytes: &[u8], at: usize) -> u8 {
    bytes[at]
}

#[inline(always)]
pub fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

#[inline(always)]
pub fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Reads a `u16` if the slice is long enough.
#[inline]
pub fn try_read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let b = bytes.get(at..at.checked_add(2)?)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}

/// Reads a `u32` if the slice is long enough.
#[inline]
pub fn try_read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let b = bytes.get(at..at.checked_add(4)?)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Reads a counted string: a `u16` byte length followed by that many bytes.
#[inline]
pub fn read_counted(bytes: &[u8], at: usize) -> Option<&[u8]> {
    let len = try_read_u16(bytes, at)? as usize;
    bytes.get(at + 2..at + 2 + len)
}
