use t3_object::CodeAddr;

use crate::error::DecodeError;
use crate::reader::{read_u8, read_u16};

/// Size of the method header fields this reader understands.
pub const METHOD_HEADER_MIN_SIZE: usize = 10;

const VARARGS_BIT: u8 = 0x80;

/// Read-only view over a method header.
///
/// `bytes` starts at the first header byte and runs to the end of the region
/// holding the method, so sub-table offsets can be followed from it. Two views
/// denote the same method iff their [`addr`](Self::addr) is equal.
///
/// ```text
/// 0  u8   argc          bit 7 = varargs, low 7 bits = required count
/// 1  u8   opt_argc
/// 2  u16  locals
/// 4  u16  stack_depth
/// 6  u16  exc_ofs       0 = no exception table
/// 8  u16  dbg_ofs       0 = no debug table
/// ```
#[derive(Clone, Copy)]
pub struct MethodHeader<'a> {
    bytes: &'a [u8],
}

impl<'a> MethodHeader<'a> {
    /// Wraps trusted header bytes.
    ///
    /// Field reads panic if `bytes` is shorter than the header.
    #[inline(always)]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Wraps header bytes after checking the fixed fields are present.
    pub fn checked(bytes: &'a [u8]) -> Result<Self, DecodeError> {
        if bytes.len() < METHOD_HEADER_MIN_SIZE {
            return Err(DecodeError::Truncated {
                needed: METHOD_HEADER_MIN_SIZE,
                got: bytes.len(),
            });
        }
        Ok(Self { bytes })
    }

    #[inline(always)]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[inline(always)]
    pub fn addr(&self) -> CodeAddr {
        CodeAddr::of(self.bytes)
    }

    // ── fields ─────────────────────────────────────────────────────

    #[inline(always)]
    pub fn min_argc(&self) -> u8 {
        read_u8(self.bytes, 0) & !VARARGS_BIT
    }

    #[inline(always)]
    pub fn opt_argc(&self) -> u8 {
        read_u8(self.bytes, 1)
    }

    #[inline(always)]
    pub fn max_argc(&self) -> u16 {
        self.min_argc() as u16 + self.opt_argc() as u16
    }

    #[inline(always)]
    pub fn is_varargs(&self) -> bool {
        read_u8(self.bytes, 0) & VARARGS_BIT != 0
    }

    /// Local variable slots, not counting the implicit argument count.
    #[inline(always)]
    pub fn locals(&self) -> u16 {
        read_u16(self.bytes, 2)
    }

    #[inline(always)]
    pub fn stack_depth(&self) -> u16 {
        read_u16(self.bytes, 4)
    }

    #[inline(always)]
    pub fn exc_ofs(&self) -> u16 {
        read_u16(self.bytes, 6)
    }

    #[inline(always)]
    pub fn dbg_ofs(&self) -> u16 {
        read_u16(self.bytes, 8)
    }

    /// Whether a call passing `actual` arguments satisfies this header.
    pub fn argc_ok(&self, actual: u32) -> bool {
        let min = self.min_argc() as u32;
        if self.is_varargs() {
            actual >= min
        } else {
            actual >= min && actual <= self.max_argc() as u32
        }
    }

    /// Bytes starting `ofs` bytes after the header start, if `ofs` is set
    /// and at least the table's leading count word is present.
    #[inline]
    pub(crate) fn sub_table(&self, ofs: u16) -> Option<&'a [u8]> {
        match ofs {
            0 => None,
            ofs => self.bytes.get(ofs as usize..).filter(|rest| rest.len() >= 2),
        }
    }
}

impl PartialEq for MethodHeader<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for MethodHeader<'_> {}

impl core::fmt::Debug for MethodHeader<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MethodHeader")
            .field("addr", &self.addr())
            .field("min_argc", &self.min_argc())
            .field("opt_argc", &self.opt_argc())
            .field("varargs", &self.is_varargs())
            .field("locals", &self.locals())
            .field("stack_depth", &self.stack_depth())
            .field("exc_ofs", &self.exc_ofs())
            .field("dbg_ofs", &self.dbg_ofs())
            .finish()
    }
}

/// Header-only method record describing an intrinsic's argument contract.
///
/// Locals, stack depth and both sub-table offsets are zero.
pub const fn synth_header(min_argc: u8, opt_argc: u8, varargs: bool) -> [u8; METHOD_HEADER_MIN_SIZE] {
    let argc = if varargs { min_argc | VARARGS_BIT } else { min_argc };
    [argc, opt_argc, 0, 0, 0, 0, 0, 0, 0, 0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_arity_with_optional() {
        let bytes = [0x03, 0x01, 0x02, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00];
        let h = MethodHeader::new(&bytes);
        assert_eq!(h.min_argc(), 3);
        assert_eq!(h.opt_argc(), 1);
        assert_eq!(h.max_argc(), 4);
        assert!(!h.is_varargs());
        assert_eq!(h.locals(), 2);
        assert_eq!(h.stack_depth(), 5);
        assert_eq!(h.exc_ofs(), 0);
        assert_eq!(h.dbg_ofs(), 0);
        assert!(h.argc_ok(3));
        assert!(h.argc_ok(4));
        assert!(!h.argc_ok(5));
        assert!(!h.argc_ok(2));
    }

    #[test]
    fn varargs_accepts_any_count_from_min() {
        let bytes = [0x82, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let h = MethodHeader::new(&bytes);
        assert!(h.is_varargs());
        assert_eq!(h.min_argc(), 2);
        assert!(h.argc_ok(2));
        assert!(h.argc_ok(100));
        assert!(!h.argc_ok(1));
    }

    #[test]
    fn multi_byte_fields_are_little_endian() {
        let bytes = [0, 0, 0x34, 0x12, 0xcd, 0xab, 0x10, 0x00, 0x00, 0x01];
        let h = MethodHeader::new(&bytes);
        assert_eq!(h.locals(), 0x1234);
        assert_eq!(h.stack_depth(), 0xabcd);
        assert_eq!(h.exc_ofs(), 0x10);
        assert_eq!(h.dbg_ofs(), 0x100);
    }

    #[test]
    fn checked_rejects_short_header() {
        assert!(MethodHeader::checked(&[0; 9]).is_err());
        assert!(MethodHeader::checked(&[0; 10]).is_ok());
    }

    #[test]
    fn equality_is_address_identity() {
        let a = synth_header(1, 0, false);
        let b = synth_header(1, 0, false);
        assert_eq!(MethodHeader::new(&a), MethodHeader::new(&a));
        assert_ne!(MethodHeader::new(&a), MethodHeader::new(&b));
    }

    #[test]
    fn synth_header_layout() {
        assert_eq!(synth_header(2, 1, false), [2, 1, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(synth_header(1, 0, true), [0x81, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let bytes = synth_header(1, 2, true);
        let h = MethodHeader::new(&bytes);
        assert_eq!((h.min_argc(), h.opt_argc(), h.is_varargs()), (1, 2, true));
        assert_eq!(h.exc_ofs(), 0);
        assert_eq!(h.dbg_ofs(), 0);
    }
}
