use crate::error::DecodeError;
use crate::header::METHOD_HEADER_MIN_SIZE;
use crate::reader::{read_u16, read_u32, try_read_u16};

/// Record sizes used by one loaded image.
///
/// The image declares these in its entrypoint record so that later formats
/// can append fields to each record without breaking older readers. Every
/// table view strides by these sizes, never by the fields it knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSizes {
    pub method_header: u16,
    pub exc_entry: u16,
    pub line_entry: u16,
    pub dbg_header: u16,
    pub lclsym_header: u16,
    pub dbg_frame: u16,
    pub dbg_fmt_version: u16,
}

pub const EXC_ENTRY_MIN_SIZE: u16 = 10;
pub const LINE_ENTRY_MIN_SIZE: u16 = 10;
pub const LCLSYM_HEADER_MIN_SIZE: u16 = 6;
/// Frame records without a bytecode range.
pub const LEGACY_FRAME_SIZE: u16 = 4;
/// Smallest frame record that carries `start_ofs` and `end_ofs`.
pub const RANGED_FRAME_SIZE: u16 = 8;

/// Length of the fixed part of the entrypoint record.
pub const ENTRYPOINT_RECORD_SIZE: usize = 16;

impl Default for TableSizes {
    fn default() -> Self {
        Self {
            method_header: METHOD_HEADER_MIN_SIZE as u16,
            exc_entry: EXC_ENTRY_MIN_SIZE,
            line_entry: LINE_ENTRY_MIN_SIZE,
            dbg_header: 0,
            lclsym_header: LCLSYM_HEADER_MIN_SIZE,
            dbg_frame: RANGED_FRAME_SIZE,
            dbg_fmt_version: 0,
        }
    }
}

/// Decoded entrypoint record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entrypoint {
    /// Code pool offset of the program's entry function.
    pub entry_ofs: u32,
    pub sizes: TableSizes,
}

impl TableSizes {
    /// Whether frame records carry a bytecode range.
    #[inline(always)]
    pub const fn frames_have_range(&self) -> bool {
        self.dbg_frame >= RANGED_FRAME_SIZE
    }

    /// Decodes an entrypoint record.
    ///
    /// ```text
    /// 0   u32  entry function offset
    /// 4   u16  method header size
    /// 6   u16  exception entry size
    /// 8   u16  debug line entry size
    /// 10  u16  debug table header size
    /// 12  u16  debug local symbol header size
    /// 14  u16  debug format version
    /// 16  u16  debug frame size (optional; legacy images stop at 16)
    /// ```
    pub fn from_entrypoint(bytes: &[u8]) -> Result<Entrypoint, DecodeError> {
        if bytes.len() < ENTRYPOINT_RECORD_SIZE {
            return Err(DecodeError::Truncated {
                needed: ENTRYPOINT_RECORD_SIZE,
                got: bytes.len(),
            });
        }

        let sizes = Self {
            method_header: read_u16(bytes, 4),
            exc_entry: read_u16(bytes, 6),
            line_entry: read_u16(bytes, 8),
            dbg_header: read_u16(bytes, 10),
            lclsym_header: read_u16(bytes, 12),
            dbg_fmt_version: read_u16(bytes, 14),
            dbg_frame: try_read_u16(bytes, 16).unwrap_or(LEGACY_FRAME_SIZE),
        };
        sizes.validate()?;

        Ok(Entrypoint {
            entry_ofs: read_u32(bytes, 0),
            sizes,
        })
    }

    /// Checks every size against the smallest record this reader understands.
    pub fn validate(&self) -> Result<(), DecodeError> {
        let checks: [(&'static str, u16, u16); 5] = [
            ("method header", self.method_header, METHOD_HEADER_MIN_SIZE as u16),
            ("exception entry", self.exc_entry, EXC_ENTRY_MIN_SIZE),
            ("debug line entry", self.line_entry, LINE_ENTRY_MIN_SIZE),
            ("debug local symbol header", self.lclsym_header, LCLSYM_HEADER_MIN_SIZE),
            ("debug frame", self.dbg_frame, LEGACY_FRAME_SIZE),
        ];
        for (record, got, min) in checks {
            if got < min {
                return Err(DecodeError::SizeTooSmall { record, min, got });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sizes: [u16; 6], frame: Option<u16>) -> Vec<u8> {
        let mut buf = 0x1234u32.to_le_bytes().to_vec();
        for s in sizes {
            buf.extend_from_slice(&s.to_le_bytes());
        }
        if let Some(f) = frame {
            buf.extend_from_slice(&f.to_le_bytes());
        }
        buf
    }

    #[test]
    fn defaults_match_reference_compiler() {
        let s = TableSizes::default();
        assert_eq!(s.method_header, 10);
        assert_eq!(s.exc_entry, 10);
        assert_eq!(s.line_entry, 10);
        assert_eq!(s.dbg_header, 0);
        assert_eq!(s.lclsym_header, 6);
        assert_eq!(s.dbg_frame, 8);
        assert!(s.frames_have_range());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn entrypoint_with_frame_size() {
        let ep = TableSizes::from_entrypoint(&record([10, 12, 10, 2, 6, 1], Some(8))).unwrap();
        assert_eq!(ep.entry_ofs, 0x1234);
        assert_eq!(ep.sizes.exc_entry, 12);
        assert_eq!(ep.sizes.dbg_header, 2);
        assert_eq!(ep.sizes.dbg_fmt_version, 1);
        assert_eq!(ep.sizes.dbg_frame, 8);
    }

    #[test]
    fn legacy_entrypoint_uses_short_frames() {
        let ep = TableSizes::from_entrypoint(&record([10, 10, 10, 0, 6, 0], None)).unwrap();
        assert_eq!(ep.sizes.dbg_frame, LEGACY_FRAME_SIZE);
        assert!(!ep.sizes.frames_have_range());
    }

    #[test]
    fn short_record_is_rejected() {
        assert_eq!(
            TableSizes::from_entrypoint(&[0; 12]),
            Err(DecodeError::Truncated { needed: 16, got: 12 })
        );
    }

    #[test]
    fn undersized_record_is_rejected() {
        let err = TableSizes::from_entrypoint(&record([10, 8, 10, 0, 6, 0], Some(8))).unwrap_err();
        assert_eq!(
            err,
            DecodeError::SizeTooSmall { record: "exception entry", min: 10, got: 8 }
        );
    }
}
