use t3_object::ObjectId;

use crate::error::DecodeError;
use crate::header::MethodHeader;
use crate::reader::{read_u16, read_u32};
use crate::sizes::{EXC_ENTRY_MIN_SIZE, TableSizes};

/// View over a method's exception table.
///
/// ```text
/// u16              entry count
/// entry[count]     exc_entry bytes each
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ExceptionTable<'a> {
    bytes: &'a [u8],
    entry_size: usize,
}

impl<'a> ExceptionTable<'a> {
    /// The exception table of `hdr`, or `None` when the method has none.
    pub fn from_header(hdr: &MethodHeader<'a>, sizes: TableSizes) -> Option<Self> {
        let bytes = hdr.sub_table(hdr.exc_ofs())?;
        Some(Self {
            bytes,
            entry_size: sizes.exc_entry as usize,
        })
    }

    #[inline(always)]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[inline(always)]
    pub fn count(&self) -> u16 {
        read_u16(self.bytes, 0)
    }

    /// Confirms every entry the count promises lies inside the table bytes.
    /// Loaders run this before handing untrusted bytes to the accessors.
    pub fn check(&self) -> Result<(), DecodeError> {
        let needed = 2 + self.count() as usize * self.entry_size.max(EXC_ENTRY_MIN_SIZE as usize);
        if self.bytes.len() < needed {
            return Err(DecodeError::Truncated {
                needed,
                got: self.bytes.len(),
            });
        }
        Ok(())
    }

    pub fn entry(&self, idx: u16) -> ExceptionEntry<'a> {
        let at = 2 + idx as usize * self.entry_size;
        ExceptionEntry {
            bytes: &self.bytes[at..],
            size: self.entry_size,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = ExceptionEntry<'a>> + '_ {
        (0..self.count()).map(|i| self.entry(i))
    }

    /// First entry, in stored order, that protects `pc_ofs` against an
    /// exception for which `is_instance(class)` holds.
    ///
    /// `is_instance` receives each candidate's class and answers whether the
    /// thrown exception is that class or a subclass of it.
    pub fn find_handler(
        &self,
        pc_ofs: u16,
        mut is_instance: impl FnMut(ObjectId) -> bool,
    ) -> Option<ExceptionEntry<'a>> {
        self.iter()
            .find(|e| e.covers(pc_ofs) && is_instance(e.exc_class()))
    }
}

/// One exception table row. All offsets are relative to the method header.
#[derive(Debug, Clone, Copy)]
pub struct ExceptionEntry<'a> {
    bytes: &'a [u8],
    size: usize,
}

impl<'a> ExceptionEntry<'a> {
    #[inline(always)]
    pub fn start_ofs(&self) -> u16 {
        read_u16(self.bytes, 0)
    }

    /// Last protected byte, inclusive.
    #[inline(always)]
    pub fn end_ofs(&self) -> u16 {
        read_u16(self.bytes, 2)
    }

    #[inline(always)]
    pub fn exc_class(&self) -> ObjectId {
        ObjectId(read_u32(self.bytes, 4))
    }

    #[inline(always)]
    pub fn handler_ofs(&self) -> u16 {
        read_u16(self.bytes, 8)
    }

    #[inline(always)]
    pub fn covers(&self, pc_ofs: u16) -> bool {
        self.start_ofs() <= pc_ofs && pc_ofs <= self.end_ofs()
    }

    /// The entry stored after this one. Not bounded by the table count.
    #[inline]
    pub fn next(&self) -> ExceptionEntry<'a> {
        ExceptionEntry {
            bytes: &self.bytes[self.size..],
            size: self.size,
        }
    }

    #[inline]
    pub fn inc(&mut self) {
        *self = self.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{ExceptionRecord, MethodBuilder};

    fn method(sizes: TableSizes, entries: &[ExceptionRecord]) -> Vec<u8> {
        let mut b = MethodBuilder::new(sizes);
        b.code(&[0; 40]);
        for e in entries {
            b.exception(*e);
        }
        b.finish()
    }

    fn rec(start_ofs: u16, end_ofs: u16, class: u32, handler_ofs: u16) -> ExceptionRecord {
        ExceptionRecord {
            start_ofs,
            end_ofs,
            exc_class: ObjectId(class),
            handler_ofs,
        }
    }

    #[test]
    fn absent_table() {
        let bytes = [0u8; 10];
        let h = MethodHeader::new(&bytes);
        assert!(ExceptionTable::from_header(&h, TableSizes::default()).is_none());
    }

    #[test]
    fn base_follows_exc_ofs() {
        let sizes = TableSizes::default();
        let bytes = method(sizes, &[rec(10, 20, 7, 30)]);
        let h = MethodHeader::new(&bytes);
        let t = ExceptionTable::from_header(&h, sizes).unwrap();
        let base = bytes.as_ptr() as usize + h.exc_ofs() as usize;
        assert_eq!(t.bytes().as_ptr() as usize, base);
    }

    #[test]
    fn entries_are_read_in_order() {
        let sizes = TableSizes::default();
        let bytes = method(sizes, &[rec(10, 20, 7, 30), rec(12, 14, 8, 32)]);
        let h = MethodHeader::new(&bytes);
        let t = ExceptionTable::from_header(&h, sizes).unwrap();
        assert_eq!(t.count(), 2);

        let mut e = t.entry(0);
        assert_eq!((e.start_ofs(), e.end_ofs(), e.handler_ofs()), (10, 20, 30));
        assert_eq!(e.exc_class(), ObjectId(7));
        e.inc();
        assert_eq!((e.start_ofs(), e.end_ofs(), e.handler_ofs()), (12, 14, 32));
        assert_eq!(e.exc_class(), ObjectId(8));
    }

    #[test]
    fn wide_entries_stride_by_configured_size() {
        let sizes = TableSizes {
            exc_entry: 14,
            ..TableSizes::default()
        };
        let bytes = method(sizes, &[rec(1, 2, 3, 4), rec(5, 6, 7, 8)]);
        let h = MethodHeader::new(&bytes);
        let t = ExceptionTable::from_header(&h, sizes).unwrap();
        let e = t.entry(1);
        assert_eq!((e.start_ofs(), e.end_ofs(), e.handler_ofs()), (5, 6, 8));
        assert_eq!(t.entry(0).next().exc_class(), ObjectId(7));
    }

    #[test]
    fn find_handler_respects_order_and_class() {
        let sizes = TableSizes::default();
        // Inner range listed first takes precedence.
        let bytes = method(sizes, &[rec(12, 14, 8, 32), rec(10, 20, 7, 30)]);
        let h = MethodHeader::new(&bytes);
        let t = ExceptionTable::from_header(&h, sizes).unwrap();

        let any = |_: ObjectId| true;
        assert_eq!(t.find_handler(13, any).map(|e| e.handler_ofs()), Some(32));
        assert_eq!(t.find_handler(20, any).map(|e| e.handler_ofs()), Some(30));
        assert!(t.find_handler(21, any).is_none());
        assert!(t.find_handler(9, any).is_none());

        let only_7 = |c: ObjectId| c == ObjectId(7);
        assert_eq!(t.find_handler(13, only_7).map(|e| e.handler_ofs()), Some(30));
        assert!(t.find_handler(13, |_: ObjectId| false).is_none());
    }

    #[test]
    fn table_at_end_of_bytes_is_absent() {
        let bytes = [1, 0, 0, 0, 0, 0, 10, 0, 0, 0];
        assert!(ExceptionTable::from_header(&MethodHeader::new(&bytes), TableSizes::default()).is_none());
        let bytes = [1, 0, 0, 0, 0, 0, 10, 0, 0, 0, 0];
        assert!(ExceptionTable::from_header(&MethodHeader::new(&bytes), TableSizes::default()).is_none());
    }

    #[test]
    fn check_catches_truncated_entries() {
        let sizes = TableSizes::default();
        let bytes = method(sizes, &[rec(10, 20, 3, 30), rec(12, 14, 4, 31)]);
        let t = ExceptionTable::from_header(&MethodHeader::new(&bytes), sizes).unwrap();
        assert_eq!(t.check(), Ok(()));

        let cut = &bytes[..bytes.len() - 1];
        let t = ExceptionTable::from_header(&MethodHeader::new(cut), sizes).unwrap();
        assert_eq!(t.check(), Err(DecodeError::Truncated { needed: 22, got: 21 }));
    }
}
