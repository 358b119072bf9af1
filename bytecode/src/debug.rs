//! Debug records attached to a method.
//!
//! ```text
//! header           dbg_header bytes
//! u16              line count L
//! line[L]          line_entry bytes each
//! u16              post-line word
//! u16              frame count F
//! u16[F]           frame index words, each relative to its own position
//! frame[F]         dbg_frame bytes, then that frame's symbols
//! ```
//!
//! Frames are numbered from 1; frame id 0 means "no enclosing frame".

use log::warn;
use t3_object::{PropId, StringFactory, Value};

use crate::error::DecodeError;
use crate::header::MethodHeader;
use crate::pool::ConstantPool;
use crate::reader::{read_counted, read_u16, read_u32};
use crate::sizes::{LCLSYM_HEADER_MIN_SIZE, LEGACY_FRAME_SIZE, LINE_ENTRY_MIN_SIZE, TableSizes};

#[derive(Debug, Clone, Copy)]
pub struct DebugTable<'a> {
    bytes: &'a [u8],
    sizes: TableSizes,
}

impl<'a> DebugTable<'a> {
    /// The debug table of `hdr`, or `None` when the method has none.
    pub fn from_header(hdr: &MethodHeader<'a>, sizes: TableSizes) -> Option<Self> {
        let bytes = hdr.sub_table(hdr.dbg_ofs())?;
        Some(Self { bytes, sizes })
    }

    #[inline(always)]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[inline(always)]
    pub fn sizes(&self) -> TableSizes {
        self.sizes
    }

    /// Walks the table's structure and confirms every line, frame and
    /// symbol record lies inside the table bytes. Loaders run this before
    /// handing untrusted bytes to the accessors.
    pub fn check(&self) -> Result<(), DecodeError> {
        let got = self.bytes.len();
        let fits = |needed: usize| {
            if needed <= got {
                Ok(())
            } else {
                Err(DecodeError::Truncated { needed, got })
            }
        };
        let sizes = self.sizes;

        let lines_ofs = sizes.dbg_header as usize;
        fits(lines_ofs + 2)?;
        let line_entry = (sizes.line_entry as usize).max(LINE_ENTRY_MIN_SIZE as usize);
        fits(lines_ofs + 2 + self.line_count() as usize * line_entry)?;

        let frames_ofs = self.frame_table_ofs();
        fits(frames_ofs + 2)?;
        let frame_count = self.frame_count() as usize;
        fits(frames_ofs + 2 + 2 * frame_count)?;

        let frame_size = (sizes.dbg_frame as usize).max(LEGACY_FRAME_SIZE as usize);
        let sym_header = (sizes.lclsym_header as usize).max(LCLSYM_HEADER_MIN_SIZE as usize);
        for i in 0..frame_count {
            let index_ofs = frames_ofs + 2 + 2 * i;
            let frame_ofs = index_ofs + read_u16(self.bytes, index_ofs) as usize;
            fits(frame_ofs + frame_size)?;

            let mut at = frame_ofs + sizes.dbg_frame as usize;
            for _ in 0..read_u16(self.bytes, frame_ofs + 2) {
                fits(at + sym_header)?;
                let name_at = at + sizes.lclsym_header as usize;
                if read_u16(self.bytes, at + 2) & SYM_POOL_NAME == 0 {
                    fits(name_at + 2)?;
                    at = name_at + 2 + read_u16(self.bytes, name_at) as usize;
                } else {
                    at = name_at + 4;
                }
                fits(at)?;
            }
        }
        Ok(())
    }

    // ── lines ──────────────────────────────────────────────────────

    #[inline(always)]
    pub fn line_count(&self) -> u16 {
        read_u16(self.bytes, self.sizes.dbg_header as usize)
    }

    pub fn line(&self, idx: u16) -> DebugLine<'a> {
        let at = self.sizes.dbg_header as usize + 2 + idx as usize * self.sizes.line_entry as usize;
        DebugLine {
            bytes: &self.bytes[at..],
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = DebugLine<'a>> + '_ {
        (0..self.line_count()).map(|i| self.line(i))
    }

    /// The line record covering `pc_ofs`: the last record starting at or
    /// before it. Line records are sorted by `start_ofs`.
    pub fn line_for_pc(&self, pc_ofs: u16) -> Option<DebugLine<'a>> {
        let (mut lo, mut hi) = (0u16, self.line_count());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.line(mid).start_ofs() <= pc_ofs {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        match lo {
            0 => None,
            n => Some(self.line(n - 1)),
        }
    }

    // ── frames ─────────────────────────────────────────────────────

    /// Offset of the frame count word.
    fn frame_table_ofs(&self) -> usize {
        self.sizes.dbg_header as usize
            + 2
            + self.line_count() as usize * self.sizes.line_entry as usize
            + 2
    }

    #[inline]
    pub fn frame_count(&self) -> u16 {
        read_u16(self.bytes, self.frame_table_ofs())
    }

    /// Frame record for the 1-based `id`.
    pub fn frame(&self, id: u16) -> Option<DebugFrame<'a>> {
        if id == 0 || id > self.frame_count() {
            return None;
        }
        let index_ofs = self.frame_table_ofs() + 2 + 2 * (id as usize - 1);
        let frame_ofs = index_ofs + read_u16(self.bytes, index_ofs) as usize;
        Some(DebugFrame {
            bytes: self.bytes.get(frame_ofs..)?,
            id,
            sizes: self.sizes,
        })
    }

    pub fn frames(&self) -> impl Iterator<Item = DebugFrame<'a>> + '_ {
        (1..=self.frame_count()).filter_map(|id| self.frame(id))
    }

    /// Innermost frame active at `pc_ofs`.
    ///
    /// With ranged frame records every frame whose range contains `pc_ofs`
    /// is considered and the most deeply nested one wins. Legacy records
    /// carry no range, so the frame named by the covering line record is
    /// used instead.
    pub fn frame_of_pc(&self, pc_ofs: u16) -> Option<u16> {
        if !self.sizes.frames_have_range() {
            return self
                .line_for_pc(pc_ofs)
                .map(|l| l.frame_id())
                .filter(|&id| id != 0);
        }

        let mut best: Option<u16> = None;
        for frame in self.frames() {
            if !frame.covers(pc_ofs) {
                continue;
            }
            match best {
                Some(b) if !frame.is_nested_in(self, b) => {}
                _ => best = Some(frame.id()),
            }
        }
        best
    }
}

/// One line record: a bytecode offset mapped to a source position.
#[derive(Debug, Clone, Copy)]
pub struct DebugLine<'a> {
    bytes: &'a [u8],
}

impl DebugLine<'_> {
    #[inline(always)]
    pub fn start_ofs(&self) -> u16 {
        read_u16(self.bytes, 0)
    }

    #[inline(always)]
    pub fn source_id(&self) -> u16 {
        read_u16(self.bytes, 2)
    }

    #[inline(always)]
    pub fn source_line(&self) -> u32 {
        read_u32(self.bytes, 4)
    }

    #[inline(always)]
    pub fn frame_id(&self) -> u16 {
        read_u16(self.bytes, 8)
    }
}

/// One lexical scope: its symbols and, in ranged tables, its bytecode range.
#[derive(Debug, Clone, Copy)]
pub struct DebugFrame<'a> {
    bytes: &'a [u8],
    id: u16,
    sizes: TableSizes,
}

impl<'a> DebugFrame<'a> {
    #[inline(always)]
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Id of the enclosing frame, 0 for an outermost frame.
    #[inline(always)]
    pub fn enclosing(&self) -> u16 {
        read_u16(self.bytes, 0)
    }

    #[inline(always)]
    pub fn sym_count(&self) -> u16 {
        read_u16(self.bytes, 2)
    }

    /// Zero in legacy tables.
    #[inline]
    pub fn start_ofs(&self) -> u16 {
        if self.sizes.frames_have_range() { read_u16(self.bytes, 4) } else { 0 }
    }

    /// Zero in legacy tables.
    #[inline]
    pub fn end_ofs(&self) -> u16 {
        if self.sizes.frames_have_range() { read_u16(self.bytes, 6) } else { 0 }
    }

    #[inline]
    pub fn covers(&self, pc_ofs: u16) -> bool {
        self.start_ofs() <= pc_ofs && pc_ofs <= self.end_ofs()
    }

    pub fn first_sym(&self) -> DebugSymbol<'a> {
        DebugSymbol {
            bytes: &self.bytes[self.sizes.dbg_frame as usize..],
            hdr_size: self.sizes.lclsym_header as usize,
        }
    }

    pub fn symbols(&self) -> Symbols<'a> {
        Symbols {
            next: self.first_sym(),
            remaining: self.sym_count(),
        }
    }

    /// Whether `other` is on this frame's chain of enclosing frames.
    ///
    /// The walk is bounded by the table's frame count, so a malformed table
    /// with a cycle answers `false` instead of looping.
    pub fn is_nested_in(&self, table: &DebugTable<'_>, other: u16) -> bool {
        let mut cur = self.enclosing();
        for _ in 0..table.frame_count() {
            if cur == 0 {
                return false;
            }
            if cur == other {
                return true;
            }
            cur = match table.frame(cur) {
                Some(f) => f.enclosing(),
                None => return false,
            };
        }
        warn!("frame {} has a cyclic enclosing chain", self.id);
        false
    }
}

/// Iterator over the symbols of one frame.
pub struct Symbols<'a> {
    next: DebugSymbol<'a>,
    remaining: u16,
}

impl<'a> Iterator for Symbols<'a> {
    type Item = DebugSymbol<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let cur = self.next;
        if self.remaining > 0 {
            self.next.inc();
        }
        Some(cur)
    }
}

// ── symbols ────────────────────────────────────────────────────────

const SYM_PARAM: u16 = 0x0001;
const SYM_CTX_LOCAL: u16 = 0x0002;
const SYM_POOL_NAME: u16 = 0x0004;

/// One local or parameter symbol.
///
/// ```text
/// 0  u16  var_num
/// 2  u16  flags        bit 0 param, bit 1 context local, bit 2 pool name
/// 4  u16  ctx_arr_idx
/// .. (lclsym_header)   name: u16 length + UTF-8 bytes, or u32 pool offset
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DebugSymbol<'a> {
    bytes: &'a [u8],
    hdr_size: usize,
}

impl<'a> DebugSymbol<'a> {
    #[inline(always)]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[inline(always)]
    pub fn var_num(&self) -> u16 {
        read_u16(self.bytes, 0)
    }

    #[inline(always)]
    pub fn flags(&self) -> u16 {
        read_u16(self.bytes, 2)
    }

    /// Anything that is not a param, context locals included.
    #[inline(always)]
    pub fn is_local(&self) -> bool {
        !self.is_param()
    }

    /// Context locals reuse the param bit, so they never count as params.
    #[inline(always)]
    pub fn is_param(&self) -> bool {
        self.flags() & SYM_PARAM != 0 && !self.is_ctx_local()
    }

    #[inline(always)]
    pub fn is_ctx_local(&self) -> bool {
        self.flags() & SYM_CTX_LOCAL != 0
    }

    #[inline(always)]
    pub fn is_sym_inline(&self) -> bool {
        self.flags() & SYM_POOL_NAME == 0
    }

    #[inline(always)]
    pub fn ctx_arr_idx(&self) -> PropId {
        PropId(read_u16(self.bytes, 4))
    }

    /// Constant pool offset of the name, for pool-named symbols.
    pub fn pool_ofs(&self) -> Option<u32> {
        if self.is_sym_inline() {
            None
        } else {
            Some(read_u32(self.bytes, self.hdr_size))
        }
    }

    /// Raw UTF-8 name bytes.
    pub fn sym_bytes<'p>(&self, consts: &'p dyn ConstantPool) -> Option<&'p [u8]>
    where
        'a: 'p,
    {
        match self.pool_ofs() {
            None => read_counted(self.bytes, self.hdr_size),
            Some(ofs) => read_counted(consts.get_ptr(ofs)?, 0),
        }
    }

    pub fn sym_name<'p>(&self, consts: &'p dyn ConstantPool) -> Option<&'p str>
    where
        'a: 'p,
    {
        core::str::from_utf8(self.sym_bytes(consts)?).ok()
    }

    /// The name as a runtime string value.
    ///
    /// An inline name is copied into a new string object. A pool name is
    /// returned as a reference to the constant string, without copying.
    pub fn str_val(&self, strings: &mut dyn StringFactory) -> Option<Value> {
        match self.pool_ofs() {
            None => {
                let name = read_counted(self.bytes, self.hdr_size)?;
                Some(Value::Obj(strings.create_string(name)))
            }
            Some(ofs) => Some(Value::SString(ofs)),
        }
    }

    /// Encoded length of this symbol record.
    pub fn stride(&self) -> usize {
        let name = if self.is_sym_inline() {
            2 + read_u16(self.bytes, self.hdr_size) as usize
        } else {
            4
        };
        self.hdr_size + name
    }

    /// The symbol stored after this one. Not bounded by the frame's count.
    pub fn next(&self) -> DebugSymbol<'a> {
        DebugSymbol {
            bytes: &self.bytes[self.stride()..],
            hdr_size: self.hdr_size,
        }
    }

    #[inline]
    pub fn inc(&mut self) {
        *self = self.next();
    }
}
