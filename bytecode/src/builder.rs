use t3_object::ObjectId;

use crate::header::METHOD_HEADER_MIN_SIZE;
use crate::sizes::TableSizes;

/// Exception table row, offsets relative to the method header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionRecord {
    pub start_ofs: u16,
    pub end_ofs: u16,
    pub exc_class: ObjectId,
    pub handler_ofs: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRecord {
    pub start_ofs: u16,
    pub source_id: u16,
    pub source_line: u32,
    pub frame_id: u16,
}

/// Frame record. The range is dropped when the frame size has no room for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRecord {
    pub enclosing: u16,
    pub start_ofs: u16,
    pub end_ofs: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolName {
    Inline(String),
    /// Constant pool offset of a counted string.
    Pool(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRecord {
    pub var_num: u16,
    pub param: bool,
    pub ctx_local: bool,
    pub ctx_arr_idx: u16,
    pub name: SymbolName,
}

/// Assembles one method image.
///
/// ```text
/// method header   (padded to the configured header size)
/// code bytes
/// exception table (if any rows were added)
/// debug table     (if any lines or frames were added)
/// ```
///
/// Every record is padded with zeros to the size configured in
/// [`TableSizes`], so the output reads back through the views under the
/// same sizes.
pub struct MethodBuilder {
    sizes: TableSizes,
    argc: u8,
    opt_argc: u8,
    locals: u16,
    stack_depth: u16,
    code: Vec<u8>,
    exceptions: Vec<ExceptionRecord>,
    lines: Vec<LineRecord>,
    frames: Vec<(FrameRecord, Vec<SymbolRecord>)>,
}

impl MethodBuilder {
    pub fn new(sizes: TableSizes) -> Self {
        Self {
            sizes,
            argc: 0,
            opt_argc: 0,
            locals: 0,
            stack_depth: 0,
            code: Vec::new(),
            exceptions: Vec::new(),
            lines: Vec::new(),
            frames: Vec::new(),
        }
    }

    pub fn argc(&mut self, min_argc: u8, opt_argc: u8, varargs: bool) -> &mut Self {
        self.argc = (min_argc & 0x7f) | if varargs { 0x80 } else { 0 };
        self.opt_argc = opt_argc;
        self
    }

    pub fn locals(&mut self, locals: u16) -> &mut Self {
        self.locals = locals;
        self
    }

    pub fn stack_depth(&mut self, depth: u16) -> &mut Self {
        self.stack_depth = depth;
        self
    }

    /// Appends code bytes.
    pub fn code(&mut self, bytes: &[u8]) -> &mut Self {
        self.code.extend_from_slice(bytes);
        self
    }

    /// Offset from the header start of the next code byte.
    pub fn current_offset(&self) -> usize {
        self.header_len() + self.code.len()
    }

    pub fn exception(&mut self, rec: ExceptionRecord) -> &mut Self {
        self.exceptions.push(rec);
        self
    }

    /// Line records must be added in `start_ofs` order.
    pub fn line(&mut self, rec: LineRecord) -> &mut Self {
        self.lines.push(rec);
        self
    }

    /// Adds a frame and returns its 1-based id.
    pub fn frame(&mut self, rec: FrameRecord, symbols: Vec<SymbolRecord>) -> u16 {
        self.frames.push((rec, symbols));
        self.frames.len() as u16
    }

    fn header_len(&self) -> usize {
        (self.sizes.method_header as usize).max(METHOD_HEADER_MIN_SIZE)
    }

    // ── emit helpers ───────────────────────────────────────────────

    fn emit_u16(buf: &mut Vec<u8>, v: u16) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    fn emit_u32(buf: &mut Vec<u8>, v: u32) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Zero-fills `buf` so the record begun at `start` is `size` bytes long.
    fn pad_to(buf: &mut Vec<u8>, start: usize, size: u16) {
        let end = start + size as usize;
        if buf.len() < end {
            buf.resize(end, 0);
        }
    }

    fn patch_u16(buf: &mut [u8], at: usize, v: u16) {
        buf[at..at + 2].copy_from_slice(&v.to_le_bytes());
    }

    pub fn finish(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.header_len() + self.code.len());
        buf.push(self.argc);
        buf.push(self.opt_argc);
        Self::emit_u16(&mut buf, self.locals);
        Self::emit_u16(&mut buf, self.stack_depth);
        Self::emit_u16(&mut buf, 0);
        Self::emit_u16(&mut buf, 0);
        buf.resize(self.header_len(), 0);
        buf.extend_from_slice(&self.code);

        if !self.exceptions.is_empty() {
            let exc_ofs = buf.len() as u16;
            Self::patch_u16(&mut buf, 6, exc_ofs);
            self.emit_exceptions(&mut buf);
        }

        if !self.lines.is_empty() || !self.frames.is_empty() {
            let dbg_ofs = buf.len() as u16;
            Self::patch_u16(&mut buf, 8, dbg_ofs);
            self.emit_debug(&mut buf);
        }

        buf
    }

    fn emit_exceptions(&self, buf: &mut Vec<u8>) {
        Self::emit_u16(buf, self.exceptions.len() as u16);
        for e in &self.exceptions {
            let start = buf.len();
            Self::emit_u16(buf, e.start_ofs);
            Self::emit_u16(buf, e.end_ofs);
            Self::emit_u32(buf, e.exc_class.0);
            Self::emit_u16(buf, e.handler_ofs);
            Self::pad_to(buf, start, self.sizes.exc_entry);
        }
    }

    fn emit_debug(&self, buf: &mut Vec<u8>) {
        let table = buf.len();
        buf.resize(table + self.sizes.dbg_header as usize, 0);

        Self::emit_u16(buf, self.lines.len() as u16);
        for l in &self.lines {
            let start = buf.len();
            Self::emit_u16(buf, l.start_ofs);
            Self::emit_u16(buf, l.source_id);
            Self::emit_u32(buf, l.source_line);
            Self::emit_u16(buf, l.frame_id);
            Self::pad_to(buf, start, self.sizes.line_entry);
        }

        // post-line word
        Self::emit_u16(buf, 0);

        Self::emit_u16(buf, self.frames.len() as u16);
        let index = buf.len();
        buf.resize(index + 2 * self.frames.len(), 0);

        for (i, (frame, symbols)) in self.frames.iter().enumerate() {
            let slot = index + 2 * i;
            let rel = (buf.len() - slot) as u16;
            Self::patch_u16(buf, slot, rel);

            let start = buf.len();
            Self::emit_u16(buf, frame.enclosing);
            Self::emit_u16(buf, symbols.len() as u16);
            if self.sizes.frames_have_range() {
                Self::emit_u16(buf, frame.start_ofs);
                Self::emit_u16(buf, frame.end_ofs);
            }
            Self::pad_to(buf, start, self.sizes.dbg_frame);

            for sym in symbols {
                self.emit_symbol(buf, sym);
            }
        }
    }

    fn emit_symbol(&self, buf: &mut Vec<u8>, sym: &SymbolRecord) {
        let mut flags = 0u16;
        if sym.param {
            flags |= 0x0001;
        }
        if sym.ctx_local {
            flags |= 0x0002;
        }
        if matches!(sym.name, SymbolName::Pool(_)) {
            flags |= 0x0004;
        }

        let start = buf.len();
        Self::emit_u16(buf, sym.var_num);
        Self::emit_u16(buf, flags);
        Self::emit_u16(buf, sym.ctx_arr_idx);
        Self::pad_to(buf, start, self.sizes.lclsym_header);

        match &sym.name {
            SymbolName::Inline(name) => {
                Self::emit_u16(buf, name.len() as u16);
                buf.extend_from_slice(name.as_bytes());
            }
            SymbolName::Pool(ofs) => Self::emit_u32(buf, *ofs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_only() {
        let mut b = MethodBuilder::new(TableSizes::default());
        b.argc(3, 1, false).locals(2).stack_depth(5);
        assert_eq!(b.finish(), vec![0x03, 0x01, 0x02, 0x00, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn varargs_sets_high_bit() {
        let mut b = MethodBuilder::new(TableSizes::default());
        b.argc(2, 0, true);
        assert_eq!(b.finish()[0], 0x82);
    }

    #[test]
    fn wide_header_is_padded() {
        let sizes = TableSizes {
            method_header: 12,
            ..TableSizes::default()
        };
        let mut b = MethodBuilder::new(sizes);
        assert_eq!(b.current_offset(), 12);
        b.code(&[0xaa]);
        assert_eq!(b.current_offset(), 13);
        let bytes = b.finish();
        assert_eq!(bytes.len(), 13);
        assert_eq!(bytes[12], 0xaa);
    }

    #[test]
    fn exception_table_follows_code() {
        let mut b = MethodBuilder::new(TableSizes::default());
        b.code(&[0; 6]);
        b.exception(ExceptionRecord {
            start_ofs: 10,
            end_ofs: 12,
            exc_class: ObjectId(0x0102_0304),
            handler_ofs: 14,
        });
        let bytes = b.finish();
        assert_eq!(&bytes[6..8], &16u16.to_le_bytes());
        assert_eq!(&bytes[8..10], &[0, 0]);
        assert_eq!(&bytes[16..], &[1, 0, 10, 0, 12, 0, 4, 3, 2, 1, 14, 0]);
    }

    #[test]
    fn frame_index_words_are_self_relative() {
        let mut b = MethodBuilder::new(TableSizes::default());
        b.frame(FrameRecord { enclosing: 0, start_ofs: 0, end_ofs: 0 }, vec![]);
        b.frame(FrameRecord { enclosing: 1, start_ofs: 0, end_ofs: 0 }, vec![]);
        let bytes = b.finish();
        // header | line count | post-line | frame count | idx[2] | frame[2]
        let index = 10 + 2 + 2 + 2;
        assert_eq!(&bytes[index..index + 2], &4u16.to_le_bytes());
        assert_eq!(&bytes[index + 2..index + 4], &10u16.to_le_bytes());
        assert_eq!(bytes.len(), index + 4 + 16);
    }
}
