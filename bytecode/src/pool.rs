use t3_object::CodeAddr;

/// Byte store holding method headers and bytecode, addressed by offset.
pub trait CodePool {
    /// Bytes from `ofs` to the end of the page holding it.
    fn get_ptr(&self, ofs: u32) -> Option<&[u8]>;

    /// Offset of the byte at `addr`, if it lies inside the pool.
    fn get_ofs(&self, addr: CodeAddr) -> Option<u32>;
}

/// Byte store holding constant strings and lists, addressed by offset.
pub trait ConstantPool {
    fn get_ptr(&self, ofs: u32) -> Option<&[u8]>;
}

/// A pool split into fixed-size pages, logically contiguous.
///
/// Offset `ofs` lives in page `ofs / page_size`. The last page may be
/// shorter than `page_size`; no record spans a page boundary.
#[derive(Debug, Clone)]
pub struct PagedPool {
    pages: Vec<Box<[u8]>>,
    page_size: u32,
}

impl PagedPool {
    pub fn new(page_size: u32) -> Self {
        Self {
            pages: Vec::new(),
            page_size,
        }
    }

    /// Splits `bytes` into consecutive pages.
    pub fn from_bytes(bytes: &[u8], page_size: u32) -> Self {
        let mut pool = Self::new(page_size);
        for chunk in bytes.chunks(page_size.max(1) as usize) {
            pool.add_page(chunk);
        }
        pool
    }

    /// Builds a pool from pages as an image lays them out. Page `i` starts
    /// at offset `i * page_size`; shorter pages leave a gap up to the next.
    pub fn from_pages<P: Into<Box<[u8]>>>(pages: impl IntoIterator<Item = P>, page_size: u32) -> Self {
        let mut pool = Self::new(page_size);
        for page in pages {
            pool.add_page(page);
        }
        pool
    }

    /// Appends a page and returns the offset of its first byte.
    ///
    /// Pages longer than `page_size` are truncated.
    pub fn add_page(&mut self, page: impl Into<Box<[u8]>>) -> u32 {
        let mut page: Box<[u8]> = page.into();
        if page.len() > self.page_size as usize {
            page = page[..self.page_size as usize].into();
        }
        let ofs = self.pages.len() as u32 * self.page_size;
        self.pages.push(page);
        ofs
    }

    #[inline(always)]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    #[inline(always)]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn lookup(&self, ofs: u32) -> Option<&[u8]> {
        if self.page_size == 0 {
            return None;
        }
        let page = self.pages.get((ofs / self.page_size) as usize)?;
        page.get((ofs % self.page_size) as usize..)
            .filter(|rest| !rest.is_empty())
    }
}

impl CodePool for PagedPool {
    fn get_ptr(&self, ofs: u32) -> Option<&[u8]> {
        self.lookup(ofs)
    }

    fn get_ofs(&self, addr: CodeAddr) -> Option<u32> {
        self.pages.iter().enumerate().find_map(|(i, page)| {
            addr.offset_in(page)
                .map(|within| i as u32 * self.page_size + within as u32)
        })
    }
}

impl ConstantPool for PagedPool {
    fn get_ptr(&self, ofs: u32) -> Option<&[u8]> {
        self.lookup(ofs)
    }
}
