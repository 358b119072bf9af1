use t3_bytecode::TableSizes;

/// What to do when an image declares a function set this VM lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkMode {
    /// Keep loading; calls into the set raise `UnknownFuncSet`.
    #[default]
    Late,
    /// Fail the load.
    Strict,
}

#[derive(Debug, Clone)]
pub struct VMCreateInfo {
    pub sizes: TableSizes,
    pub link_mode: LinkMode,
    /// Function set slots reserved up front.
    pub bif_capacity: usize,
    /// Longest object-to-invoker chain a function pointer will follow.
    pub max_invoker_depth: usize,
    pub code_page_size: u32,
    pub preinit: bool,
}

pub const DEFAULT_MAX_INVOKER_DEPTH: usize = 16;

impl Default for VMCreateInfo {
    fn default() -> Self {
        Self {
            sizes: TableSizes::default(),
            link_mode: LinkMode::Late,
            bif_capacity: 8,
            max_invoker_depth: DEFAULT_MAX_INVOKER_DEPTH,
            code_page_size: 4096,
            preinit: false,
        }
    }
}
