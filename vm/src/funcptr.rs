//! Resolution of callable values to method headers.
//!
//! Byte-code functions, dynamic functions and intrinsics all end up as a
//! [`MethodHeader`]: intrinsics through the header-only record kept in their
//! descriptor, objects through their invoker.

use log::{trace, warn};
use t3_bytecode::{CodePool, DebugTable, ExceptionTable, MethodHeader, TableSizes};
use t3_object::{CodeAddr, DataType, Value};

use crate::bif::BifTable;
use crate::error::ResolveError;
use crate::objects::ObjectTable;

/// Everything a function pointer may consult while resolving.
#[derive(Clone, Copy)]
pub struct CallEnv<'a> {
    pub code_pool: &'a dyn CodePool,
    pub objects: &'a dyn ObjectTable,
    pub bifs: &'a BifTable,
    pub max_invoker_depth: usize,
}

impl<'a> CallEnv<'a> {
    /// Method header at a raw address, looked up in the code pool first and
    /// in dynamic-function objects second.
    pub fn header_at(&self, addr: CodeAddr) -> Option<MethodHeader<'a>> {
        let bytes = match self.code_pool.get_ofs(addr) {
            Some(ofs) => self.code_pool.get_ptr(ofs)?,
            None => self.objects.code_at(addr)?,
        };
        MethodHeader::checked(bytes).ok()
    }

    fn pool_header(&self, ofs: u32) -> Option<MethodHeader<'a>> {
        MethodHeader::checked(self.code_pool.get_ptr(ofs)?).ok()
    }
}

/// A resolved callable, or nothing.
///
/// Field accessors forward to the method header and return `None` while the
/// pointer is unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuncPtr<'a> {
    hdr: Option<MethodHeader<'a>>,
}

impl<'a> FuncPtr<'a> {
    pub const fn null() -> Self {
        Self { hdr: None }
    }

    pub const fn from_header(hdr: MethodHeader<'a>) -> Self {
        Self { hdr: Some(hdr) }
    }

    /// Points at the method `val` calls. On failure the pointer is cleared
    /// and `false` returned.
    pub fn set(&mut self, env: &CallEnv<'a>, val: Value) -> bool {
        self.hdr = Self::resolve(env, val).ok();
        self.hdr.is_some()
    }

    /// Resolves `val` to a method header.
    ///
    /// Objects are followed through their invokers for at most
    /// `env.max_invoker_depth` steps.
    pub fn resolve(env: &CallEnv<'a>, val: Value) -> Result<MethodHeader<'a>, ResolveError> {
        let mut val = val;
        for depth in 0..=env.max_invoker_depth {
            match val {
                Value::FuncPtr(ofs) | Value::CodeOfs(ofs) => {
                    trace!("resolve: code offset 0x{ofs:x}");
                    return env.pool_header(ofs).ok_or(ResolveError::UnknownCodeAddress);
                }
                Value::CodePtr(addr) => {
                    trace!("resolve: code pointer {addr:?}");
                    return env.header_at(addr).ok_or(ResolveError::UnknownCodeAddress);
                }
                Value::BifPtr { set_idx, func_idx } | Value::BifPtrX { set_idx, func_idx } => {
                    trace!("resolve: intrinsic {set_idx}.{func_idx}");
                    return env
                        .bifs
                        .get_desc(set_idx, func_idx)
                        .map(|d| d.header())
                        .ok_or(ResolveError::MissingIntrinsic { set_idx, func_idx });
                }
                Value::Obj(id) => match env.objects.get_invoker(id) {
                    Some(invoker) => {
                        trace!("resolve: object {id:?} invokes {invoker:?} (step {})", depth + 1);
                        val = invoker;
                    }
                    None => return Err(ResolveError::NotCallable(DataType::Object)),
                },
                other => return Err(ResolveError::NotCallable(other.datatype())),
            }
        }
        warn!("invoker chain longer than {} steps", env.max_invoker_depth);
        Err(ResolveError::InvokerDepthExceeded(env.max_invoker_depth))
    }

    #[inline]
    pub fn clear(&mut self) {
        self.hdr = None;
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.hdr.is_some()
    }

    #[inline]
    pub fn header(&self) -> Option<MethodHeader<'a>> {
        self.hdr
    }

    pub fn addr(&self) -> Option<CodeAddr> {
        self.hdr.map(|h| h.addr())
    }

    /// A callable value for the current method: a function pointer for code
    /// in the pool, the owning object for a dynamic function. `None` when
    /// unset or when the header belongs to neither, as intrinsic headers do.
    pub fn get_fnptr(&self, env: &CallEnv<'_>) -> Option<Value> {
        let addr = self.hdr?.addr();
        if let Some(ofs) = env.code_pool.get_ofs(addr) {
            return Some(Value::FuncPtr(ofs));
        }
        env.objects.dynfunc_from_prefix(addr).map(Value::Obj)
    }

    // ── header fields ──────────────────────────────────────────────

    pub fn min_argc(&self) -> Option<u8> {
        self.hdr.map(|h| h.min_argc())
    }

    pub fn opt_argc(&self) -> Option<u8> {
        self.hdr.map(|h| h.opt_argc())
    }

    pub fn max_argc(&self) -> Option<u16> {
        self.hdr.map(|h| h.max_argc())
    }

    pub fn is_varargs(&self) -> Option<bool> {
        self.hdr.map(|h| h.is_varargs())
    }

    pub fn locals(&self) -> Option<u16> {
        self.hdr.map(|h| h.locals())
    }

    pub fn stack_depth(&self) -> Option<u16> {
        self.hdr.map(|h| h.stack_depth())
    }

    pub fn exc_ofs(&self) -> Option<u16> {
        self.hdr.map(|h| h.exc_ofs())
    }

    pub fn dbg_ofs(&self) -> Option<u16> {
        self.hdr.map(|h| h.dbg_ofs())
    }

    /// `false` while unset.
    pub fn argc_ok(&self, actual: u32) -> bool {
        self.hdr.is_some_and(|h| h.argc_ok(actual))
    }

    pub fn set_exc_ptr(&self, sizes: TableSizes) -> Option<ExceptionTable<'a>> {
        ExceptionTable::from_header(&self.hdr?, sizes)
    }

    pub fn set_dbg_ptr(&self, sizes: TableSizes) -> Option<DebugTable<'a>> {
        DebugTable::from_header(&self.hdr?, sizes)
    }
}
