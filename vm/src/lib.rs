pub mod bif;
pub mod config;
mod error;
mod funcptr;
pub mod objects;
mod stack;

use log::{debug, info};
use t3_bytecode::{DecodeError, MethodHeader, PagedPool, TableSizes};
use t3_object::Value;

pub use bif::{BifContext, BifDesc, BifFn, BifTable, FunctionSet, FunctionSetCatalog, Lookup};
pub use config::{DEFAULT_MAX_INVOKER_DEPTH, LinkMode, VMCreateInfo};
pub use error::{ResolveError, VmError};
pub use funcptr::{CallEnv, FuncPtr};
pub use objects::{Object, ObjectStore, ObjectTable};
pub use stack::ValueStack;

/// One loaded program: its pools, objects, intrinsic links and operand stack.
pub struct VM {
    pub info: VMCreateInfo,
    pub code_pool: PagedPool,
    pub const_pool: PagedPool,
    pub objects: ObjectStore,
    pub bifs: BifTable,
    pub stack: ValueStack,
}

impl VM {
    pub fn new(info: VMCreateInfo) -> Self {
        Self::with_catalog(info, FunctionSetCatalog::with_defaults())
    }

    pub fn with_catalog(info: VMCreateInfo, catalog: FunctionSetCatalog) -> Self {
        let bifs = BifTable::new(catalog, info.link_mode, info.bif_capacity);
        Self {
            code_pool: PagedPool::new(info.code_page_size),
            const_pool: PagedPool::new(info.code_page_size),
            objects: ObjectStore::new(),
            bifs,
            stack: ValueStack::new(),
            info,
        }
    }

    #[inline(always)]
    pub fn sizes(&self) -> TableSizes {
        self.info.sizes
    }

    /// Adopts the record sizes declared by an entrypoint record and returns
    /// the entry function's code offset.
    pub fn load_entrypoint(&mut self, record: &[u8]) -> Result<u32, DecodeError> {
        let ep = TableSizes::from_entrypoint(record)?;
        debug!("entrypoint at 0x{:x}, sizes {:?}", ep.entry_ofs, ep.sizes);
        self.info.sizes = ep.sizes;
        Ok(ep.entry_ofs)
    }

    /// Replaces the code pool with `bytes`, cut into pages of the configured
    /// size. Every method must lie inside one page; use
    /// [`load_code_pages`](Self::load_code_pages) when the image declares
    /// its own page layout.
    pub fn load_code(&mut self, bytes: &[u8]) {
        self.code_pool = PagedPool::from_bytes(bytes, self.info.code_page_size);
        info!("loaded {} bytes of code in {} pages", bytes.len(), self.code_pool.page_count());
    }

    /// Replaces the code pool with pages exactly as the image stores them.
    pub fn load_code_pages<P: Into<Box<[u8]>>>(&mut self, pages: impl IntoIterator<Item = P>) {
        self.code_pool = PagedPool::from_pages(pages, self.info.code_page_size);
        info!("loaded {} code pages", self.code_pool.page_count());
    }

    pub fn load_constants(&mut self, bytes: &[u8]) {
        self.const_pool = PagedPool::from_bytes(bytes, self.info.code_page_size);
    }

    /// Links the function sets an image declares, in declaration order.
    pub fn link<S: AsRef<str>>(&mut self, set_ids: &[S]) -> Result<(), VmError> {
        for id in set_ids {
            self.bifs.add_entry(id.as_ref())?;
        }
        Ok(())
    }

    /// Drops everything the current image brought in.
    pub fn unload(&mut self) {
        self.bifs.clear();
        self.code_pool = PagedPool::new(self.info.code_page_size);
        self.const_pool = PagedPool::new(self.info.code_page_size);
        self.stack.clear();
    }

    pub fn env(&self) -> CallEnv<'_> {
        CallEnv {
            code_pool: &self.code_pool,
            objects: &self.objects,
            bifs: &self.bifs,
            max_invoker_depth: self.info.max_invoker_depth,
        }
    }

    /// Method header of whatever `val` calls.
    pub fn resolve(&self, val: Value) -> Result<MethodHeader<'_>, ResolveError> {
        FuncPtr::resolve(&self.env(), val)
    }

    /// Calls an intrinsic with `args`, argument 0 first.
    ///
    /// The stack is restored to its prior depth whether or not the call
    /// succeeds.
    pub fn call_bif(&mut self, set_idx: u16, func_idx: u16, args: &[Value]) -> Result<Value, VmError> {
        let base = self.stack.depth();
        self.stack.push_args(args);

        let mut ctx = BifContext::new(&mut self.stack, &mut self.objects);
        ctx.preinit = self.info.preinit;
        let res = self
            .bifs
            .call_func(&mut ctx, set_idx, func_idx, args.len() as u32)
            .map(|_| ctx.r0);

        let extra = self.stack.depth().saturating_sub(base);
        self.stack.discard(extra);
        res
    }
}

impl Default for VM {
    fn default() -> Self {
        Self::new(VMCreateInfo::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use t3_bytecode::{ExceptionRecord, MethodBuilder};
    use t3_object::{CodeAddr, ObjectId};

    fn method(sizes: TableSizes) -> Vec<u8> {
        let mut b = MethodBuilder::new(sizes);
        b.argc(1, 0, false).locals(2).code(&[0; 8]);
        b.exception(ExceptionRecord {
            start_ofs: 10,
            end_ofs: 18,
            exc_class: ObjectId(5),
            handler_ofs: 14,
        });
        b.finish()
    }

    #[test]
    fn code_pool_roundtrip_through_resolve() {
        let mut vm = VM::default();
        let mut image = vec![0u8; 32];
        image.extend(method(vm.sizes()));
        vm.load_code(&image);

        let h = vm.resolve(Value::FuncPtr(32)).unwrap();
        assert_eq!((h.min_argc(), h.locals()), (1, 2));

        let p = FuncPtr::from_header(h);
        assert_eq!(p.get_fnptr(&vm.env()), Some(Value::FuncPtr(32)));
        let xt = p.set_exc_ptr(vm.sizes()).unwrap();
        assert_eq!(xt.count(), 1);
        assert_eq!(xt.entry(0).handler_ofs(), 14);
    }

    #[test]
    fn dynamic_function_through_invoker() {
        let mut vm = VM::default();
        let func = vm.objects.new_dynamic_func(&method(vm.sizes()));
        let addr = CodeAddr::of(vm.objects.dynamic_func_code(func).unwrap());
        let inner = vm.objects.new_invokable(Value::CodePtr(addr));
        let wrapper = vm.objects.new_invokable(Value::Obj(inner));

        let h = vm.resolve(Value::Obj(wrapper)).unwrap();
        assert_eq!(h.min_argc(), 1);
        let p = FuncPtr::from_header(h);
        assert_eq!(p.get_fnptr(&vm.env()), Some(Value::Obj(func)));
    }

    #[test]
    fn call_bif_restores_stack() {
        let mut vm = VM::default();
        vm.link(&["t3vm/010006", "tads-gen/030008"]).unwrap();

        assert_eq!(vm.call_bif(1, 18, &[Value::Int(2), Value::Int(8)]), Ok(Value::Int(8)));
        assert!(vm.stack.is_empty());

        assert_eq!(
            vm.call_bif(1, 19, &[Value::Int(2), Value::Nil]),
            Err(VmError::InvalidComparison)
        );
        assert!(vm.stack.is_empty());
    }

    #[test]
    fn preinit_mode_follows_create_info() {
        let mut vm = VM::new(VMCreateInfo { preinit: true, ..VMCreateInfo::default() });
        vm.link(&["t3vm"]).unwrap();
        assert_eq!(vm.call_bif(0, 5, &[]), Ok(Value::Int(1)));
    }

    #[test]
    fn entrypoint_sets_sizes() {
        let mut vm = VM::default();
        let mut rec = 0x40u32.to_le_bytes().to_vec();
        for s in [12u16, 12, 12, 4, 8, 2, 8] {
            rec.extend_from_slice(&s.to_le_bytes());
        }
        assert_eq!(vm.load_entrypoint(&rec), Ok(0x40));
        assert_eq!(vm.sizes().exc_entry, 12);
        assert_eq!(vm.sizes().dbg_header, 4);
        assert!(vm.load_entrypoint(&rec[..10]).is_err());
    }

    #[test]
    fn unload_forgets_links() {
        let mut vm = VM::default();
        vm.link(&["t3vm/010006"]).unwrap();
        vm.load_code(&[1, 2, 3]);
        vm.unload();
        assert_eq!(vm.bifs.count(), 0);
        assert_eq!(vm.code_pool.page_count(), 0);
        assert!(matches!(vm.call_bif(0, 2, &[]), Err(VmError::UnknownFuncSet { .. })));
    }
}
