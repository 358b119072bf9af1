//! `t3vm` function set: VM introspection.

use super::{BifContext, BifDesc, FunctionSet};
use crate::error::VmError;

pub const SET_ID: &str = "t3vm/010006";

pub const VM_ID: &str = env!("CARGO_PKG_NAME");
pub const VM_BANNER: &str = concat!("T3 VM ", env!("CARGO_PKG_VERSION"));

/// Version packed as `0x00MMmmpp`.
pub fn vm_version() -> i32 {
    let part = |s: &str| s.parse::<i32>().unwrap_or(0) & 0xff;
    (part(env!("CARGO_PKG_VERSION_MAJOR")) << 16)
        | (part(env!("CARGO_PKG_VERSION_MINOR")) << 8)
        | part(env!("CARGO_PKG_VERSION_PATCH"))
}

pub fn function_set() -> FunctionSet {
    FunctionSet::new(SET_ID, vec![
        BifDesc::unavailable("run_gc", 0, 0, false),
        BifDesc::unavailable("set_say", 1, 0, false),
        BifDesc::new("get_vm_vsn", 0, 0, false, get_vm_vsn),
        BifDesc::new("get_vm_id", 0, 0, false, get_vm_id),
        BifDesc::new("get_vm_banner", 0, 0, false, get_vm_banner),
        BifDesc::new("get_vm_preinit_mode", 0, 0, false, get_vm_preinit_mode),
        BifDesc::unavailable("debug_trace", 1, 0, true),
        BifDesc::unavailable("get_global_symtab", 0, 1, false),
        BifDesc::unavailable("alloc_new_prop", 0, 0, false),
    ])
}

fn get_vm_vsn(ctx: &mut BifContext<'_>, argc: u32) -> Result<(), VmError> {
    ctx.check_argc(argc, 0)?;
    ctx.retval_int(vm_version());
    Ok(())
}

fn get_vm_id(ctx: &mut BifContext<'_>, argc: u32) -> Result<(), VmError> {
    ctx.check_argc(argc, 0)?;
    ctx.retval_str(VM_ID);
    Ok(())
}

fn get_vm_banner(ctx: &mut BifContext<'_>, argc: u32) -> Result<(), VmError> {
    ctx.check_argc(argc, 0)?;
    ctx.retval_str(VM_BANNER);
    Ok(())
}

fn get_vm_preinit_mode(ctx: &mut BifContext<'_>, argc: u32) -> Result<(), VmError> {
    ctx.check_argc(argc, 0)?;
    let preinit = ctx.preinit;
    ctx.retval_int(preinit as i32);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::ObjectStore;
    use crate::stack::ValueStack;
    use t3_object::Value;

    #[test]
    fn slot_layout() {
        let set = function_set();
        assert_eq!(set.funcs.len(), 9);
        assert_eq!(set.get(2).map(|d| d.name), Some("get_vm_vsn"));
        assert!(set.get(2).unwrap().is_available());
        assert!(!set.get(0).unwrap().is_available());
        assert!(set.get(6).unwrap().varargs);
    }

    #[test]
    fn version_and_id() {
        let mut stack = ValueStack::new();
        let mut store = ObjectStore::new();
        let mut ctx = BifContext::new(&mut stack, &mut store);

        get_vm_vsn(&mut ctx, 0).unwrap();
        assert_eq!(ctx.r0, Value::Int(vm_version()));

        get_vm_id(&mut ctx, 0).unwrap();
        let id = ctx.r0.as_obj().unwrap();
        assert_eq!(get_vm_banner(&mut ctx, 1), Err(VmError::WrongNumOfArgs));
        assert_eq!(store.string(id), Some(VM_ID));
    }

    #[test]
    fn preinit_flag() {
        let mut stack = ValueStack::new();
        let mut store = ObjectStore::new();
        let mut ctx = BifContext::new(&mut stack, &mut store);
        get_vm_preinit_mode(&mut ctx, 0).unwrap();
        assert_eq!(ctx.r0, Value::Int(0));
        ctx.preinit = true;
        get_vm_preinit_mode(&mut ctx, 0).unwrap();
        assert_eq!(ctx.r0, Value::Int(1));
    }
}
