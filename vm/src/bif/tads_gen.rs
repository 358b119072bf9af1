//! `tads-gen` function set: general-purpose intrinsics.
//!
//! Every published slot is declared so function pointers see the full
//! argument contract; slots that need subsystems this VM does not carry
//! (regular expressions, save files, lists) have no handler.

use std::cmp::Ordering;

use t3_object::Value;

use super::{BifContext, BifDesc, FunctionSet};
use crate::error::VmError;

pub const SET_ID: &str = "tads-gen/030008";

pub fn function_set() -> FunctionSet {
    FunctionSet::new(SET_ID, vec![
        BifDesc::new("dataType", 1, 0, false, data_type),
        BifDesc::unavailable("getArg", 1, 0, false),
        BifDesc::unavailable("firstObj", 0, 2, false),
        BifDesc::unavailable("nextObj", 1, 2, false),
        BifDesc::unavailable("randomize", 0, 0, true),
        BifDesc::unavailable("rand", 0, 0, true),
        BifDesc::unavailable("toString", 1, 2, false),
        BifDesc::unavailable("toInteger", 1, 1, false),
        BifDesc::unavailable("getTime", 0, 1, false),
        BifDesc::unavailable("rexMatch", 2, 1, false),
        BifDesc::unavailable("rexSearch", 2, 1, false),
        BifDesc::unavailable("rexGroup", 1, 0, false),
        BifDesc::unavailable("rexReplace", 3, 3, false),
        BifDesc::unavailable("savepoint", 0, 0, false),
        BifDesc::unavailable("undo", 0, 0, false),
        BifDesc::unavailable("saveGame", 1, 1, false),
        BifDesc::unavailable("restoreGame", 1, 0, false),
        BifDesc::unavailable("restartGame", 0, 0, false),
        BifDesc::new("max", 1, 0, true, max),
        BifDesc::new("min", 1, 0, true, min),
        BifDesc::unavailable("makeString", 1, 1, false),
        BifDesc::unavailable("getFuncParams", 1, 0, false),
        BifDesc::unavailable("toNumber", 1, 1, false),
        BifDesc::unavailable("sprintf", 1, 0, true),
        BifDesc::unavailable("makeList", 1, 1, false),
        BifDesc::new("abs", 1, 0, false, abs),
        BifDesc::new("sgn", 1, 0, false, sgn),
        BifDesc::unavailable("concat", 0, 0, true),
        BifDesc::unavailable("rexSearchLast", 2, 1, false),
    ])
}

fn data_type(ctx: &mut BifContext<'_>, argc: u32) -> Result<(), VmError> {
    ctx.check_argc(argc, 1)?;
    let val = ctx.pop()?;
    ctx.retval_int(val.datatype() as i32);
    Ok(())
}

fn compare(a: Value, b: Value) -> Result<Ordering, VmError> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(&b)),
        _ => Err(VmError::InvalidComparison),
    }
}

/// Pops `argc` arguments and returns the one `pick` prefers. Ties keep the
/// earlier argument.
fn select(ctx: &mut BifContext<'_>, argc: u32, pick: Ordering) -> Result<(), VmError> {
    if argc < 1 {
        return Err(VmError::WrongNumOfArgs);
    }
    let mut best = ctx.pop()?;
    for _ in 1..argc {
        let val = ctx.pop()?;
        if compare(val, best)? == pick {
            best = val;
        }
    }
    ctx.retval(best);
    Ok(())
}

fn max(ctx: &mut BifContext<'_>, argc: u32) -> Result<(), VmError> {
    select(ctx, argc, Ordering::Greater)
}

fn min(ctx: &mut BifContext<'_>, argc: u32) -> Result<(), VmError> {
    select(ctx, argc, Ordering::Less)
}

fn abs(ctx: &mut BifContext<'_>, argc: u32) -> Result<(), VmError> {
    ctx.check_argc(argc, 1)?;
    let val = ctx.pop()?;
    let i = val.as_int().ok_or(VmError::BadTypeBif)?;
    ctx.retval_int(i.checked_abs().ok_or(VmError::BadValBif)?);
    Ok(())
}

fn sgn(ctx: &mut BifContext<'_>, argc: u32) -> Result<(), VmError> {
    ctx.check_argc(argc, 1)?;
    let val = ctx.pop()?;
    let i = val.as_int().ok_or(VmError::BadTypeBif)?;
    ctx.retval_int(i.signum());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bif::BifFn;
    use crate::objects::ObjectStore;
    use crate::stack::ValueStack;
    use t3_object::{DataType, ObjectId};

    fn call(f: BifFn, args: &[Value]) -> (Result<Value, VmError>, usize) {
        let mut stack = ValueStack::new();
        stack.push(Value::Int(-1));
        stack.push_args(args);
        let mut store = ObjectStore::new();
        let mut ctx = BifContext::new(&mut stack, &mut store);
        let res = f(&mut ctx, args.len() as u32).map(|_| ctx.r0);
        (res, stack.depth())
    }

    #[test]
    fn slot_layout() {
        let set = function_set();
        assert_eq!(set.funcs.len(), 29);
        assert_eq!(set.get(0).map(|d| d.name), Some("dataType"));
        assert_eq!(set.get(18).map(|d| d.name), Some("max"));
        assert_eq!(set.get(19).map(|d| d.name), Some("min"));
        assert_eq!(set.get(21).map(|d| d.name), Some("getFuncParams"));
        assert_eq!(set.get(28).map(|d| d.name), Some("rexSearchLast"));
        let max = set.get(18).unwrap().header();
        assert!(max.is_varargs());
        assert!(max.argc_ok(1) && max.argc_ok(9) && !max.argc_ok(0));
    }

    #[test]
    fn data_type_codes() {
        assert_eq!(call(data_type, &[Value::Int(3)]).0, Ok(Value::Int(DataType::Int as i32)));
        assert_eq!(call(data_type, &[Value::Obj(ObjectId(2))]).0, Ok(Value::Int(5)));
        assert_eq!(call(data_type, &[]).0, Err(VmError::WrongNumOfArgs));
    }

    #[test]
    fn max_and_min_consume_all_arguments() {
        let args = [Value::Int(3), Value::Int(9), Value::Int(-2)];
        assert_eq!(call(max, &args), (Ok(Value::Int(9)), 1));
        assert_eq!(call(min, &args), (Ok(Value::Int(-2)), 1));
        assert_eq!(call(max, &[Value::Int(5)]).0, Ok(Value::Int(5)));
    }

    #[test]
    fn max_rejects_bad_input() {
        assert_eq!(call(max, &[]).0, Err(VmError::WrongNumOfArgs));
        assert_eq!(call(min, &[Value::Int(1), Value::Nil]).0, Err(VmError::InvalidComparison));
    }

    #[test]
    fn abs_and_sgn() {
        assert_eq!(call(abs, &[Value::Int(-4)]).0, Ok(Value::Int(4)));
        assert_eq!(call(abs, &[Value::Int(i32::MIN)]).0, Err(VmError::BadValBif));
        assert_eq!(call(abs, &[Value::True]).0, Err(VmError::BadTypeBif));
        assert_eq!(call(sgn, &[Value::Int(-4)]).0, Ok(Value::Int(-1)));
        assert_eq!(call(sgn, &[Value::Int(0)]).0, Ok(Value::Int(0)));
    }
}
