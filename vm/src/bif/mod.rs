//! Intrinsic ("built-in") functions and the tables that link them to images.

use t3_bytecode::{METHOD_HEADER_MIN_SIZE, MethodHeader, synth_header};
use t3_object::{ObjectId, StringFactory, Value};

use crate::error::VmError;
use crate::stack::ValueStack;

mod catalog;
pub mod tads_gen;
mod table;
pub mod t3;

pub use catalog::{FunctionSetCatalog, Lookup};
pub use table::BifTable;

/// Native handler for one intrinsic.
///
/// Receives the actual argument count. It pops exactly that many arguments
/// off the stack and leaves its result in `ctx.r0`.
pub type BifFn = fn(&mut BifContext<'_>, u32) -> Result<(), VmError>;

/// Called with the set and the table index it was linked at.
pub type SetHook = fn(&FunctionSet, u16);

/// One intrinsic: handler, argument contract and the header-only method
/// record that lets function pointers treat it like byte code.
#[derive(Clone, Copy)]
pub struct BifDesc {
    pub name: &'static str,
    pub func: Option<BifFn>,
    pub min_argc: u8,
    pub opt_argc: u8,
    pub varargs: bool,
    pub synth_hdr: [u8; METHOD_HEADER_MIN_SIZE],
}

impl BifDesc {
    pub const fn new(name: &'static str, min_argc: u8, opt_argc: u8, varargs: bool, func: BifFn) -> Self {
        Self {
            name,
            func: Some(func),
            min_argc,
            opt_argc,
            varargs,
            synth_hdr: synth_header(min_argc, opt_argc, varargs),
        }
    }

    /// A declared slot with no handler in this VM.
    pub const fn unavailable(name: &'static str, min_argc: u8, opt_argc: u8, varargs: bool) -> Self {
        Self {
            name,
            func: None,
            min_argc,
            opt_argc,
            varargs,
            synth_hdr: synth_header(min_argc, opt_argc, varargs),
        }
    }

    #[inline]
    pub fn header(&self) -> MethodHeader<'_> {
        MethodHeader::new(&self.synth_hdr)
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        self.func.is_some()
    }
}

impl core::fmt::Debug for BifDesc {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BifDesc")
            .field("name", &self.name)
            .field("available", &self.is_available())
            .field("min_argc", &self.min_argc)
            .field("opt_argc", &self.opt_argc)
            .field("varargs", &self.varargs)
            .finish()
    }
}

/// A named, versioned collection of intrinsics.
///
/// Functions are addressed by their position in `funcs`; positions are part
/// of the published interface and never change within a set name.
pub struct FunctionSet {
    pub id: String,
    pub funcs: Vec<BifDesc>,
    pub attach: Option<SetHook>,
    pub detach: Option<SetHook>,
}

impl FunctionSet {
    pub fn new(id: impl Into<String>, funcs: Vec<BifDesc>) -> Self {
        Self {
            id: id.into(),
            funcs,
            attach: None,
            detach: None,
        }
    }

    pub fn with_hooks(mut self, attach: Option<SetHook>, detach: Option<SetHook>) -> Self {
        self.attach = attach;
        self.detach = detach;
        self
    }

    pub fn name(&self) -> &str {
        split_version(&self.id).0
    }

    pub fn version(&self) -> &str {
        split_version(&self.id).1
    }

    pub fn get(&self, func_idx: u16) -> Option<&BifDesc> {
        self.funcs.get(func_idx as usize)
    }
}

impl core::fmt::Debug for FunctionSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FunctionSet")
            .field("id", &self.id)
            .field("funcs", &self.funcs.len())
            .finish()
    }
}

pub const DEFAULT_VERSION: &str = "000000";

/// Splits `"name/version"` at the first `/`. A missing suffix reads as
/// [`DEFAULT_VERSION`].
pub fn split_version(id: &str) -> (&str, &str) {
    id.split_once('/').unwrap_or((id, DEFAULT_VERSION))
}

/// Set identifiers are 1 to 255 printable ASCII characters.
pub fn is_valid_set_id(id: &str) -> bool {
    (1..=255).contains(&id.len()) && id.bytes().all(|b| (0x20..=0x7e).contains(&b))
}

/// What an intrinsic sees of the running VM.
pub struct BifContext<'a> {
    pub stack: &'a mut ValueStack,
    /// Return value register.
    pub r0: Value,
    pub strings: &'a mut dyn StringFactory,
    pub preinit: bool,
}

impl<'a> BifContext<'a> {
    pub fn new(stack: &'a mut ValueStack, strings: &'a mut dyn StringFactory) -> Self {
        Self {
            stack,
            r0: Value::Nil,
            strings,
            preinit: false,
        }
    }

    // ── argument checks ────────────────────────────────────────────

    pub fn check_argc(&self, argc: u32, needed: u32) -> Result<(), VmError> {
        if argc != needed {
            return Err(VmError::WrongNumOfArgs);
        }
        Ok(())
    }

    pub fn check_argc_range(&self, argc: u32, min: u32, max: u32) -> Result<(), VmError> {
        if argc < min || argc > max {
            return Err(VmError::WrongNumOfArgs);
        }
        Ok(())
    }

    // ── arguments ──────────────────────────────────────────────────

    pub fn pop(&mut self) -> Result<Value, VmError> {
        self.stack.pop().ok_or(VmError::WrongNumOfArgs)
    }

    pub fn pop_int_val(&mut self) -> Result<i32, VmError> {
        self.pop()?.as_int().ok_or(VmError::IntValRequired)
    }

    pub fn pop_obj_val(&mut self) -> Result<ObjectId, VmError> {
        self.pop()?.as_obj().ok_or(VmError::ObjValRequired)
    }

    pub fn pop_bool_val(&mut self) -> Result<bool, VmError> {
        match self.pop()? {
            Value::True => Ok(true),
            Value::Nil => Ok(false),
            Value::Int(i) => Ok(i != 0),
            _ => Err(VmError::BadTypeBif),
        }
    }

    pub fn discard(&mut self, n: u32) {
        self.stack.discard(n as usize);
    }

    // ── return values ──────────────────────────────────────────────

    #[inline]
    pub fn retval(&mut self, value: Value) {
        self.r0 = value;
    }

    pub fn retval_nil(&mut self) {
        self.r0 = Value::Nil;
    }

    pub fn retval_true(&mut self) {
        self.r0 = Value::True;
    }

    pub fn retval_bool(&mut self, b: bool) {
        self.r0 = Value::from_bool(b);
    }

    pub fn retval_int(&mut self, i: i32) {
        self.r0 = Value::Int(i);
    }

    /// An invalid id returns nil.
    pub fn retval_obj(&mut self, id: ObjectId) {
        self.r0 = if id.is_valid() { Value::Obj(id) } else { Value::Nil };
    }

    pub fn retval_str(&mut self, s: &str) {
        let id = self.strings.create_string(s.as_bytes());
        self.retval_obj(id);
    }
}
