/// Object identifier. `ObjectId::INVALID` (zero) never names a live object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ObjectId(pub u32);

impl ObjectId {
    pub const INVALID: Self = Self(0);

    #[inline(always)]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// Property identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct PropId(pub u16);

/// Identity of a method header in memory.
///
/// Two method headers are the same header iff they start at the same byte.
/// A `CodeAddr` is never dereferenced; it is only compared against the
/// regions owned by the code pool and by dynamic-function objects.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct CodeAddr(usize);

impl CodeAddr {
    /// Address of the first byte of `bytes`.
    #[inline(always)]
    pub fn of(bytes: &[u8]) -> Self {
        Self(bytes.as_ptr() as usize)
    }

    #[inline(always)]
    pub const fn raw(self) -> usize {
        self.0
    }

    /// Byte offset of `self` inside `region`, if it lies within it.
    #[inline]
    pub fn offset_in(self, region: &[u8]) -> Option<usize> {
        let base = region.as_ptr() as usize;
        if self.0 >= base && self.0 < base + region.len() {
            Some(self.0 - base)
        } else {
            None
        }
    }
}

impl core::fmt::Debug for CodeAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "CodeAddr(0x{:x})", self.0)
    }
}

/// Published data type codes, as returned by `dataType()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataType {
    Nil = 1,
    True = 2,
    Object = 5,
    Prop = 6,
    Int = 7,
    SString = 8,
    DString = 9,
    List = 10,
    Code = 11,
    FuncPtr = 12,
    Empty = 13,
    NativeCode = 14,
    Enum = 15,
    BifPtr = 16,
}

/// A runtime value.
///
/// Each arm carries its payload directly: pool offsets for the pool-backed
/// types, an object id for objects, a header address for raw code pointers
/// and a `(set, func)` pair for built-in function pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Value {
    #[default]
    Nil,
    True,
    Empty,
    Int(i32),
    Obj(ObjectId),
    Prop(PropId),
    Enum(u32),
    /// Constant string, as a constant pool offset.
    SString(u32),
    /// Self-printing string, as a constant pool offset.
    DString(u32),
    /// Constant list, as a constant pool offset.
    List(u32),
    /// Code pool offset of a method header.
    CodeOfs(u32),
    /// Code pool offset of a function's method header.
    FuncPtr(u32),
    /// Method header that may live outside the code pool.
    CodePtr(CodeAddr),
    BifPtr { set_idx: u16, func_idx: u16 },
    /// Built-in function pointer in the extended encoding.
    BifPtrX { set_idx: u16, func_idx: u16 },
}

impl Value {
    #[inline(always)]
    pub const fn from_bool(b: bool) -> Self {
        if b { Self::True } else { Self::Nil }
    }

    #[inline(always)]
    pub const fn is_nil(self) -> bool {
        matches!(self, Self::Nil)
    }

    #[inline(always)]
    pub const fn as_int(self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(i),
            _ => None,
        }
    }

    #[inline(always)]
    pub const fn as_obj(self) -> Option<ObjectId> {
        match self {
            Self::Obj(id) => Some(id),
            _ => None,
        }
    }

    /// The `(set, func)` pair of either built-in pointer encoding.
    #[inline(always)]
    pub const fn as_bifptr(self) -> Option<(u16, u16)> {
        match self {
            Self::BifPtr { set_idx, func_idx } | Self::BifPtrX { set_idx, func_idx } => {
                Some((set_idx, func_idx))
            }
            _ => None,
        }
    }

    pub const fn datatype(self) -> DataType {
        match self {
            Self::Nil => DataType::Nil,
            Self::True => DataType::True,
            Self::Empty => DataType::Empty,
            Self::Int(_) => DataType::Int,
            Self::Obj(_) => DataType::Object,
            Self::Prop(_) => DataType::Prop,
            Self::Enum(_) => DataType::Enum,
            Self::SString(_) => DataType::SString,
            Self::DString(_) => DataType::DString,
            Self::List(_) => DataType::List,
            Self::CodeOfs(_) => DataType::Code,
            Self::FuncPtr(_) => DataType::FuncPtr,
            Self::CodePtr(_) => DataType::NativeCode,
            Self::BifPtr { .. } | Self::BifPtrX { .. } => DataType::BifPtr,
        }
    }
}

/// Creates string objects from UTF-8 bytes.
pub trait StringFactory {
    fn create_string(&mut self, bytes: &[u8]) -> ObjectId;
}
