use t3_object::DataType;
use thiserror::Error;

/// Errors raised into the running program.
///
/// Each variant carries the published VM error number, see [`VmError::code`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("unknown intrinsic function set \"{name}\"")]
    UnknownFuncSet { name: String },
    #[error("intrinsic function {index} is not available in function set \"{set}\"")]
    UnavailIntrinsic { set: String, index: u16 },
    #[error("function set \"{requested}\" is newer than the available version \"{available}\"")]
    FuncSetTooOld { requested: String, available: String },
    #[error("invalid function set identifier {id:?}")]
    InvalidFuncSetId { id: String },
    #[error("function set table is full at {0} entries")]
    TooManyFuncSets(usize),
    #[error("wrong number of arguments")]
    WrongNumOfArgs,
    #[error("integer value required")]
    IntValRequired,
    #[error("object value required")]
    ObjValRequired,
    #[error("invalid comparison")]
    InvalidComparison,
    #[error("invalid type for intrinsic function argument")]
    BadTypeBif,
    #[error("invalid value for intrinsic function argument")]
    BadValBif,
}

impl VmError {
    pub const fn code(&self) -> u32 {
        match self {
            Self::UnknownFuncSet { .. } => 302,
            Self::UnavailIntrinsic { .. } => 322,
            Self::FuncSetTooOld { .. } => 330,
            Self::InvalidFuncSetId { .. } => 302,
            Self::TooManyFuncSets(_) => 202,
            Self::WrongNumOfArgs => 2201,
            Self::IntValRequired => 2005,
            Self::ObjValRequired => 2010,
            Self::InvalidComparison => 2009,
            Self::BadTypeBif => 2304,
            Self::BadValBif => 2306,
        }
    }
}

/// Why a value could not be resolved to a method header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("value of type {0:?} is not callable")]
    NotCallable(DataType),
    #[error("no intrinsic at set {set_idx}, function {func_idx}")]
    MissingIntrinsic { set_idx: u16, func_idx: u16 },
    #[error("code address is outside every known code region")]
    UnknownCodeAddress,
    #[error("invoker chain exceeds {0} steps")]
    InvokerDepthExceeded(usize),
}
