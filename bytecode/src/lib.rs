mod builder;
mod debug;
mod error;
mod exception;
mod header;
mod pool;
pub mod reader;
mod sizes;

pub use builder::{ExceptionRecord, FrameRecord, LineRecord, MethodBuilder, SymbolName, SymbolRecord};
pub use debug::{DebugFrame, DebugLine, DebugSymbol, DebugTable, Symbols};
pub use error::DecodeError;
pub use exception::{ExceptionEntry, ExceptionTable};
pub use header::{METHOD_HEADER_MIN_SIZE, MethodHeader, synth_header};
pub use pool::{CodePool, ConstantPool, PagedPool};
pub use sizes::{Entrypoint, LEGACY_FRAME_SIZE, RANGED_FRAME_SIZE, TableSizes};
