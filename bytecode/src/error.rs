use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("record truncated: need {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },
    #[error("{record} size {got} is below the minimum of {min}")]
    SizeTooSmall { record: &'static str, min: u16, got: u16 },
}
