use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("invalid simulation parameter: {0}")]
    InvalidParam(&'static str),
    #[error("charger fault: {0}")]
    Fault(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
