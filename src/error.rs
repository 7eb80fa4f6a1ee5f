use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
    #[error("parse int error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),
    #[error("{message}")]
    Parser { message: String },
    #[error("CRITICAL ERROR: Memory not allocated. Access denied.")]
    Guard,
    #[error("RESISTANCE ERROR: Variable '{name}' is locked and resistant to change.")]
    Resistance { name: String },
    #[error("SERVER ERROR: {message}")]
    Network { message: String },
    #[error("TYPE ERROR: cannot {op} {left} and {right}")]
    OperandType {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("ARITHMETIC ERROR: integer overflow in {op}")]
    Overflow { op: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;

pub fn parser_error<T>(message: impl Into<String>) -> Result<T> {
    Err(Error::Parser {
        message: message.into(),
    })
}

pub fn network_error<T>(message: impl Into<String>) -> Result<T> {
    Err(Error::Network {
        message: message.into(),
    })
}
