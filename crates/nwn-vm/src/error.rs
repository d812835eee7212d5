use thiserror::Error;

pub type Result<T> = std::result::Result<T, VmError>;

/// Everything that can go wrong decoding a script, its debug info, the
/// function spec it binds against, or running it.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("stack underflow")]
    StackUnderflow,

    #[error("expected {expected} on stack, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("malformed instruction: opcode {opcode:#04x} auxcode {auxcode:#04x}")]
    MalformedInstruction { opcode: u8, auxcode: u8 },

    #[error("division by zero")]
    DivisionByZero,

    #[error("host does not implement command {0:?}")]
    NotImplemented(String),

    #[error("no function named {0:?}")]
    UnknownFunction(String),

    #[error("missing struct field {0:?}")]
    MissingField(String),

    #[error("struct field {field:?} has the wrong type, expected {expected}")]
    WrongFieldType {
        field: String,
        expected: &'static str,
    },

    #[error("{0:#x} is not a valid object id")]
    InvalidObject(i64),

    #[error("{0}")]
    FormatError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
