use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MlErr {
    /// An argument is outside of what an operation accepts (padding mode, batch size, ...).
    InvalidArgument(String),
    /// Two sizes that must agree don't.
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// The requested variant of an operation exists but isn't supported.
    NotImplemented(String),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MlErr::InvalidArgument(msg) => format!("invalid argument: {msg}"),
            MlErr::ShapeMismatch {
                what,
                got,
                expected,
            } => {
                format!("shape mismatch for {what}, got {got} and expected {expected}")
            }
            MlErr::NotImplemented(msg) => format!("not implemented: {msg}"),
        };

        write!(f, "{s}")
    }
}

impl Error for MlErr {}
