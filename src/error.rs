use std::{error::Error, fmt, io};

use machine_learning::MlErr;

/// The result type of the loaders and the inference run.
pub type Result<T> = std::result::Result<T, LoadErr>;

/// Failures while reading the dataset, the model or the configuration, or while evaluating.
#[derive(Debug)]
pub enum LoadErr {
    Io(io::Error),
    /// An IDX file doesn't start with the expected magic number.
    BadMagic {
        what: &'static str,
        got: u32,
        expected: u32,
    },
    /// An IDX header field disagrees with what was requested.
    Header {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// A file ended before `expected` bytes of `what` could be read.
    Truncated { what: &'static str, expected: usize },
    /// A token of a parameter file isn't a float.
    Parse {
        file: String,
        index: usize,
        token: String,
    },
    /// A parameter file holds the wrong amount of values for its tensor.
    ValueCount {
        file: String,
        got: usize,
        expected: usize,
    },
    Config(String),
    Json(serde_json::Error),
    Shape(ndarray::ShapeError),
    Ml(MlErr),
}

impl fmt::Display for LoadErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadErr::Io(e) => write!(f, "io error: {e}"),
            LoadErr::BadMagic {
                what,
                got,
                expected,
            } => write!(
                f,
                "bad magic number in {what}: got {got:#010x}, expected {expected:#010x}"
            ),
            LoadErr::Header {
                what,
                got,
                expected,
            } => write!(f, "unexpected {what} in header: got {got}, expected {expected}"),
            LoadErr::Truncated { what, expected } => {
                write!(f, "{what} ended before {expected} bytes could be read")
            }
            LoadErr::Parse { file, index, token } => {
                write!(f, "value {index} of {file} is not a float: {token:?}")
            }
            LoadErr::ValueCount {
                file,
                got,
                expected,
            } => write!(f, "{file} holds {got} values, expected {expected}"),
            LoadErr::Config(msg) => write!(f, "invalid config: {msg}"),
            LoadErr::Json(e) => write!(f, "invalid JSON: {e}"),
            LoadErr::Shape(e) => write!(f, "shape error: {e}"),
            LoadErr::Ml(e) => write!(f, "{e}"),
        }
    }
}

impl Error for LoadErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LoadErr::Io(e) => Some(e),
            LoadErr::Json(e) => Some(e),
            LoadErr::Shape(e) => Some(e),
            LoadErr::Ml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LoadErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for LoadErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<ndarray::ShapeError> for LoadErr {
    fn from(value: ndarray::ShapeError) -> Self {
        Self::Shape(value)
    }
}

impl From<MlErr> for LoadErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}
