use std::fmt;
use std::io;

/// The one fatal error type in the pipeline. Everything else (an unresolved
/// pre-signal reference, a matrix anomaly, a missing register) is a
/// warn-and-continue recovery logged at the call site instead of a `Result`
/// variant here.
#[derive(Debug)]
pub enum ConvertError {
    Io(io::Error),
    UnexpectedEof { context: &'static str },
    VersionMismatch { found: String },
    InvalidFloat { line: String },
    MissingElement(u32),
    MissingEnv { var: &'static str },
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::Io(e) => write!(f, "I/O error: {e}"),
            ConvertError::UnexpectedEof { context } => {
                write!(f, "unexpected end of file while reading {context}")
            }
            ConvertError::VersionMismatch { found } => {
                write!(f, "unsupported file version {found:?}, expected \"2.3\"")
            }
            ConvertError::InvalidFloat { line } => {
                write!(f, "couldn't parse {line:?} as a locale-comma float")
            }
            ConvertError::MissingElement(nr) => {
                write!(f, "element {nr} referenced but never defined")
            }
            ConvertError::MissingEnv { var } => {
                write!(f, "environment variable {var} is not set")
            }
        }
    }
}

impl std::error::Error for ConvertError {}

impl From<io::Error> for ConvertError {
    fn from(e: io::Error) -> Self {
        ConvertError::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
