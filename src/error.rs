use std::fmt;
use std::path::PathBuf;

/// Errors that can occur while loading scenes or running the pipeline.
#[derive(Debug)]
pub enum RenderError {
    /// A file could not be opened or read.
    Io { path: PathBuf, source: std::io::Error },
    /// A mesh description line could not be parsed.
    MeshParse { line: usize, message: String },
    /// The OBJ loader rejected its input.
    Obj(String),
    /// The scene description is malformed or inconsistent.
    Config(String),
    /// A fixed-capacity pool would have been written past its end.
    CapacityExceeded { what: &'static str, capacity: usize },
    /// Matrix has no inverse.
    SingularMatrix,
    /// A stage tried to read vertices that were not transformed this frame.
    StaleGeometry { object: String },
    /// A polygon referenced missing vertices or had an unsupported vertex count.
    InvalidPolygon(String),
    /// Transform jobs panicked and their objects never came back.
    JobsLost { lost: usize, total: usize },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Io { path, source } => {
                write!(f, "failed to read '{}': {source}", path.display())
            }
            RenderError::MeshParse { line, message } => {
                write!(f, "mesh parse error at line {line}: {message}")
            }
            RenderError::Obj(e) => write!(f, "obj load failed: {e}"),
            RenderError::Config(e) => write!(f, "invalid scene config: {e}"),
            RenderError::CapacityExceeded { what, capacity } => {
                write!(f, "{what} capacity of {capacity} exceeded")
            }
            RenderError::SingularMatrix => write!(f, "matrix is singular"),
            RenderError::StaleGeometry { object } => {
                write!(f, "object '{object}' was not transformed this frame")
            }
            RenderError::InvalidPolygon(e) => write!(f, "invalid polygon: {e}"),
            RenderError::JobsLost { lost, total } => {
                write!(f, "{lost} of {total} transform jobs panicked")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(e: serde_json::Error) -> Self {
        return RenderError::Config(e.to_string());
    }
}

impl From<obj::ObjError> for RenderError {
    fn from(e: obj::ObjError) -> Self {
        return RenderError::Obj(e.to_string());
    }
}
