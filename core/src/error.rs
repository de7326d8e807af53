use std::fmt;

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum StoreError {
    /// A single-path write targeted a leaf marked `:ro`.
    ReadOnly { path: String },
    /// A path segment that must be a group is a leaf.
    NotAGroup { path: String },
    /// A single-path write targeted a group instead of a leaf.
    NotALeaf { path: String },
    /// The path has no usable segments.
    InvalidPath(String),
    /// Text could not be decoded into (or encoded from) a parameter tree.
    Parse(String),
    /// Filesystem I/O error.
    Io(std::io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ReadOnly { path } => {
                write!(f, "{} is a read only parameter", path)
            }
            StoreError::NotAGroup { path } => {
                write!(f, "{} is a parameter, not a group", path)
            }
            StoreError::NotALeaf { path } => {
                write!(f, "{} is a group, not a parameter", path)
            }
            StoreError::InvalidPath(path) => write!(f, "invalid parameter path: '{}'", path),
            StoreError::Parse(msg) => write!(f, "parse error: {}", msg),
            StoreError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_yaml::Error> for StoreError {
    fn from(e: serde_yaml::Error) -> Self {
        StoreError::Parse(e.to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_message_names_path() {
        let err = StoreError::ReadOnly { path: "global/version".into() };
        assert_eq!(err.to_string(), "global/version is a read only parameter");
    }

    #[test]
    fn io_error_converts_and_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: StoreError = io.into();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
