use std::path::PathBuf;

/// Which kind of table a value is. Used to report kind mismatches
/// when a tagged [`crate::AnyTable`] is handed to an operation that
/// consumes a specific kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    FeatureTable,
    SpectraDocuments,
    MemoMatrix,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::FeatureTable => "FeatureTable",
            EntityKind::SpectraDocuments => "SpectraDocuments",
            EntityKind::MemoMatrix => "MemoMatrix",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug)]
pub enum MemoError {
    /// A required input was never supplied.
    Argument {
        argument: &'static str,
    },
    /// An input of the wrong kind was supplied.
    KindMismatch {
        expected: &'static str,
        found: EntityKind,
    },
    /// Unsupported software, invalid table selector or invalid sample pattern.
    Configuration {
        msg: String,
    },
    /// The data itself is malformed (non-numeric ids, broken files ...).
    Data {
        msg: String,
        context: Option<String>,
    },
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },
    Csv(csv::Error),
    Json(serde_json::Error),
    MessagePack(rmp_serde::decode::Error),
}

impl MemoError {
    pub fn configuration(msg: impl std::fmt::Display) -> Self {
        Self::Configuration {
            msg: msg.to_string(),
        }
    }

    pub fn data(msg: impl std::fmt::Display) -> Self {
        Self::Data {
            msg: msg.to_string(),
            context: None,
        }
    }

    pub fn append_to_context(mut self, context: &str) -> Self {
        if let MemoError::Data {
            context: owned_context,
            ..
        } = &mut self
        {
            match owned_context {
                Some(x) => {
                    x.push_str("; ");
                    x.push_str(context);
                }
                None => *owned_context = Some(context.to_string()),
            }
        }
        self
    }

    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
        }
    }
}

impl std::fmt::Display for MemoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoError::Argument { argument } => write!(f, "{} argument missing", argument),
            MemoError::KindMismatch { expected, found } => {
                write!(f, "expected a {}, got a {}", expected, found)
            }
            MemoError::Configuration { msg } => write!(f, "Configuration error: {}", msg),
            MemoError::Data { msg, context } => match context {
                Some(context) => write!(f, "Data error: {} ({})", msg, context),
                None => write!(f, "Data error: {}", msg),
            },
            MemoError::Io { source, path } => match path {
                Some(path) => write!(f, "Error reading {}: {}", path.display(), source),
                None => write!(f, "IO error: {}", source),
            },
            MemoError::Csv(e) => write!(f, "CSV error: {}", e),
            MemoError::Json(e) => write!(f, "JSON error: {}", e),
            MemoError::MessagePack(e) => write!(f, "MessagePack error: {}", e),
        }
    }
}

impl std::error::Error for MemoError {}

pub type Result<T> = std::result::Result<T, MemoError>;

impl From<std::io::Error> for MemoError {
    fn from(x: std::io::Error) -> Self {
        Self::Io {
            source: x,
            path: None,
        }
    }
}

impl From<csv::Error> for MemoError {
    fn from(x: csv::Error) -> Self {
        Self::Csv(x)
    }
}

impl From<serde_json::Error> for MemoError {
    fn from(x: serde_json::Error) -> Self {
        Self::Json(x)
    }
}

impl From<rmp_serde::decode::Error> for MemoError {
    fn from(x: rmp_serde::decode::Error) -> Self {
        Self::MessagePack(x)
    }
}

impl From<regex::Error> for MemoError {
    fn from(x: regex::Error) -> Self {
        Self::Configuration {
            msg: format!("invalid sample pattern: {}", x),
        }
    }
}
