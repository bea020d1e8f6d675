use std::fmt;

/// A fatal simulation error.
///
/// All variants abort the run before or during setup; no step-level
/// operation is retryable once setup has succeeded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimError {
    /// Malformed or inconsistent configuration, including a mismatch
    /// between the declared map type and the triangulation strategy.
    Config(String),
    /// Degenerate or insufficient boundary-curve data, or an
    /// inconsistent mesh discovered while stepping.
    Geometry(String),
    /// Out-of-range argument at engine construction.
    InvalidArgument(String),
}

impl SimError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Geometry(msg) => write!(f, "geometry error: {msg}"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
        }
    }
}

impl std::error::Error for SimError {}
