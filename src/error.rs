//! Error types shared by every decoder in the crate.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Root category of a failure, independent of how many context layers wrap it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or truncated binary input.
    InvalidRecord,
    /// Malformed textual SID, GUID or capability input.
    InvalidIdentifier,
    /// An access-check options bundle that could not be loaded or stored.
    InvalidConfig,
}

/// Errors produced while decoding or parsing security structures.
///
/// Decoders never recover from a failure: the innermost error is wrapped with
/// one [`Error::Context`] layer per enclosing record, so the rendered message
/// reads as a cause chain, e.g.
/// `parsing DACL: reading ACE 2: invalid advanced ACE size for SID: -3`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    InvalidRecord(String),

    #[error("{0}")]
    InvalidIdentifier(String),

    #[error("invalid access check options: {0}")]
    InvalidConfig(String),

    #[error("{context}: {inner}")]
    Context {
        context: String,
        #[source]
        inner: Box<Error>,
    },
}

impl Error {
    pub(crate) fn record<S: Into<String>>(msg: S) -> Error {
        Error::InvalidRecord(msg.into())
    }

    pub(crate) fn identifier<S: Into<String>>(msg: S) -> Error {
        Error::InvalidIdentifier(msg.into())
    }

    /// Wraps `self` in another layer of context.
    pub fn context<S: Into<String>>(self, context: S) -> Error {
        Error::Context {
            context: context.into(),
            inner: Box::new(self),
        }
    }

    /// The category of the innermost error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidRecord(_) => ErrorKind::InvalidRecord,
            Error::InvalidIdentifier(_) => ErrorKind::InvalidIdentifier,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Error::Context { inner, .. } => inner.kind(),
        }
    }

    /// The innermost error, with all context layers removed.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { inner, .. } => inner.root(),
            other => other,
        }
    }
}

pub(crate) trait ResultExt<T> {
    fn context<S: Into<String>>(self, context: S) -> Result<T>;

    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context<S: Into<String>>(self, context: S) -> Result<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T> {
        self.map_err(|e| e.context(f()))
    }
}
