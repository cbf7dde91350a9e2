// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

use std::fmt;

/// The broad category of a cache [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A value or argument list could not be represented as JSON. Nothing was written.
    Argument,
    /// The memoized function failed. Nothing was written.
    Computation,
    /// The storage backend failed. No retry was attempted.
    Storage,
}

impl ErrorKind {
    /// Returns a short lowercase name for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Argument => "argument",
            Self::Computation => "computation",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error from a cache operation.
///
/// Every error has an [`ErrorKind`]. The underlying cause, such as the memoized function's own
/// error or the storage failure, is available through [`std::error::Error::source()`].
///
/// Errors are cheap to clone, which lets a single failed computation be reported to every
/// caller that joined it.
///
/// # Example
///
/// ```
/// use keepsake::ErrorKind;
///
/// fn describe(error: &keepsake::Error) -> &'static str {
///     match error.kind() {
///         ErrorKind::Storage => "the store is unavailable",
///         ErrorKind::Computation => "the function failed",
///         _ => "bad input",
///     }
/// }
/// ```
#[ohno::error]
#[derive(Clone)]
#[display("cache {kind} error")]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    pub(crate) fn argument(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Argument, cause)
    }

    pub(crate) fn computation(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Computation, cause)
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<keepsake_store::Error> for Error {
    fn from(error: keepsake_store::Error) -> Self {
        Self::caused_by(ErrorKind::Storage, error)
    }
}

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn display_names_the_kind() {
        let error = Error::argument("not representable");
        assert!(format!("{error}").contains("argument"), "got: {error}");
    }

    #[test]
    fn storage_errors_keep_their_source() {
        let error = Error::from(keepsake_store::Error::from_message("cache:k", "disk full"));
        assert_eq!(error.kind(), ErrorKind::Storage);

        let source = error.source().expect("storage error should have a source");
        assert!(source.to_string().contains("cache:k"), "got: {source}");
    }

    #[test]
    fn clones_share_kind_and_message() {
        let error = Error::computation("boom");
        let cloned = error.clone();
        assert_eq!(cloned.kind(), ErrorKind::Computation);
        assert_eq!(format!("{error}"), format!("{cloned}"));
    }

    #[test]
    fn kind_names() {
        assert_eq!(ErrorKind::Argument.as_str(), "argument");
        assert_eq!(ErrorKind::Computation.as_str(), "computation");
        assert_eq!(ErrorKind::Storage.as_str(), "storage");
    }
}
