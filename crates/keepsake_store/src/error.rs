// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for storage operations.

/// An error from a storage operation.
///
/// Carries the key the operation was addressing. The underlying cause, such as an I/O or
/// decoding failure, is available through [`std::error::Error::source()`].
///
/// # Example
///
/// ```
/// use keepsake_store::Error;
///
/// let error = Error::from_message("cache:user", "disk full");
/// assert_eq!(error.key(), "cache:user");
/// ```
#[ohno::error]
#[display("storage operation on '{key}' failed")]
pub struct Error {
    key: String,
}

impl Error {
    /// Creates an error for an operation on `key` that failed because of `cause`.
    ///
    /// This is the constructor for [`Store`](crate::Store) implementations outside this crate.
    ///
    /// # Examples
    ///
    /// ```
    /// use keepsake_store::Error;
    ///
    /// let io = std::io::Error::other("connection reset");
    /// let error = Error::from_message("cache:session", io);
    /// assert!(std::error::Error::source(&error).is_some());
    /// ```
    pub fn from_message(key: impl Into<String>, cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(key, cause)
    }

    /// Returns the key the failed operation was addressing.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// A specialized [`Result`] type for storage operations.
pub type Result<T> = std::result::Result<T, Error>;
