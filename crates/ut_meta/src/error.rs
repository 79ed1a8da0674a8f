use alloc::borrow::Cow;

use thiserror::Error;

// -----------------------------------------------------------------------------
// Error

/// Failure of a controller, parameter or linker operation.
///
/// Every variant carries a human readable message. Use [`Error::kind`] to
/// branch on the category.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A node, attribute or link target does not exist.
    #[error("not found: {0}")]
    NotFound(Cow<'static, str>),

    /// A serialized type name differs from the current one.
    #[error("types do not match: {0}")]
    TypesNotMatch(Cow<'static, str>),

    /// Growing the tree or one of the tables failed.
    #[error("out of memory: {0}")]
    OutOfMemory(Cow<'static, str>),

    /// A size or cursor lies outside the stream.
    #[error("out of bounds: {0}")]
    OutOfBounds(Cow<'static, str>),

    /// An expected value is absent.
    #[error("empty: {0}")]
    Empty(Cow<'static, str>),

    /// Anything else, including operations invalid in the current mode.
    #[error("failed: {0}")]
    Fail(Cow<'static, str>),
}

/// The category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    TypesNotMatch,
    OutOfMemory,
    OutOfBounds,
    Empty,
    Fail,
}

macro_rules! constructors {
    ($($fn_name:ident => $variant:ident),* $(,)?) => {$(
        #[doc = concat!("Creates an [`Error::", stringify!($variant), "`].")]
        #[inline]
        pub fn $fn_name(message: impl Into<Cow<'static, str>>) -> Self {
            Self::$variant(message.into())
        }
    )*};
}

impl Error {
    constructors! {
        not_found => NotFound,
        types_not_match => TypesNotMatch,
        out_of_memory => OutOfMemory,
        out_of_bounds => OutOfBounds,
        empty => Empty,
        fail => Fail,
    }

    /// Returns the category of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::TypesNotMatch(_) => ErrorKind::TypesNotMatch,
            Self::OutOfMemory(_) => ErrorKind::OutOfMemory,
            Self::OutOfBounds(_) => ErrorKind::OutOfBounds,
            Self::Empty(_) => ErrorKind::Empty,
            Self::Fail(_) => ErrorKind::Fail,
        }
    }

    /// Returns the message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(m)
            | Self::TypesNotMatch(m)
            | Self::OutOfMemory(m)
            | Self::OutOfBounds(m)
            | Self::Empty(m)
            | Self::Fail(m) => m,
        }
    }
}

impl From<alloc::collections::TryReserveError> for Error {
    fn from(value: alloc::collections::TryReserveError) -> Self {
        Self::OutOfMemory(Cow::Owned(alloc::format!("{value}")))
    }
}

/// `Result` specialized for [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;
