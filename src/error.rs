/*
 * deaconn - absolute deadlines for blocking duplex byte streams
 * This is free and unencumbered software released into the public domain.
 */
use std::error::Error;
use std::fmt::{Display, Debug, Formatter};
use std::io::{ErrorKind, Error as IoError, Result as IoResult};

pub(crate) const ERROR_CLOSED:        ConstError = ConstError::of(ErrorKind::NotConnected,  DeadlineError::Closed);
pub(crate) const ERROR_TIMEDOUT:      ConstError = ConstError::of(ErrorKind::TimedOut,      DeadlineError::TimedOut);
pub(crate) const ERROR_END_OF_STREAM: ConstError = ConstError::of(ErrorKind::UnexpectedEof, DeadlineError::EndOfStream);

/// The error type for **deaconn** operations
/// 
/// All operations return a [`std::io::Result`](std::io::Result). For
/// ***deaconn**-specific* failures, the returned `std::io::Error` contains the
/// suitable variant of `deaconn_rs::DeadlineError` as its "inner" error, so
/// that it can be recognized with [`is_timeout()`] or [`is_closed()`].
///
/// Errors from the underlying transport are passed through "as-is"; do
/// **not** expect that an "inner" `deaconn_rs::DeadlineError` is always
/// available!
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum DeadlineError {
    /// The connection has already been closed, so its deadlines can no longer
    /// be changed.  
    /// The [`kind()`](std::io::Error::kind()) of this error
    /// is:&ensp;**`ErrorKind::NotConnected`**
    Closed,
    /// The read or write deadline elapsed before the operation completed. A
    /// write may still complete in the background!  
    /// The [`kind()`](std::io::Error::kind()) of this error
    /// is:&ensp;**`ErrorKind::TimedOut`**
    TimedOut,
    /// The connection was closed while a write was pending, or before it
    /// started.  
    /// The [`kind()`](std::io::Error::kind()) of this error
    /// is:&ensp;**`ErrorKind::UnexpectedEof`**
    EndOfStream,
}

pub(crate) struct ConstError {
    kind: ErrorKind,
    inner: DeadlineError,
}

impl ConstError {
    const fn of(kind: ErrorKind, inner: DeadlineError) -> Self {
        Self {
            kind,
            inner,
        }
    }
    
    pub fn error(&self) -> IoError {
        IoError::new(self.kind, self.inner)
    }

    pub fn result<T>(&self) -> IoResult<T> {
        Err(self.error())
    }
}

impl DeadlineError {
    /// Extract the `deaconn_rs::DeadlineError` wrapped by an I/O error, if any.
    pub fn of(error: &IoError) -> Option<Self> {
        error.get_ref().and_then(|inner| inner.downcast_ref::<Self>()).copied()
    }
}

/// Returns `true`, if the given error was caused by an elapsed read or write
/// deadline.
pub fn is_timeout(error: &IoError) -> bool {
    DeadlineError::of(error) == Some(DeadlineError::TimedOut)
}

/// Returns `true`, if the given error was caused by using a connection that
/// has already been closed.
pub fn is_closed(error: &IoError) -> bool {
    DeadlineError::of(error) == Some(DeadlineError::Closed)
}

impl Debug for DeadlineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "DeadlineError::Closed"),
            Self::TimedOut => write!(f, "DeadlineError::TimedOut"),
            Self::EndOfStream => write!(f, "DeadlineError::EndOfStream"),
        }
    }
}

impl Display for DeadlineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DeadlineError::Closed => write!(f, "The connection has already been closed!"),
            DeadlineError::TimedOut => write!(f, "The deadline has been exceeded!"),
            DeadlineError::EndOfStream => write!(f, "The connection reached the end of the stream!"),
        }
    }
}

impl Error for DeadlineError { }
