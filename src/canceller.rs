/*
 * deaconn - absolute deadlines for blocking duplex byte streams
 * This is free and unencumbered software released into the public domain.
 */
use std::io::{Error as IoError, Result as IoResult};
use std::sync::{Arc, Mutex, OnceLock};

use crossbeam_channel::Receiver;
use log::debug;

use crate::transport::Transport;
use crate::utilities::{Flag, lock};

/// Who tore the connection down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// `close()`, a [`Canceller`] or `Drop`
    Caller,
    /// The background reader, after the underlying stream ended or failed
    Reader,
}

/// Shared state of one wrapped connection: the underlying stream plus the
/// at-most-once teardown logic.
#[derive(Debug)]
pub(crate) struct Lifecycle<T> {
    transport: T,
    origin: OnceLock<Origin>,
    cancelled: Flag,
    failure: Mutex<Option<IoError>>,
    write_lock: Mutex<()>,
}

impl<T: Transport> Lifecycle<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            origin: OnceLock::new(),
            cancelled: Flag::new(),
            failure: Mutex::new(None),
            write_lock: Mutex::new(()),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Serializes writes to the underlying stream, so that a write that was
    /// abandoned after a timeout can not interleave with a later one.
    pub fn write_lock(&self) -> &Mutex<()> {
        &self.write_lock
    }

    /// Tear the connection down. Only the first call has an effect and
    /// returns `Ok(true)`; the result of closing the underlying stream is
    /// passed through.
    pub fn shutdown(&self, origin: Origin) -> IoResult<bool> {
        if self.origin.set(origin).is_err() {
            return Ok(false);
        }
        debug!("Shutting down connection, requested by {:?}", origin);
        self.cancelled.raise();
        self.transport.close().map(|_| true)
    }

    pub fn is_closed(&self) -> bool {
        self.cancelled.check()
    }

    pub fn closed_by(&self) -> Option<Origin> {
        self.origin.get().copied()
    }

    /// Becomes ready (disconnected) once the connection is shut down.
    pub fn signal(&self) -> Receiver<()> {
        self.cancelled.signal()
    }

    /// Remember the error that terminated the background reader. Ignored if
    /// the connection was already closed, because then the error is most
    /// likely a consequence of the close.
    pub fn record_failure(&self, error: IoError) {
        if !self.is_closed() {
            *lock(&self.failure) = Some(error);
        }
    }

    /// Hand out the recorded reader failure, exactly once.
    pub fn take_failure(&self) -> Option<IoError> {
        match self.closed_by() {
            Some(Origin::Reader) => lock(&self.failure).take(),
            _ => None,
        }
    }
}

/// A handle that can be used to close a
/// [`deaconn_rs::DeadlineStream`](crate::DeadlineStream) from another thread
///
/// Calling [`cancel()`](Canceller::cancel()) has the same effect as calling
/// [`DeadlineStream::close()`](crate::DeadlineStream::close()): the
/// underlying stream is closed, and every `read()` or `write()` that is
/// currently waiting returns *immediately*. Pending reads report the end of
/// the stream, pending writes fail with an
/// [`DeadlineError::EndOfStream`](crate::DeadlineError::EndOfStream) error.
///
/// There is **no** guarantee that a blocking operation already in progress
/// on the underlying stream is actually aborted; it is merely no longer
/// waited for. This is useful, for example, to implement a Ctrl+C (SIGINT)
/// handler.
#[derive(Debug)]
pub struct Canceller<T: Transport> {
    lifecycle: Arc<Lifecycle<T>>,
}

impl<T: Transport> Canceller<T> {
    pub(crate) fn from(lifecycle: Arc<Lifecycle<T>>) -> Self {
        Self {
            lifecycle,
        }
    }

    /// Close the connection. Returns `Ok(false)` if it was already closed.
    pub fn cancel(&self) -> IoResult<bool> {
        self.lifecycle.shutdown(Origin::Caller)
    }

    pub fn cancelled(&self) -> bool {
        self.lifecycle.is_closed()
    }
}

impl<T: Transport> Clone for Canceller<T> {
    fn clone(&self) -> Self {
        Self::from(Arc::clone(&self.lifecycle))
    }
}
