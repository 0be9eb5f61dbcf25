/*
 * deaconn - absolute deadlines for blocking duplex byte streams
 * This is free and unencumbered software released into the public domain.
 */
use std::io::{Read, Write, Result as IoResult, Error as IoError, ErrorKind};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Instant, SystemTime};

use crossbeam_channel::{Receiver, TryRecvError, select};

use log::{debug, trace, warn};

use crate::canceller::{Canceller, Lifecycle, Origin};
use crate::error::{ERROR_CLOSED, ERROR_END_OF_STREAM, ERROR_TIMEDOUT};
use crate::utilities::lock;
use crate::{Deadline, Options, Transport, pump};

/// A duplex byte stream *with* read and write deadlines, wrapping a
/// [`Transport`] that has no deadline support of its own
///
/// All I/O operations provided by `deaconn_rs::DeadlineStream` are
/// "blocking", but they can be bounded by an *absolute* deadline, set via
/// [`set_read_deadline()`](DeadlineStream::set_read_deadline()),
/// [`set_write_deadline()`](DeadlineStream::set_write_deadline()) or
/// [`set_deadline()`](DeadlineStream::set_deadline()). A deadline applies to
/// all future *and* pending operations of that direction, not just the
/// immediately following call. Once exceeded, operations fail with a
/// [`DeadlineError::TimedOut`](crate::DeadlineError::TimedOut) error, which
/// can be tested with [`is_timeout()`](crate::is_timeout()). Setting a new
/// deadline in the future makes the stream usable again; `None` disables the
/// deadline.
///
/// Construction starts a background reader thread that continuously reads
/// from the underlying stream, in chunks of up to
/// [`Options::chunk_size()`](crate::Options::chunk_size()) bytes. Bytes of a
/// chunk that do not fit into the caller's buffer are kept for the next
/// `read()`, so every byte is delivered exactly once and in order. Each
/// `write()` is carried out by a short-lived thread; the caller only waits
/// for it until the write deadline expires or the stream is closed.
///
/// **Caution:** The underlying `write()` can not be aborted. A write that
/// failed with a timeout may still complete partially or fully in the
/// background. Subsequent writes are queued behind it.
///
/// `read()` returns `Ok(0)` once the stream has been closed or the
/// underlying stream has ended. If the underlying stream *failed*, its error
/// is reported by the first `read()` that reaches the end of the stream.
///
/// Reads and writes are each serialized internally, so `&DeadlineStream`
/// can be shared between threads; the order of concurrent calls in the same
/// direction is unspecified, though.
#[derive(Debug)]
pub struct DeadlineStream<T: Transport> {
    lifecycle: Arc<Lifecycle<T>>,
    inbox: Mutex<Inbox>,
    outbox: Mutex<()>,
    read_deadline: Deadline,
    write_deadline: Deadline,
    options: Options,
}

/// Read-side state: the handoff queue plus the leftover of the last chunk.
#[derive(Debug)]
struct Inbox {
    queue: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    position: usize,
}

impl<T: Transport> DeadlineStream<T> {
    pub fn new(transport: T) -> IoResult<Self> {
        Self::with_options(transport, Options::default())
    }

    pub fn with_options(transport: T, options: Options) -> IoResult<Self> {
        let lifecycle = Arc::new(Lifecycle::new(transport));
        let (sender, receiver) = crossbeam_channel::bounded(options.queue_depth());
        pump::spawn(Arc::clone(&lifecycle), sender, options.chunk_size())?;

        Ok(Self {
            lifecycle,
            inbox: Mutex::new(Inbox::new(receiver)),
            outbox: Mutex::new(()),
            read_deadline: Deadline::new(),
            write_deadline: Deadline::new(),
            options,
        })
    }

    pub fn canceller(&self) -> Canceller<T> {
        Canceller::from(Arc::clone(&self.lifecycle))
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The underlying stream. Reading from it directly races with the
    /// background reader and loses data.
    pub fn get_ref(&self) -> &T {
        self.lifecycle.transport()
    }

    pub fn local_addr(&self) -> IoResult<T::Addr> {
        self.lifecycle.transport().local_addr()
    }

    pub fn peer_addr(&self) -> IoResult<T::Addr> {
        self.lifecycle.transport().peer_addr()
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle.is_closed()
    }

    // ~~~~~~~~~~~~~~~~~~~~~~~
    // Deadline functions
    // ~~~~~~~~~~~~~~~~~~~~~~~

    /// Set both the read and the write deadline, as if by calling
    /// [`set_read_deadline()`](Self::set_read_deadline()) and then
    /// [`set_write_deadline()`](Self::set_write_deadline()).
    pub fn set_deadline(&self, time: Option<SystemTime>) -> IoResult<()> {
        self.set_read_deadline(time)?;
        self.set_write_deadline(time)
    }

    /// Set the deadline for future and currently pending reads. `None`
    /// means that reads do not time out.
    ///
    /// Fails with [`DeadlineError::Closed`](crate::DeadlineError::Closed), if
    /// the stream has already been closed.
    pub fn set_read_deadline(&self, time: Option<SystemTime>) -> IoResult<()> {
        if self.lifecycle.is_closed() {
            return ERROR_CLOSED.result();
        }
        self.read_deadline.set(time);
        Ok(())
    }

    /// Set the deadline for future and currently pending writes. `None`
    /// means that writes do not time out.
    ///
    /// Fails with [`DeadlineError::Closed`](crate::DeadlineError::Closed), if
    /// the stream has already been closed.
    pub fn set_write_deadline(&self, time: Option<SystemTime>) -> IoResult<()> {
        if self.lifecycle.is_closed() {
            return ERROR_CLOSED.result();
        }
        self.write_deadline.set(time);
        Ok(())
    }

    pub fn read_deadline(&self) -> Option<Instant> {
        self.read_deadline.instant()
    }

    pub fn write_deadline(&self) -> Option<Instant> {
        self.write_deadline.instant()
    }

    // ~~~~~~~~~~~~~~~~~~~~~~~
    // Close functions
    // ~~~~~~~~~~~~~~~~~~~~~~~

    /// Close the underlying stream and wake up all pending reads and writes.
    ///
    /// Buffered data that has not been read yet is discarded. Only the first
    /// call has an effect; its error, if any, comes from the underlying
    /// stream.
    pub fn close(&self) -> IoResult<()> {
        let result = self.lifecycle.shutdown(Origin::Caller);
        if let Ok(mut inbox) = self.inbox.try_lock() {
            inbox.release();
        }
        result.map(|_| ())
    }

    // ~~~~~~~~~~~~~~~~~~~~~~~
    // Read functions
    // ~~~~~~~~~~~~~~~~~~~~~~~

    fn read_deadline_aware(&self, buffer: &mut [u8]) -> IoResult<usize> {
        if buffer.is_empty() {
            return Ok(0);
        }

        let mut inbox = lock(&self.inbox);

        if self.lifecycle.closed_by() == Some(Origin::Caller) {
            return self.end_of_stream(&mut inbox);
        }

        if inbox.has_pending() {
            return Ok(inbox.drain_into(buffer));
        }

        let queue = inbox.queue.clone();
        let cancelled = self.lifecycle.signal();

        loop {
            if self.read_deadline.expired() {
                return ERROR_TIMEDOUT.result();
            }

            match queue.try_recv() {
                Ok(chunk) => return Ok(inbox.deliver(chunk, buffer)),
                Err(TryRecvError::Disconnected) => return self.end_of_stream(&mut inbox),
                Err(TryRecvError::Empty) => (),
            }

            if self.lifecycle.is_closed() {
                return self.end_of_stream(&mut inbox);
            }

            let deadline = self.read_deadline.done();
            select! {
                recv(queue) -> message => return match message {
                    Ok(chunk) => Ok(inbox.deliver(chunk, buffer)),
                    Err(_) => self.end_of_stream(&mut inbox),
                },
                recv(cancelled) -> _ => trace!("Read woken up by close"),
                recv(deadline.expiry()) -> _ => if self.read_deadline.is_current(&deadline) {
                    return ERROR_TIMEDOUT.result();
                },
                recv(deadline.rearmed()) -> _ => trace!("Read deadline has been reset"),
            }
        }
    }

    fn end_of_stream(&self, inbox: &mut Inbox) -> IoResult<usize> {
        if self.lifecycle.closed_by() == Some(Origin::Caller) {
            inbox.release();
        }
        match self.lifecycle.take_failure() {
            Some(error) => Err(error),
            None => Ok(0),
        }
    }

    // ~~~~~~~~~~~~~~~~~~~~~~~
    // Write functions
    // ~~~~~~~~~~~~~~~~~~~~~~~

    fn write_deadline_aware(&self, buffer: &[u8]) -> IoResult<usize> {
        if buffer.is_empty() {
            return Ok(0);
        }

        let _guard = lock(&self.outbox);

        if self.lifecycle.is_closed() {
            return ERROR_END_OF_STREAM.result();
        }
        if self.write_deadline.expired() {
            return ERROR_TIMEDOUT.result();
        }

        let completion = self.spawn_write(buffer.to_vec())?;
        let cancelled = self.lifecycle.signal();

        loop {
            let deadline = self.write_deadline.done();
            select! {
                recv(completion) -> result => return match result {
                    Ok(result) => result,
                    Err(_) => ERROR_END_OF_STREAM.result(),
                },
                recv(cancelled) -> _ => return ERROR_END_OF_STREAM.result(),
                recv(deadline.expiry()) -> _ => if self.write_deadline.is_current(&deadline) {
                    debug!("Write deadline exceeded, {} bytes may still be written in the background", buffer.len());
                    return ERROR_TIMEDOUT.result();
                },
                recv(deadline.rearmed()) -> _ => trace!("Write deadline has been reset"),
            }
        }
    }

    fn spawn_write(&self, data: Vec<u8>) -> IoResult<Receiver<IoResult<usize>>> {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let lifecycle = Arc::clone(&self.lifecycle);
        thread::Builder::new()
            .name(String::from("deaconn-writer"))
            .spawn(move || {
                let _serialized = lock(lifecycle.write_lock());
                let result = match lifecycle.is_closed() {
                    true => ERROR_END_OF_STREAM.result(),
                    false => write_fully(lifecycle.transport(), &data),
                };
                if sender.send(result).is_err() {
                    trace!("Write result of {} bytes was abandoned", data.len());
                }
            })?;
        Ok(receiver)
    }

    fn flush_transport(&self) -> IoResult<()> {
        if self.lifecycle.is_closed() {
            return Ok(());
        }
        self.lifecycle.transport().flush()
    }
}

fn write_fully<T: Transport>(transport: &T, mut buffer: &[u8]) -> IoResult<usize> {
    let total = buffer.len();
    while !buffer.is_empty() {
        match transport.write(buffer) {
            Ok(0) => {
                debug!("Underlying stream accepted {} of {} bytes", total - buffer.len(), total);
                return Err(IoError::from(ErrorKind::WriteZero));
            },
            Ok(count) => buffer = &buffer[count..],
            Err(error) if error.kind() == ErrorKind::Interrupted => (),
            Err(error) => {
                debug!("Underlying stream failed after {} of {} bytes: {:?}", total - buffer.len(), total, error);
                return Err(error);
            },
        }
    }
    Ok(total)
}

impl Inbox {
    fn new(queue: Receiver<Vec<u8>>) -> Self {
        Self {
            queue,
            pending: Vec::new(),
            position: 0,
        }
    }

    fn has_pending(&self) -> bool {
        self.position < self.pending.len()
    }

    fn drain_into(&mut self, buffer: &mut [u8]) -> usize {
        let remaining = &self.pending[self.position..];
        let count = remaining.len().min(buffer.len());
        buffer[..count].copy_from_slice(&remaining[..count]);
        self.position += count;
        if !self.has_pending() {
            self.pending = Vec::new();
            self.position = 0;
        }
        count
    }

    fn deliver(&mut self, chunk: Vec<u8>, buffer: &mut [u8]) -> usize {
        debug_assert!(!self.has_pending());
        self.pending = chunk;
        self.position = 0;
        self.drain_into(buffer)
    }

    fn release(&mut self) {
        self.pending = Vec::new();
        self.position = 0;
        while self.queue.try_recv().is_ok() { }
    }
}

impl<T: Transport> Read for DeadlineStream<T> {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        self.read_deadline_aware(buf)
    }
}

impl<T: Transport> Read for &DeadlineStream<T> {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        self.read_deadline_aware(buf)
    }
}

impl<T: Transport> Write for DeadlineStream<T> {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        self.write_deadline_aware(buf)
    }

    fn flush(&mut self) -> IoResult<()> {
        self.flush_transport()
    }
}

impl<T: Transport> Write for &DeadlineStream<T> {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        self.write_deadline_aware(buf)
    }

    fn flush(&mut self) -> IoResult<()> {
        self.flush_transport()
    }
}

impl<T: Transport> Drop for DeadlineStream<T> {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            warn!("Failed to close the underlying stream: {:?}", error);
        }
    }
}
