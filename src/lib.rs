/*
 * deaconn - absolute deadlines for blocking duplex byte streams
 * This is free and unencumbered software released into the public domain.
 */

//! **deaconn** retrofits absolute ***deadlines*** onto "blocking" duplex byte
//! streams whose underlying transport has no timeout support of its own.
//! 
//! A [`deaconn_rs::DeadlineStream`](DeadlineStream) wraps any
//! [`Transport`] – [`std::net::TcpStream`](std::net::TcpStream) and
//! [`std::os::unix::net::UnixStream`](std::os::unix::net::UnixStream) are
//! supported out of the box – and implements [`std::io::Read`] and
//! [`std::io::Write`] on top of it. In addition, a read deadline and a write
//! deadline can be set at any time: an *absolute* point in time after which
//! pending and future operations fail with a
//! [`DeadlineError::TimedOut`](DeadlineError::TimedOut) error instead of
//! blocking forever. Setting a deadline in the future makes the stream usable
//! again after a time-out. This is the contract that higher-level protocol
//! layers (connection hijacking, protocol upgrades, idle timeouts) expect
//! from every stream.
//! 
//! The deadlines are emulated: a background thread per connection performs
//! the blocking reads and hands the data over through a bounded channel,
//! while each write is carried out by a short-lived thread that the caller
//! stops waiting for once the deadline expires. The underlying operations
//! themselves are **never** aborted – a timed-out write may still complete in
//! the background!
//! 
//! # Usage
//! 
//! Wrap an existing connection with
//! [`DeadlineStream::new()`](DeadlineStream::new()), or let a
//! [`deaconn_rs::DeadlineListener`](DeadlineListener) wrap every accepted
//! connection. A [`deaconn_rs::Canceller`](Canceller), obtained via
//! [`DeadlineStream::canceller()`](DeadlineStream::canceller()), closes the
//! connection from another thread and thereby wakes up all pending
//! operations.
//! 
//! ```no_run
//! use std::io::Read;
//! use std::time::{Duration, SystemTime};
//! 
//! use deaconn_rs::{DeadlineListener, is_timeout};
//! 
//! let listener = DeadlineListener::bind("127.0.0.1:8080")?;
//! let mut stream = listener.accept()?;
//! stream.set_read_deadline(Some(SystemTime::now() + Duration::from_secs(5)))?;
//! 
//! let mut buffer = [0u8; 1024];
//! match stream.read(&mut buffer) {
//!     Ok(count) => println!("received {} bytes", count),
//!     Err(error) if is_timeout(&error) => println!("nothing received in time"),
//!     Err(error) => return Err(error),
//! }
//! # Ok::<(), std::io::Error>(())
//! ```

mod canceller;
mod deadline;
mod error;
mod listener;
mod options;
mod pump;
mod stream;
mod transport;
mod utilities;

pub use canceller::Canceller;
pub use deadline::{Deadline, Signal};
pub use error::{DeadlineError, is_closed, is_timeout};
pub use listener::{DeadlineListener, Incoming};
pub use options::{DEFAULT_CHUNK_SIZE, DEFAULT_QUEUE_DEPTH, Options};
pub use stream::DeadlineStream;
pub use transport::{Acceptor, Transport};
