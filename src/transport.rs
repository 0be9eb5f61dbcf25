/*
 * deaconn - absolute deadlines for blocking duplex byte streams
 * This is free and unencumbered software released into the public domain.
 */
use std::fmt::Debug;
use std::io::{Read, Write, Result as IoResult, ErrorKind};
use std::net::{SocketAddr, Shutdown, TcpListener, TcpStream};

/// The underlying duplex byte stream, as wrapped by
/// [`deaconn_rs::DeadlineStream`](crate::DeadlineStream)
///
/// All operations are "blocking" and can **not** be cancelled. They take a
/// *shared* reference, because the background reader, the write tasks and
/// [`close()`](Transport::close()) reach the same stream concurrently; this
/// is the same contract as `impl Read for &std::net::TcpStream`.
///
/// [`close()`](Transport::close()) should unblock a pending `read()`, where
/// the platform allows it. Otherwise the background reader lingers until the
/// stream returns on its own.
pub trait Transport: Send + Sync + 'static {
    type Addr: Debug + Clone + Send + 'static;

    fn read(&self, buffer: &mut [u8]) -> IoResult<usize>;

    fn write(&self, buffer: &[u8]) -> IoResult<usize>;

    fn flush(&self) -> IoResult<()> {
        Ok(())
    }

    fn close(&self) -> IoResult<()>;

    fn local_addr(&self) -> IoResult<Self::Addr>;

    fn peer_addr(&self) -> IoResult<Self::Addr>;
}

/// A source of new [`Transport`] connections, e.g. a listening socket
///
/// Used by [`deaconn_rs::DeadlineListener`](crate::DeadlineListener).
pub trait Acceptor: Send + 'static {
    type Stream: Transport;
    type Addr: Debug;

    fn accept(&self) -> IoResult<Self::Stream>;

    fn local_addr(&self) -> IoResult<Self::Addr>;

    /// Stop accepting. The default does nothing; the socket is released when
    /// the acceptor is dropped.
    fn close(&self) -> IoResult<()> {
        Ok(())
    }
}

fn shutdown_result(result: IoResult<()>) -> IoResult<()> {
    match result {
        Err(error) if error.kind() == ErrorKind::NotConnected => Ok(()),
        other => other,
    }
}

impl Transport for TcpStream {
    type Addr = SocketAddr;

    fn read(&self, buffer: &mut [u8]) -> IoResult<usize> {
        Read::read(&mut &*self, buffer)
    }

    fn write(&self, buffer: &[u8]) -> IoResult<usize> {
        Write::write(&mut &*self, buffer)
    }

    fn flush(&self) -> IoResult<()> {
        Write::flush(&mut &*self)
    }

    fn close(&self) -> IoResult<()> {
        shutdown_result(self.shutdown(Shutdown::Both))
    }

    fn local_addr(&self) -> IoResult<SocketAddr> {
        TcpStream::local_addr(self)
    }

    fn peer_addr(&self) -> IoResult<SocketAddr> {
        TcpStream::peer_addr(self)
    }
}

impl Acceptor for TcpListener {
    type Stream = TcpStream;
    type Addr = SocketAddr;

    fn accept(&self) -> IoResult<TcpStream> {
        TcpListener::accept(self).map(|(stream, _addr)| stream)
    }

    fn local_addr(&self) -> IoResult<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

#[cfg(unix)]
mod unix {
    use std::io::{Read, Write, Result as IoResult};
    use std::net::Shutdown;
    use std::os::unix::net::{SocketAddr, UnixListener, UnixStream};

    use super::{Acceptor, Transport, shutdown_result};

    impl Transport for UnixStream {
        type Addr = SocketAddr;

        fn read(&self, buffer: &mut [u8]) -> IoResult<usize> {
            Read::read(&mut &*self, buffer)
        }

        fn write(&self, buffer: &[u8]) -> IoResult<usize> {
            Write::write(&mut &*self, buffer)
        }

        fn flush(&self) -> IoResult<()> {
            Write::flush(&mut &*self)
        }

        fn close(&self) -> IoResult<()> {
            shutdown_result(self.shutdown(Shutdown::Both))
        }

        fn local_addr(&self) -> IoResult<SocketAddr> {
            UnixStream::local_addr(self)
        }

        fn peer_addr(&self) -> IoResult<SocketAddr> {
            UnixStream::peer_addr(self)
        }
    }

    impl Acceptor for UnixListener {
        type Stream = UnixStream;
        type Addr = SocketAddr;

        fn accept(&self) -> IoResult<UnixStream> {
            UnixListener::accept(self).map(|(stream, _addr)| stream)
        }

        fn local_addr(&self) -> IoResult<SocketAddr> {
            UnixListener::local_addr(self)
        }
    }
}
