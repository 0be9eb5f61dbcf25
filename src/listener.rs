/*
 * deaconn - absolute deadlines for blocking duplex byte streams
 * This is free and unencumbered software released into the public domain.
 */
use std::io::Result as IoResult;
use std::net::{TcpListener, ToSocketAddrs};

use log::debug;

use crate::{Acceptor, DeadlineStream, Options};

/// A listener that equips every accepted connection with deadline support,
/// akin to [`std::net::TcpListener`](std::net::TcpListener)
///
/// Each connection returned by [`accept()`](DeadlineListener::accept()) is
/// wrapped in a [`deaconn_rs::DeadlineStream`](crate::DeadlineStream), using
/// the [`Options`](crate::Options) of this listener. Errors of the
/// underlying [`Acceptor`](crate::Acceptor) are passed through unchanged.
#[derive(Debug)]
pub struct DeadlineListener<A: Acceptor> {
    acceptor: A,
    options: Options,
}

impl DeadlineListener<TcpListener> {
    pub fn bind<S: ToSocketAddrs>(addr: S) -> IoResult<Self> {
        Ok(Self::new(TcpListener::bind(addr)?))
    }
}

impl<A: Acceptor> DeadlineListener<A> {
    pub fn new(acceptor: A) -> Self {
        Self::with_options(acceptor, Options::default())
    }

    pub fn with_options(acceptor: A, options: Options) -> Self {
        Self {
            acceptor,
            options,
        }
    }

    pub fn accept(&self) -> IoResult<DeadlineStream<A::Stream>> {
        let stream = DeadlineStream::with_options(self.acceptor.accept()?, self.options)?;
        debug!("Connection accepted: {:?} <- {:?}", stream.local_addr(), stream.peer_addr());
        Ok(stream)
    }

    /// An endless iterator over incoming connections, see
    /// [`accept()`](DeadlineListener::accept()).
    pub fn incoming(&self) -> Incoming<'_, A> {
        Incoming {
            listener: self,
        }
    }

    pub fn local_addr(&self) -> IoResult<A::Addr> {
        self.acceptor.local_addr()
    }

    pub fn get_ref(&self) -> &A {
        &self.acceptor
    }

    pub fn close(self) -> IoResult<()> {
        self.acceptor.close()
    }
}

/// Iterator returned by [`DeadlineListener::incoming()`]
#[derive(Debug)]
pub struct Incoming<'a, A: Acceptor> {
    listener: &'a DeadlineListener<A>,
}

impl<'a, A: Acceptor> Iterator for Incoming<'a, A> {
    type Item = IoResult<DeadlineStream<A::Stream>>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.listener.accept())
    }
}
