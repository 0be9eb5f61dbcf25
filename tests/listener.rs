/*
 * deaconn - absolute deadlines for blocking duplex byte streams
 * This is free and unencumbered software released into the public domain.
 */
mod common;

use std::io::{Error as IoError, ErrorKind, Read, Result as IoResult, Write};
use std::net::{Ipv4Addr, TcpStream};
use std::num::NonZeroUsize;
use std::thread;

use deaconn_rs::{Acceptor, DeadlineListener, Options, is_timeout};

use common::{MockTransport, after, init, mock};

#[test]
fn accepted_connections_have_deadlines() {
    init();
    let listener = DeadlineListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let mut client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    let mut server = listener.accept().unwrap();
    assert_eq!(server.peer_addr().unwrap(), client.local_addr().unwrap());

    server.set_read_deadline(after(50)).unwrap();
    assert!(is_timeout(&server.read(&mut [0u8; 4]).unwrap_err()));

    server.set_deadline(after(10_000)).unwrap();
    client.write_all(b"ping").unwrap();
    let mut buffer = [0u8; 4];
    server.read_exact(&mut buffer).unwrap();
    assert_eq!(&buffer, b"ping");

    server.write_all(b"pong").unwrap();
    client.read_exact(&mut buffer).unwrap();
    assert_eq!(&buffer, b"pong");

    server.close().unwrap();
    assert_eq!(client.read(&mut buffer).unwrap(), 0);
    listener.close().unwrap();
}

#[test]
fn listener_options_apply_to_accepted_streams() {
    init();
    let acceptor = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let options = Options::new()
        .with_chunk_size(NonZeroUsize::new(2).unwrap())
        .with_queue_depth(0);
    let listener = DeadlineListener::with_options(acceptor, options);
    let mut client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();

    let mut server = listener.incoming().next().unwrap().unwrap();
    assert_eq!(server.options(), &options);

    client.write_all(b"abcde").unwrap();
    let mut buffer = [0u8; 5];
    server.set_read_deadline(after(10_000)).unwrap();
    server.read_exact(&mut buffer).unwrap();
    assert_eq!(&buffer, b"abcde");
}

/// Hands out mock connections until exhausted, then fails.
struct MockAcceptor {
    connections: std::sync::Mutex<Vec<MockTransport>>,
}

impl Acceptor for MockAcceptor {
    type Stream = MockTransport;
    type Addr = &'static str;

    fn accept(&self) -> IoResult<MockTransport> {
        self.connections.lock().unwrap().pop()
            .ok_or_else(|| IoError::new(ErrorKind::Other, "no more connections"))
    }

    fn local_addr(&self) -> IoResult<&'static str> {
        Ok("mock:listener")
    }
}

#[test]
fn acceptor_errors_pass_through() {
    init();
    let (transport, peer) = mock();
    let listener = DeadlineListener::new(MockAcceptor {
        connections: std::sync::Mutex::new(vec![transport]),
    });
    assert_eq!(listener.local_addr().unwrap(), "mock:listener");

    let mut stream = listener.accept().unwrap();
    peer.send(b"hi");
    let mut buffer = [0u8; 2];
    stream.read_exact(&mut buffer).unwrap();
    assert_eq!(&buffer, b"hi");

    let error = listener.accept().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Other);
    assert_eq!(error.to_string(), "no more connections");
    assert!(listener.get_ref().connections.lock().unwrap().is_empty());
    listener.close().unwrap();
}

#[cfg(unix)]
#[test]
fn unix_sockets_are_supported() {
    use std::os::unix::net::{UnixListener, UnixStream};

    init();
    let path = std::env::temp_dir().join(format!("deaconn-{}-{:?}.sock", std::process::id(), thread::current().id()));
    let _ = std::fs::remove_file(&path);

    let listener = DeadlineListener::new(UnixListener::bind(&path).unwrap());
    let mut client = UnixStream::connect(&path).unwrap();
    let mut server = listener.accept().unwrap();

    server.set_read_deadline(after(50)).unwrap();
    assert!(is_timeout(&server.read(&mut [0u8; 4]).unwrap_err()));

    server.set_read_deadline(None).unwrap();
    let writer = thread::spawn(move || {
        client.write_all(b"unix").unwrap();
        client
    });
    let mut buffer = [0u8; 4];
    server.read_exact(&mut buffer).unwrap();
    assert_eq!(&buffer, b"unix");
    drop(writer.join().unwrap());

    let mut rest = Vec::new();
    server.read_to_end(&mut rest).unwrap();
    assert!(rest.is_empty());

    drop(server);
    drop(listener);
    let _ = std::fs::remove_file(&path);
}
