/*
 * deaconn - absolute deadlines for blocking duplex byte streams
 * This is free and unencumbered software released into the public domain.
 */
#![allow(dead_code)]

use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use crossbeam_channel::{Receiver, Sender, select};

use deaconn_rs::Transport;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn past() -> Option<SystemTime> {
    Some(SystemTime::now() - Duration::from_secs(1))
}

pub fn after(millis: u64) -> Option<SystemTime> {
    Some(SystemTime::now() + Duration::from_millis(millis))
}

/// Wait until `condition` holds, for at most five seconds.
pub fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(5) {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

pub fn tcp_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    let (server, _addr) = listener.accept().unwrap();
    (client, server)
}

/// In-memory transport, driven by a [`MockPeer`]. Reads deliver the chunks
/// the peer sends, exactly as sent (as long as they fit). Writes are
/// recorded, optionally held back until the peer opens the gate, or fail.
#[derive(Debug)]
pub struct MockTransport {
    reads: Receiver<IoResult<Vec<u8>>>,
    leftover: Mutex<Vec<u8>>,
    written: Arc<Mutex<Vec<u8>>>,
    gate: Option<Receiver<()>>,
    write_error: Option<ErrorKind>,
    closed: Arc<AtomicBool>,
    close_trigger: Mutex<Option<Sender<()>>>,
    close_signal: Receiver<()>,
}

pub struct MockPeer {
    reads: Option<Sender<IoResult<Vec<u8>>>>,
    written: Arc<Mutex<Vec<u8>>>,
    gate: Option<Sender<()>>,
    closed: Arc<AtomicBool>,
}

pub fn mock() -> (MockTransport, MockPeer) {
    build(false, None)
}

pub fn gated_mock() -> (MockTransport, MockPeer) {
    build(true, None)
}

pub fn failing_mock(kind: ErrorKind) -> (MockTransport, MockPeer) {
    build(false, Some(kind))
}

fn build(gated: bool, write_error: Option<ErrorKind>) -> (MockTransport, MockPeer) {
    let (read_tx, read_rx) = crossbeam_channel::unbounded();
    let (close_tx, close_rx) = crossbeam_channel::bounded(0);
    let (gate_tx, gate_rx) = match gated {
        true => {
            let (gate_tx, gate_rx) = crossbeam_channel::unbounded();
            (Some(gate_tx), Some(gate_rx))
        },
        false => (None, None),
    };
    let written = Arc::new(Mutex::new(Vec::new()));
    let closed = Arc::new(AtomicBool::new(false));

    let transport = MockTransport {
        reads: read_rx,
        leftover: Mutex::new(Vec::new()),
        written: written.clone(),
        gate: gate_rx,
        write_error,
        closed: closed.clone(),
        close_trigger: Mutex::new(Some(close_tx)),
        close_signal: close_rx,
    };
    let peer = MockPeer {
        reads: Some(read_tx),
        written,
        gate: gate_tx,
        closed,
    };
    (transport, peer)
}

impl MockPeer {
    pub fn send(&self, data: &[u8]) {
        assert!(!data.is_empty());
        if let Some(reads) = &self.reads {
            reads.send(Ok(data.to_vec())).unwrap();
        }
    }

    pub fn fail(&self, kind: ErrorKind) {
        if let Some(reads) = &self.reads {
            reads.send(Err(IoError::new(kind, "mock failure"))).unwrap();
        }
    }

    /// The transport's reads report the end of the stream, after all data
    /// sent so far has been read.
    pub fn hang_up(&mut self) {
        self.reads.take();
    }

    /// Let all held-back writes proceed.
    pub fn open_gate(&mut self) {
        self.gate.take();
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    type Addr = &'static str;

    fn read(&self, buffer: &mut [u8]) -> IoResult<usize> {
        let mut leftover = self.leftover.lock().unwrap();
        if leftover.is_empty() {
            select! {
                recv(self.reads) -> message => match message {
                    Ok(Ok(chunk)) => *leftover = chunk,
                    Ok(Err(error)) => return Err(error),
                    Err(_) => return Ok(0),
                },
                recv(self.close_signal) -> _ => return Ok(0),
            }
        }
        let count = leftover.len().min(buffer.len());
        buffer[..count].copy_from_slice(&leftover[..count]);
        leftover.drain(..count);
        Ok(count)
    }

    fn write(&self, buffer: &[u8]) -> IoResult<usize> {
        if let Some(gate) = &self.gate {
            let _ = gate.recv();
        }
        if let Some(kind) = self.write_error {
            return Err(IoError::new(kind, "mock write failure"));
        }
        self.written.lock().unwrap().extend_from_slice(buffer);
        Ok(buffer.len())
    }

    fn close(&self) -> IoResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.close_trigger.lock().unwrap().take();
        Ok(())
    }

    fn local_addr(&self) -> IoResult<&'static str> {
        Ok("mock:local")
    }

    fn peer_addr(&self) -> IoResult<&'static str> {
        Ok("mock:peer")
    }
}
