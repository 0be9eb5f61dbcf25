/*
 * deaconn - absolute deadlines for blocking duplex byte streams
 * This is free and unencumbered software released into the public domain.
 */
use std::io::{ErrorKind, Result as IoResult};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Sender, select};
use log::{debug, trace};

use crate::canceller::{Lifecycle, Origin};
use crate::transport::Transport;

/// Start the background reader of a connection.
///
/// The reader is the only caller of the underlying `read()`. Every chunk it
/// receives is copied and handed to `queue`; once the stream ends or fails,
/// the connection is shut down. A `read()` that is already blocked on the
/// underlying stream can **not** be interrupted by closing the connection,
/// the reader only refrains from issuing the next one.
pub(crate) fn spawn<T: Transport>(lifecycle: Arc<Lifecycle<T>>, queue: Sender<Vec<u8>>, chunk_size: NonZeroUsize) -> IoResult<()> {
    thread::Builder::new()
        .name(String::from("deaconn-reader"))
        .spawn(move || run(&lifecycle, queue, chunk_size))?;
    Ok(())
}

fn run<T: Transport>(lifecycle: &Lifecycle<T>, queue: Sender<Vec<u8>>, chunk_size: NonZeroUsize) {
    let cancelled = lifecycle.signal();
    let mut buffer = vec![0u8; chunk_size.get()];

    loop {
        if lifecycle.is_closed() {
            trace!("Connection closed, reader exits");
            return;
        }
        match read_chunk(lifecycle.transport(), &mut buffer) {
            Ok(0) => {
                debug!("Underlying stream reached end of stream");
                break;
            },
            Ok(count) => {
                trace!("Received {} bytes", count);
                let chunk = buffer[..count].to_vec();
                select! {
                    send(queue, chunk) -> result => if result.is_err() {
                        trace!("Handoff queue dropped, reader exits");
                        return;
                    },
                    recv(cancelled) -> _ => {
                        trace!("Connection closed, chunk of {} bytes discarded", count);
                        return;
                    },
                }
            },
            Err(error) => {
                debug!("Underlying stream failed: {:?}", error);
                lifecycle.record_failure(error);
                break;
            },
        }
    }

    if let Err(error) = lifecycle.shutdown(Origin::Reader) {
        debug!("Failed to close the underlying stream: {:?}", error);
    }
}

fn read_chunk<T: Transport>(transport: &T, buffer: &mut [u8]) -> IoResult<usize> {
    loop {
        match transport.read(buffer) {
            Err(error) if error.kind() == ErrorKind::Interrupted => (),
            result => return result,
        }
    }
}
