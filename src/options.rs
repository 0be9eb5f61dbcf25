/*
 * deaconn - absolute deadlines for blocking duplex byte streams
 * This is free and unencumbered software released into the public domain.
 */
use std::num::NonZeroUsize;

/// Size of the background reader's scratch buffer (5 MiB)
pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(5 * 1024 * 1024) {
    Some(size) => size,
    None => panic!("chunk size must not be zero"),
};

/// Number of chunks the background reader may read ahead
pub const DEFAULT_QUEUE_DEPTH: usize = 1;

/// Tuning parameters of a [`deaconn_rs::DeadlineStream`](crate::DeadlineStream)
///
/// `chunk_size` bounds how many bytes the background reader requests from
/// the underlying stream per call, and therefore the memory per read. The
/// `queue_depth` is the number of chunks that can be buffered in the handoff
/// queue while no `read()` is waiting; a depth of zero makes every chunk a
/// direct rendezvous with a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    chunk_size: NonZeroUsize,
    queue_depth: usize,
}

impl Options {
    pub const fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }

    pub const fn with_chunk_size(self, chunk_size: NonZeroUsize) -> Self {
        Self { chunk_size, ..self }
    }

    pub const fn with_queue_depth(self, queue_depth: usize) -> Self {
        Self { queue_depth, ..self }
    }

    pub const fn chunk_size(&self) -> NonZeroUsize {
        self.chunk_size
    }

    pub const fn queue_depth(&self) -> usize {
        self.queue_depth
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}
