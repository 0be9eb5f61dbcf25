/*
 * deaconn - absolute deadlines for blocking duplex byte streams
 * This is free and unencumbered software released into the public domain.
 */
use std::mem;
use std::sync::Mutex;
use std::time::{Instant, SystemTime};

use crossbeam_channel::{Receiver, Sender};

use crate::utilities::{instant_of, lock};

/// An absolute point in time after which waiting operations give up
///
/// A `deaconn_rs::Deadline` is either *unset*, in which case it never
/// expires, or set to an absolute wall-clock time. The deadline can be
/// [`set()`](Deadline::set()) again at any time, which supersedes the previous
/// configuration immediately, including for operations that are currently
/// waiting on it.
///
/// Waiters obtain a [`Signal`] via [`done()`](Deadline::done()) and wait for
/// either of its receivers. Once the [`rearmed()`](Signal::rearmed()) receiver
/// becomes ready, the signal is *stale* and must be re-fetched: a stale
/// signal's expiry is never honored, which is checked with
/// [`is_current()`](Deadline::is_current()).
///
/// The expiry is *level-triggered*: after the deadline has elapsed, every
/// freshly fetched signal fires immediately, until a new deadline is set.
#[derive(Debug)]
pub struct Deadline {
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    generation: u64,
    expiry: Option<Instant>,
    rearm: Sender<()>,
    rearmed: Receiver<()>,
}

/// A snapshot of a [`Deadline`], as returned by [`Deadline::done()`]
#[derive(Debug)]
pub struct Signal {
    generation: u64,
    expiry: Receiver<Instant>,
    rearmed: Receiver<()>,
}

impl Deadline {
    pub fn new() -> Self {
        let (rearm, rearmed) = crossbeam_channel::bounded(0);
        Self {
            state: Mutex::new(State {
                generation: 0,
                expiry: None,
                rearm,
                rearmed,
            }),
        }
    }

    /// Set the deadline to the given wall-clock time.
    ///
    /// `None` disables the deadline. A time in the past makes the deadline
    /// expire immediately. Any signal fetched before this call becomes stale.
    pub fn set(&self, time: Option<SystemTime>) {
        let expiry = time.and_then(instant_of);
        let (rearm, rearmed) = crossbeam_channel::bounded(0);

        let mut state = lock(&self.state);
        state.generation = state.generation.wrapping_add(1);
        state.expiry = expiry;
        state.rearmed = rearmed;
        drop(mem::replace(&mut state.rearm, rearm));
    }

    /// Returns the current signal. Must be re-fetched after every `set()`.
    pub fn done(&self) -> Signal {
        let state = lock(&self.state);
        Signal {
            generation: state.generation,
            expiry: match state.expiry {
                Some(instant) => crossbeam_channel::at(instant),
                None => crossbeam_channel::never(),
            },
            rearmed: state.rearmed.clone(),
        }
    }

    /// Returns `true`, if the given signal reflects the latest `set()`.
    pub fn is_current(&self, signal: &Signal) -> bool {
        lock(&self.state).generation == signal.generation
    }

    /// Returns `true`, if the deadline is set and has already elapsed.
    pub fn expired(&self) -> bool {
        self.instant().map_or(false, |instant| Instant::now() >= instant)
    }

    /// The configured expiry, converted to a monotonic `Instant`.
    pub fn instant(&self) -> Option<Instant> {
        lock(&self.state).expiry
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::new()
    }
}

impl Signal {
    /// Becomes ready once the deadline elapses; never, if it is unset.
    pub fn expiry(&self) -> &Receiver<Instant> {
        &self.expiry
    }

    /// Becomes ready (disconnected) once the deadline has been set again.
    pub fn rearmed(&self) -> &Receiver<()> {
        &self.rearmed
    }
}
