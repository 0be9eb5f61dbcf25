/*
 * deaconn - absolute deadlines for blocking duplex byte streams
 * This is free and unencumbered software released into the public domain.
 */
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender};

use super::lock;

/// One-shot cancellation signal. Waiters `select!` on the receiver returned
/// by [`signal()`](Flag::signal()), which becomes ready (disconnected) once
/// the flag is raised. There is no way back.
#[derive(Debug)]
pub(crate) struct Flag {
    flag: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

impl Flag {
    pub fn new() -> Self {
        let (trigger, signal) = crossbeam_channel::bounded(0);
        Self {
            flag: AtomicBool::new(false),
            trigger: Mutex::new(Some(trigger)),
            signal,
        }
    }

    pub fn raise(&self) -> bool {
        match self.flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => {
                drop(lock(&self.trigger).take());
                true
            },
            Err(_) => false,
        }
    }

    pub fn check(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn signal(&self) -> Receiver<()> {
        self.signal.clone()
    }
}
