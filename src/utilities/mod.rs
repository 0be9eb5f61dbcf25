/*
 * deaconn - absolute deadlines for blocking duplex byte streams
 * This is free and unencumbered software released into the public domain.
 */
mod flag;
mod misc;
mod timeout;

pub(crate) use flag::Flag;
pub(crate) use misc::lock;
pub(crate) use timeout::instant_of;
