//! Bounded, blocking message ring — the in-process stand-in for the
//! multi-producer/multi-consumer circular buffer a real SHM segment would
//! use (`examples/original_source/protocols/shm_buffer.hpp`: `shmSegment`'s
//! `mutex`/`full`/`empty` semaphores around a fixed-size slot array).
//!
//! # Why
//! A real SHM driver maps the same memory page into two processes and
//! coordinates through named POSIX semaphores; this crate is explicitly an
//! in-process "SHM-ring-flavored" driver (spec.md §0), so a `Mutex` +
//! `Condvar` pair plays the role of `full`/`empty` without ever touching
//! `mmap`.
//!
//! # How
//! Each slot carries one already-framed message; a slot of length 0 is the
//! EOS marker, mirroring the zero-length frame convention the rest of
//! `mtcl-core` uses on stream transports.
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Number of in-flight messages the ring holds before `send` blocks.
pub const RING_SLOTS: usize = 16;

struct RingState {
    slots: VecDeque<Vec<u8>>,
    closed: bool,
}

pub struct Ring {
    state: Mutex<RingState>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl Ring {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RingState { slots: VecDeque::with_capacity(RING_SLOTS), closed: false }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Enqueues one message, blocking while the ring is full (the `full`
    /// semaphore's role in the original segment).
    pub fn push(&self, message: Vec<u8>) {
        let mut state = self.state.lock().unwrap();
        while state.slots.len() >= RING_SLOTS && !state.closed {
            state = self.not_full.wait(state).unwrap();
        }
        state.slots.push_back(message);
        drop(state);
        self.not_empty.notify_one();
    }

    /// Peeks the length of the next message without dequeuing it.
    /// `blocking=false` returns `None` immediately if nothing is pending.
    pub fn peek_len(&self, blocking: bool) -> Option<usize> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(front) = state.slots.front() {
                return Some(front.len());
            }
            if !blocking {
                return None;
            }
            state = self.not_empty.wait(state).unwrap();
        }
    }

    /// Dequeues the next message; panics if called without a prior
    /// `peek_len` confirming one is pending (mirrors `HandleCore`'s
    /// probe-then-receive discipline, so this is never hit in practice).
    pub fn pop(&self) -> Vec<u8> {
        let mut state = self.state.lock().unwrap();
        let message = state.slots.pop_front().expect("pop called without a pending message");
        drop(state);
        self.not_full.notify_one();
        message
    }

    /// Pushes the zero-length EOS marker and wakes any blocked reader.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.slots.push_back(Vec::new());
        state.closed = true;
        drop(state);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}

impl Default for Ring {
    fn default() -> Self {
        Self::new()
    }
}
