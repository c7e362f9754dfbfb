//! `mtcl-transport-mem`: an in-process, named ring-buffer driver for the
//! `SHM` scheme.
//!
//! Grounded on `examples/original_source/protocols/shm_buffer.hpp`'s named,
//! semaphore-guarded circular buffer, but deliberately in-process (a
//! `Mutex`/`Condvar`-guarded [`ring::Ring`] per direction, not a real
//! `mmap`ed segment) per spec.md §0 — this crate exists to exercise the SHM
//! hello scenario (spec.md §8 scenario 2) and to give `mtcl-contract-tests`
//! a fast, dependency-free fixture driver.
mod channel;
mod driver;
mod ring;
mod registry;

pub use channel::MemChannel;
pub use driver::MemDriver;
