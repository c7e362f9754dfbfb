//! Transport-agnostic TCK: spec.md §8's end-to-end scenarios written once
//! over `mtcl-core`'s public API, exercised against every concrete driver
//! crate from `tests/`.
//!
//! Grounded on the teacher's `spark-contract-tests` crate: a suite of
//! scenario functions generic over a driver-registration closure, run from
//! per-driver `tests/*.rs` files rather than duplicated per transport.
pub mod scenarios;
pub mod support;
