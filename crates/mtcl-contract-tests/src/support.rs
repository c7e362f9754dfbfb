//! Shared test plumbing: panic-with-context and small harness helpers.
//!
//! Grounded on the teacher's `spark-contract-tests::support::panic_with_context`
//! — the same "re-throw with suite/case context" trick, trimmed to what this
//! crate's scenario/property tests actually need.
use std::panic;

/// Re-raises a caught panic with `scenario` prefixed onto the message, so a
/// failure inside a spawned participant thread is attributable at the top
/// level instead of surfacing as a bare thread-join error.
pub fn panic_with_context(scenario: &str, payload: Box<dyn std::any::Any + Send>) -> ! {
    let text = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    };
    panic::resume_unwind(Box::new(format!("[mtcl-tck::{scenario}] {text}")));
}

/// Runs `body` on a scoped thread and re-raises any panic with `scenario`
/// context once the thread is joined, so scenario tests that spawn a root
/// and several non-root participants surface one clear failure.
pub fn join_with_context<T: Send>(scenario: &'static str, handle: std::thread::JoinHandle<T>) -> T {
    match handle.join() {
        Ok(value) => value,
        Err(payload) => panic_with_context(scenario, payload),
    }
}
