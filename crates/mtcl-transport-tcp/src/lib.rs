//! `mtcl-transport-tcp`: a blocking `std::net::TcpStream` driver implementing
//! `mtcl-core`'s transport capability interface.
//!
//! One worked concrete transport, grounding the "each driver is a black box"
//! non-goal with a single example the way the teacher's TCP transport crate
//! grounds its own `Channel`/`Transport` traits.
mod channel;
mod driver;

pub use channel::TcpChannel;
pub use driver::TcpDriver;
