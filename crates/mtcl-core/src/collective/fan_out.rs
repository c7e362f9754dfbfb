//! 扇出：根持游标轮询发送；非根与广播非根完全相同（spec.md §4.6.3）。
use crate::error::{ErrorKind, MtclError, Result};
use crate::handle::SharedHandle;
use crate::transport::ShutdownDirection;

enum FanOutRole {
    Root { peers: Vec<SharedHandle>, cursor: usize },
    NonRoot { handle: SharedHandle },
}

pub struct FanOut {
    role: FanOutRole,
}

impl FanOut {
    pub fn new_root(peers: Vec<SharedHandle>) -> Self {
        Self { role: FanOutRole::Root { peers, cursor: 0 } }
    }

    pub fn new_non_root(handle: SharedHandle) -> Self {
        Self { role: FanOutRole::NonRoot { handle } }
    }

    fn invalid_op(what: &'static str) -> MtclError {
        MtclError::new(ErrorKind::InvalidState, what)
    }

    /// 发给游标当前指向的 handle，游标随后对 `size-1` 取模前进。
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        match &mut self.role {
            FanOutRole::Root { peers, cursor } => {
                if peers.is_empty() {
                    return Err(Self::invalid_op("fan-out team has no peers"));
                }
                let idx = *cursor % peers.len();
                peers[idx].core().send(payload)?;
                *cursor = (idx + 1) % peers.len();
                Ok(())
            }
            FanOutRole::NonRoot { .. } => Err(Self::invalid_op("non-root may not send via fan-out")),
        }
    }

    pub fn probe(&self, blocking: bool) -> Result<u64> {
        match &self.role {
            FanOutRole::Root { .. } => Err(Self::invalid_op("root may not probe on a fan-out team")),
            FanOutRole::NonRoot { handle } => handle.core().probe(blocking),
        }
    }

    pub fn receive(&self, buf: &mut [u8]) -> Result<usize> {
        match &self.role {
            FanOutRole::Root { .. } => Err(Self::invalid_op("root may not receive on a fan-out team")),
            FanOutRole::NonRoot { handle } => handle.core().receive(buf),
        }
    }

    pub fn close(&self) -> Result<()> {
        match &self.role {
            FanOutRole::Root { peers, .. } => {
                for peer in peers {
                    peer.core().send(&[])?;
                    peer.core().close(ShutdownDirection::Both);
                }
                Ok(())
            }
            FanOutRole::NonRoot { handle } => {
                if !handle.core().is_closed_rd() {
                    return Err(Self::invalid_op("non-root closed before root signalled end-of-stream"));
                }
                handle.core().close(ShutdownDirection::Both);
                Ok(())
            }
        }
    }
}
