//! 广播：根向所有非根发送；非根只读（spec.md §4.6.1）。
use crate::error::{ErrorKind, MtclError, Result};
use crate::handle::SharedHandle;
use crate::transport::ShutdownDirection;

enum BroadcastRole {
    Root { peers: Vec<SharedHandle> },
    NonRoot { handle: SharedHandle },
}

/// 一个已装配好的广播团队实例，持有一组点对点 handle 直到团队被关闭。
pub struct Broadcast {
    role: BroadcastRole,
}

impl Broadcast {
    pub fn new_root(peers: Vec<SharedHandle>) -> Self {
        Self { role: BroadcastRole::Root { peers } }
    }

    pub fn new_non_root(handle: SharedHandle) -> Self {
        Self { role: BroadcastRole::NonRoot { handle } }
    }

    fn invalid_op(what: &'static str) -> MtclError {
        MtclError::new(ErrorKind::InvalidState, what)
    }

    /// 按参与者顺序把 `payload` 帧发给每个非根 handle。仅根可调用。
    pub fn send(&self, payload: &[u8]) -> Result<()> {
        match &self.role {
            BroadcastRole::Root { peers } => {
                for peer in peers {
                    peer.core().send(payload)?;
                }
                Ok(())
            }
            BroadcastRole::NonRoot { .. } => Err(Self::invalid_op("non-root may not send on a broadcast team")),
        }
    }

    /// 仅非根可调用，转发到其唯一的根 handle。
    pub fn probe(&self, blocking: bool) -> Result<u64> {
        match &self.role {
            BroadcastRole::Root { .. } => Err(Self::invalid_op("root may not probe on a broadcast team")),
            BroadcastRole::NonRoot { handle } => handle.core().probe(blocking),
        }
    }

    pub fn receive(&self, buf: &mut [u8]) -> Result<usize> {
        match &self.role {
            BroadcastRole::Root { .. } => Err(Self::invalid_op("root may not receive on a broadcast team")),
            BroadcastRole::NonRoot { handle } => handle.core().receive(buf),
        }
    }

    /// 根：向每个非根发送一个零长度 EOS 帧再全关闭。
    /// 非根：只有在已经从根那里观察到 EOS 之后才允许关闭。
    pub fn close(&self) -> Result<()> {
        match &self.role {
            BroadcastRole::Root { peers } => {
                for peer in peers {
                    peer.core().send(&[])?;
                    peer.core().close(ShutdownDirection::Both);
                }
                Ok(())
            }
            BroadcastRole::NonRoot { handle } => {
                if !handle.core().is_closed_rd() {
                    return Err(Self::invalid_op("non-root closed before root signalled end-of-stream"));
                }
                handle.core().close(ShutdownDirection::Both);
                Ok(())
            }
        }
    }
}
