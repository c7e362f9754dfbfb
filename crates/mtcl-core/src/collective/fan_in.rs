//! 扇入：根按轮询顺序从多个 handle 接收，粘性等待直到消费；非根只发送
//! （spec.md §4.6.2）。
use crate::error::{ErrorKind, MtclError, Result};
use crate::handle::SharedHandle;
use crate::transport::ShutdownDirection;

enum FanInRole {
    Root {
        peers: Vec<SharedHandle>,
        cursor: usize,
        /// 一旦某个 handle 被探测到就绪，下一次 `receive` 必须从同一个 handle
        /// 消费（"no re-selection"），直到消费完毕才清除。
        pending: Option<usize>,
    },
    NonRoot {
        handle: SharedHandle,
    },
}

pub struct FanIn {
    role: FanInRole,
}

impl FanIn {
    pub fn new_root(peers: Vec<SharedHandle>) -> Self {
        Self { role: FanInRole::Root { peers, cursor: 0, pending: None } }
    }

    pub fn new_non_root(handle: SharedHandle) -> Self {
        Self { role: FanInRole::NonRoot { handle } }
    }

    fn invalid_op(what: &'static str) -> MtclError {
        MtclError::new(ErrorKind::InvalidState, what)
    }

    /// 根：按轮询顺序扫描所有仍存活的 handle；`blocking=false` 时一圈都没有
    /// 就绪则返回 `would-block`，`blocking=true` 时持续轮询直到某个 handle 就绪
    /// 或参与者集合清空。
    pub fn receive(&mut self, buf: &mut [u8], blocking: bool) -> Result<usize> {
        match &mut self.role {
            FanInRole::NonRoot { .. } => Err(Self::invalid_op("non-root may not receive on a fan-in team")),
            FanInRole::Root { peers, cursor, pending } => {
                loop {
                    if let Some(idx) = *pending {
                        let n = peers[idx].core().receive(buf)?;
                        *pending = None;
                        return Ok(n);
                    }
                    if peers.is_empty() {
                        return Ok(0);
                    }
                    let mut scanned = 0;
                    let mut ready = None;
                    'scan: while scanned < peers.len() {
                        let n = peers.len();
                        let idx = (*cursor + scanned) % n;
                        match peers[idx].core().probe(false) {
                            Ok(0) => {
                                peers.remove(idx);
                                if *cursor > idx {
                                    *cursor -= 1;
                                }
                                scanned = 0;
                                continue 'scan;
                            }
                            Ok(_) => {
                                ready = Some(idx);
                                break 'scan;
                            }
                            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                                scanned += 1;
                            }
                            Err(err) => return Err(err),
                        }
                    }
                    if peers.is_empty() {
                        return Ok(0);
                    }
                    if let Some(idx) = ready {
                        *pending = Some(idx);
                        *cursor = (idx + 1) % peers.len();
                        continue;
                    }
                    if !blocking {
                        return Err(MtclError::would_block("no fan-in peer ready"));
                    }
                }
            }
        }
    }

    /// 非根：发一条框定消息给根。
    pub fn send(&self, payload: &[u8]) -> Result<()> {
        match &self.role {
            FanInRole::Root { .. } => Err(Self::invalid_op("root may not send on a fan-in team")),
            FanInRole::NonRoot { handle } => handle.core().send(payload),
        }
    }

    /// 根：只有在所有非根都已关闭（参与者集合清空）后才合法；非根：立即发出
    /// EOS 并完成。
    pub fn close(&self) -> Result<()> {
        match &self.role {
            FanInRole::Root { peers, .. } => {
                if !peers.is_empty() {
                    return Err(Self::invalid_op("fan-in root closed before all peers reached end-of-stream"));
                }
                Ok(())
            }
            FanInRole::NonRoot { handle } => {
                handle.core().send(&[])?;
                handle.core().close(ShutdownDirection::Both);
                Ok(())
            }
        }
    }
}
