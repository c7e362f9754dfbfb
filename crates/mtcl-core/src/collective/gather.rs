//! 聚集：根按 rank 收集每个非根的载荷到输出缓冲区的对应槽位
//! （spec.md §4.6.4、§6.3 线格式）。
use crate::error::{ErrorKind, MtclError, Result};
use crate::handle::SharedHandle;
use crate::transport::ShutdownDirection;

enum GatherRole {
    Root { peers: Vec<SharedHandle>, root_rank: usize },
    NonRoot { handle: SharedHandle, local_rank: usize },
}

pub struct Gather {
    role: GatherRole,
}

/// `execute` 的结果：正常完成，或者某个非根提前发出了 EOS。
///
/// spec.md §9 开放问题："behaviour when multiple non-roots issue EOS mid-operation
/// — source returns 0 on first EOS seen"；这里原样采纳该策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatherOutcome {
    Completed,
    EndOfStream,
}

impl Gather {
    pub fn new_root(peers: Vec<SharedHandle>, root_rank: usize) -> Self {
        Self { role: GatherRole::Root { peers, root_rank } }
    }

    pub fn new_non_root(handle: SharedHandle, local_rank: usize) -> Self {
        Self { role: GatherRole::NonRoot { handle, local_rank } }
    }

    fn invalid_op(what: &'static str) -> MtclError {
        MtclError::new(ErrorKind::InvalidState, what)
    }

    /// 根：`local_buf` 与每个非根贡献的载荷一起被放入 `out_buf` 的对应槽位，
    /// 槽位索引即该参与者的 rank，槽宽固定为 `slot_len`。
    pub fn execute_root(&self, local_buf: &[u8], out_buf: &mut [u8], slot_len: usize) -> Result<GatherOutcome> {
        match &self.role {
            GatherRole::NonRoot { .. } => Err(Self::invalid_op("non-root must call execute_non_root")),
            GatherRole::Root { peers, root_rank } => {
                // 第一步：所有 handle 都必须就绪才能继续（否则整体 would-block）。
                for peer in peers {
                    if peer.core().probe(true)? == 0 {
                        return Ok(GatherOutcome::EndOfStream);
                    }
                }
                // 第二步：依次读出 (rank, payload) 对，写入对应槽位。
                for peer in peers {
                    let mut rank_header = [0u8; 8];
                    if peer.core().receive(&mut rank_header)? == 0 {
                        return Ok(GatherOutcome::EndOfStream);
                    }
                    let rank = u64::from_be_bytes(rank_header) as usize;
                    let payload_size = peer.core().probe(true)?;
                    if payload_size == 0 {
                        return Ok(GatherOutcome::EndOfStream);
                    }
                    if payload_size as usize != slot_len {
                        return Err(MtclError::new(
                            ErrorKind::InvalidState,
                            format!("gather payload of {payload_size} bytes does not match slot length {slot_len}"),
                        ));
                    }
                    let start = rank * slot_len;
                    peer.core().receive(&mut out_buf[start..start + slot_len])?;
                }
                let start = *root_rank * slot_len;
                out_buf[start..start + slot_len].copy_from_slice(local_buf);
                Ok(GatherOutcome::Completed)
            }
        }
    }

    /// 非根：把 `(local_rank, local_buf)` 框定发送给根。
    pub fn execute_non_root(&self, local_buf: &[u8]) -> Result<()> {
        match &self.role {
            GatherRole::Root { .. } => Err(Self::invalid_op("root must call execute_root")),
            GatherRole::NonRoot { handle, local_rank } => {
                handle.core().send(&(*local_rank as u64).to_be_bytes())?;
                handle.core().send(local_buf)
            }
        }
    }

    pub fn close(&self) -> Result<()> {
        match &self.role {
            GatherRole::Root { peers, .. } => {
                for peer in peers {
                    peer.core().send(&[])?;
                    peer.core().close(ShutdownDirection::Both);
                }
                Ok(())
            }
            GatherRole::NonRoot { handle, .. } => {
                handle.core().send(&[])?;
                handle.core().close(ShutdownDirection::Both);
                Ok(())
            }
        }
    }
}
