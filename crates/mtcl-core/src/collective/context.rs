//! 用户可见的集合通信句柄：绑定集合类型、角色与关闭协议（C7）。
//!
//! 角色合法性检查下沉到各个通用实现（[`super::broadcast::Broadcast`] 等）里，
//! 这里把四种集合类型收敛成一个统一的外观,供 [`super::team::Team`] 持有,调用方
//! 不需要关心背后具体是哪一种算法。
//!
//! 原始实现的 `CollectiveContext`（`examples/original_source/collectives/
//! collectiveContext.hpp`）在其委托对象（`coll`）之上另外维护了一份
//! `(probed, size)` 缓存：`probe` 命中缓存时不重新探测底层,`receive` 消费后
//! 清空缓存。这里的 `probed` 字段就是那份缓存,独立于 [`crate::handle::HandleCore`]
//! 自己的帧缓存——两层缓存语义相同但各自维护,互不知情。
use crate::error::{ErrorKind, MtclError, Result};
use crate::handle::SharedHandle;

use super::broadcast::Broadcast;
use super::fan_in::FanIn;
use super::fan_out::FanOut;
use super::gather::{Gather, GatherOutcome};
use super::CollectiveKind;

enum Inner {
    Broadcast(Broadcast),
    FanIn(FanIn),
    FanOut(FanOut),
    Gather(Gather),
}

pub struct CollectiveContext {
    inner: Inner,
    /// 团队规模,`update` 据此判断组装是否完成。
    size: usize,
    /// 团队组装阶段已收集的非根连接数达到 `size - 1` 后置位。
    completed: bool,
    /// 本层级自己的 `(has, size)` 探测缓存,独立于底层 handle 的缓存。
    probed: Option<u64>,
}

impl CollectiveContext {
    pub fn kind(&self) -> CollectiveKind {
        match &self.inner {
            Inner::Broadcast(_) => CollectiveKind::Broadcast,
            Inner::FanIn(_) => CollectiveKind::FanIn,
            Inner::FanOut(_) => CollectiveKind::FanOut,
            Inner::Gather(_) => CollectiveKind::Gather,
        }
    }

    fn wrong_kind(op: &'static str) -> MtclError {
        MtclError::new(ErrorKind::InvalidState, format!("operation '{op}' is not valid for this collective kind"))
    }

    /// 团队构建进度检查点（原始实现：`bool update(int count)`）：记录已收集
    /// `count` 个非根连接,返回团队是否已满额（`count == size - 1`）。根在
    /// 团队握手循环收满所有 rank 槽位后调用一次,把装配完成这件事落进这个
    /// 上下文自身的状态里,而不仅仅是调用方循环变量的隐含结论。
    pub fn update(&mut self, count: usize) -> bool {
        self.completed = count == self.size - 1;
        self.completed
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        match &mut self.inner {
            Inner::Broadcast(b) => b.send(payload),
            Inner::FanIn(f) => f.send(payload),
            Inner::FanOut(f) => f.send(payload),
            Inner::Gather(_) => Err(Self::wrong_kind("send")),
        }
    }

    /// 探测下一帧大小。命中本层缓存时直接返回,不重新探测底层 handle。
    pub fn probe(&mut self, blocking: bool) -> Result<u64> {
        if let Some(size) = self.probed {
            return Ok(size);
        }
        let size = self.probe_underlying(blocking)?;
        self.probed = Some(size);
        Ok(size)
    }

    fn probe_underlying(&mut self, blocking: bool) -> Result<u64> {
        match &mut self.inner {
            Inner::Broadcast(b) => b.probe(blocking),
            Inner::FanOut(f) => f.probe(blocking),
            Inner::FanIn(_) | Inner::Gather(_) => Err(Self::wrong_kind("probe")),
        }
    }

    /// 接收当前帧。若尚未探测,先阻塞探测一次以填充本层缓存;读取完成后清空
    /// 缓存,使下一次 `probe`/`receive` 重新探测底层。
    pub fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.probed.is_none() {
            let size = self.probe_underlying(true)?;
            self.probed = Some(size);
        }
        self.probed = None;
        match &mut self.inner {
            Inner::Broadcast(b) => b.receive(buf),
            Inner::FanOut(f) => f.receive(buf),
            Inner::FanIn(_) | Inner::Gather(_) => Err(Self::wrong_kind("receive")),
        }
    }

    /// 扇入专属：`blocking` 控制轮询未就绪时是否继续自旋。
    pub fn receive_fan_in(&mut self, buf: &mut [u8], blocking: bool) -> Result<usize> {
        match &mut self.inner {
            Inner::FanIn(f) => f.receive(buf, blocking),
            _ => Err(Self::wrong_kind("receive_fan_in")),
        }
    }

    /// 聚集专属：根视角，见 [`Gather::execute_root`]。
    pub fn execute_gather_root(&self, local_buf: &[u8], out_buf: &mut [u8], slot_len: usize) -> Result<GatherOutcome> {
        match &self.inner {
            Inner::Gather(g) => g.execute_root(local_buf, out_buf, slot_len),
            _ => Err(Self::wrong_kind("execute_gather_root")),
        }
    }

    /// 聚集专属：非根视角，见 [`Gather::execute_non_root`]。
    pub fn execute_gather_non_root(&self, local_buf: &[u8]) -> Result<()> {
        match &self.inner {
            Inner::Gather(g) => g.execute_non_root(local_buf),
            _ => Err(Self::wrong_kind("execute_gather_non_root")),
        }
    }

    pub fn close(&self) -> Result<()> {
        match &self.inner {
            Inner::Broadcast(b) => b.close(),
            Inner::FanIn(f) => f.close(),
            Inner::FanOut(f) => f.close(),
            Inner::Gather(g) => g.close(),
        }
    }
}

pub(crate) fn new_root(kind: CollectiveKind, peers: Vec<SharedHandle>, root_rank: usize, size: usize) -> CollectiveContext {
    let inner = match kind {
        CollectiveKind::Broadcast => Inner::Broadcast(Broadcast::new_root(peers)),
        CollectiveKind::FanIn => Inner::FanIn(FanIn::new_root(peers)),
        CollectiveKind::FanOut => Inner::FanOut(FanOut::new_root(peers)),
        CollectiveKind::Gather => Inner::Gather(Gather::new_root(peers, root_rank)),
    };
    CollectiveContext { inner, size, completed: false, probed: None }
}

pub(crate) fn new_non_root(kind: CollectiveKind, handle: SharedHandle, local_rank: usize, size: usize) -> CollectiveContext {
    let inner = match kind {
        CollectiveKind::Broadcast => Inner::Broadcast(Broadcast::new_non_root(handle)),
        CollectiveKind::FanIn => Inner::FanIn(FanIn::new_non_root(handle)),
        CollectiveKind::FanOut => Inner::FanOut(FanOut::new_non_root(handle)),
        CollectiveKind::Gather => Inner::Gather(Gather::new_non_root(handle, local_rank)),
    };
    CollectiveContext { inner, size, completed: false, probed: None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_reports_completion_at_size_minus_one() {
        let mut ctx = new_root(CollectiveKind::Broadcast, Vec::new(), 0, 4);
        assert!(!ctx.update(1));
        assert!(!ctx.is_complete());
        assert!(!ctx.update(2));
        assert!(ctx.update(3));
        assert!(ctx.is_complete());
    }
}
