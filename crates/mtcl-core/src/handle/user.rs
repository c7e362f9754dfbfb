//! 应用侧可见的 handle 包装：只移动、drop 时隐式 `yield`。
//!
//! 直接对应 spec.md §4.4 "若应用丢弃引用而未调用 close，隐式路径是 yield（读
//! 通道归还给运行时）"，其字面来源是原始实现中 `HandleUser` 的移动语义与析构
//! 函数（`examples/original_source/handleUser.hpp`）。
use super::{Busy, SharedHandle};
use crate::error::{ErrorKind, MtclError, Result};
use crate::transport::ShutdownDirection;

/// 应用代码实际持有的 handle。不可复制、不可克隆：一次只有一方（应用或运行时）
/// 拥有 I/O 发起权，克隆会破坏这一不变式。
pub struct UserHandle {
    inner: Option<SharedHandle>,
    readable: bool,
    new_connection: bool,
}

impl UserHandle {
    /// 构造一个无效（哨兵）handle，供失败路径返回（spec.md §7 "invalid handle
    /// sentinel"）。
    pub fn invalid() -> Self {
        Self {
            inner: None,
            readable: false,
            new_connection: false,
        }
    }

    pub(crate) fn new(handle: SharedHandle, readable: bool, new_connection: bool) -> Self {
        handle.core().set_busy(Busy::Application);
        Self {
            inner: Some(handle),
            readable,
            new_connection,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.inner.is_some()
    }

    pub fn is_new_connection(&self) -> bool {
        self.new_connection
    }

    pub fn scheme(&self) -> Option<&'static str> {
        self.inner.as_ref().map(|h| h.core().scheme())
    }

    pub fn id(&self) -> Option<u64> {
        self.inner.as_ref().map(|h| h.core().id())
    }

    pub fn name(&self) -> Option<String> {
        self.inner.as_ref().and_then(|h| h.core().name())
    }

    pub fn set_name(&self, name: impl Into<String>) {
        if let Some(h) = &self.inner {
            h.core().set_name(name);
        }
    }

    /// 发送一条完整消息。
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.new_connection = false;
        match &self.inner {
            Some(h) if !h.core().is_closed_wr() => h.core().send(payload),
            _ => Err(MtclError::new(ErrorKind::InvalidState, "handle is invalid or closed")),
        }
    }

    /// 接收一条消息；`0` 表示 EOS。只有在 handle 处于可读状态时才允许调用
    /// （spec.md 原始实现中 `HandleUser::receive` 对 `!isReadable` 返回 `EINVAL`）。
    pub fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.new_connection = false;
        if !self.readable {
            return Err(MtclError::new(
                ErrorKind::InvalidState,
                "handle is not currently readable",
            ));
        }
        match &self.inner {
            Some(h) => h.core().receive(buf),
            None => Err(MtclError::new(ErrorKind::InvalidState, "handle is invalid")),
        }
    }

    /// 探测下一帧大小而不消费。
    pub fn probe(&self, blocking: bool) -> Result<u64> {
        match &self.inner {
            Some(h) => h.core().probe(blocking),
            None => Err(MtclError::new(ErrorKind::InvalidState, "handle is invalid")),
        }
    }

    /// 归还控制权给运行时：清除可读/新连接标记，通知驱动重新武装。
    pub fn yield_to_runtime(&mut self) {
        self.readable = false;
        self.new_connection = false;
        if let Some(h) = &self.inner {
            h.core().yield_to_runtime();
        }
    }

    /// 半关闭/全关闭。对已关闭 handle 重复调用是无操作
    /// （spec.md §8 "Idempotence: close on an already-closed handle is a no-op"）。
    pub fn close(&mut self, direction: ShutdownDirection) {
        if let Some(h) = &self.inner {
            h.core().close(direction);
        }
    }

    /// 把底层共享 handle 移交给团队构建器（spec.md §3 "A team's handles are not
    /// visible through `get_next` once the team owns them"）。不触发 drop 时的
    /// 隐式 yield：一旦团队接管，handle 就不再是"应用持有但未显式处理"的状态。
    pub(crate) fn into_shared(mut self) -> Option<SharedHandle> {
        if let Some(h) = &self.inner {
            debug_assert_eq!(
                h.core().busy_state(),
                Busy::Application,
                "a handle must still be application-owned when it is handed off to a team"
            );
        }
        self.readable = false;
        self.inner.take()
    }
}

impl Drop for UserHandle {
    fn drop(&mut self) {
        if self.readable {
            if let Some(h) = &self.inner {
                if !(h.core().is_closed_rd() && h.core().is_closed_wr()) {
                    h.core().yield_to_runtime();
                }
            }
        }
    }
}
