//! Handle 状态机（spec.md §3 Data Model、§4.4 C2）。
//!
//! # 设计意图（Why）
//! - 把“谁可以发起 I/O”（`busy`）、“半关闭进度”（`closed_rd`/`closed_wr`）与
//!   “帧长度缓存”（`probed`）集中在一处，使任何驱动都能复用同一套所有权与
//!   分帧规则，而不必各自实现。
//!
//! # 解析逻辑（How）
//! - [`HandleCore`] 持有驱动无关的状态，并通过 `Arc` 在运行时/应用线程间共享；
//! - 驱动只需要提供 [`crate::transport::Channel`] 的原始读写原语；
//! - [`SharedHandle`] 是 `Arc<HandleCore>` 的薄封装，供调度队列与集合层在
//!   "runtime-owned" 阶段持有；一旦交给应用线程，应用侧只通过
//!   [`crate::handle::user::UserHandle`] 访问。
mod user;

pub use user::UserHandle;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{ErrorKind, MtclError, Result};
use crate::frame::ProbedFrame;
use crate::transport::{Channel, ShutdownDirection, TransportDriver};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// 当前持有 I/O 发起权的一方。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Busy {
    Application,
    Runtime,
}

struct HandleInner {
    channel: Arc<dyn Channel>,
    name: Option<String>,
    probed: ProbedFrame,
    closed_rd: bool,
    closed_wr: bool,
}

/// 驱动无关的 handle 状态：一个双工、成帧、消息有序通道的一端。
///
/// 持有一个到所属驱动的非拥有引用（`Weak`-like 通过 trait object 引用语义），
/// 用于 `yield`/`close` 时回调 `notify_yield`/`notify_close`，避免
/// 驱动<->handle 之间的强引用环（Design Notes: "Cyclic driver↔handle
/// references"）。
pub struct HandleCore {
    id: u64,
    scheme: &'static str,
    driver: Arc<dyn TransportDriver>,
    busy: Mutex<Busy>,
    inner: Mutex<HandleInner>,
    closed: AtomicBool,
}

impl HandleCore {
    pub fn new(
        scheme: &'static str,
        driver: Arc<dyn TransportDriver>,
        channel: Arc<dyn Channel>,
        initially_busy: Busy,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            scheme,
            driver,
            busy: Mutex::new(initially_busy),
            inner: Mutex::new(HandleInner {
                channel,
                name: None,
                probed: ProbedFrame::new(),
                closed_rd: false,
                closed_wr: false,
            }),
            closed: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn scheme(&self) -> &'static str {
        self.scheme
    }

    pub fn name(&self) -> Option<String> {
        self.inner.lock().unwrap().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.inner.lock().unwrap().name = Some(name.into());
    }

    pub(crate) fn busy_state(&self) -> Busy {
        *self.busy.lock().unwrap()
    }

    pub(crate) fn set_busy(&self, state: Busy) {
        *self.busy.lock().unwrap() = state;
    }

    /// 运行时重新取得控制权：驱动重新武装就绪检测（spec.md §4.4 "yield"）。
    pub(crate) fn yield_to_runtime(&self) {
        self.set_busy(Busy::Runtime);
        self.driver.notify_yield(self.channel_id());
    }

    fn channel_id(&self) -> u64 {
        self.inner.lock().unwrap().channel.id()
    }

    pub fn is_closed_rd(&self) -> bool {
        self.inner.lock().unwrap().closed_rd
    }

    pub fn is_closed_wr(&self) -> bool {
        self.inner.lock().unwrap().closed_wr
    }

    /// 发送一条完整的帧载荷。已关闭写半部时返回 `InvalidState`。
    pub fn send(&self, payload: &[u8]) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        if inner.closed_wr {
            return Err(MtclError::invalid_state("handle write half already closed"));
        }
        inner.channel.send(payload)
    }

    /// 探测下一帧大小而不消费；幂等直到 `receive` 消费缓存。
    pub fn probe(&self, blocking: bool) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed_rd {
            return Ok(0);
        }
        if let Some(size) = inner.probed.pending_size() {
            return Ok(size);
        }
        let size = inner.channel.probe_raw(blocking)?;
        if size == 0 {
            inner.closed_rd = true;
            return Ok(0);
        }
        inner.probed.fill(size);
        Ok(size)
    }

    /// 接收当前帧，最多写入 `buf.len()` 字节。
    ///
    /// 若 `buf` 小于已探测帧大小，返回 `MessageTooLarge` 且缓存不被丢弃——
    /// 调用方可以用更大的缓冲区重试（spec.md §4.4 探测/接收顺序规则）。
    pub fn receive(&self, buf: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed_rd {
            return Ok(0);
        }
        let size = match inner.probed.pending_size() {
            Some(size) => size,
            None => {
                let size = inner.channel.probe_raw(true)?;
                if size == 0 {
                    inner.closed_rd = true;
                    return Ok(0);
                }
                inner.probed.fill(size);
                size
            }
        };
        if (buf.len() as u64) < size {
            return Err(MtclError::new(
                ErrorKind::MessageTooLarge,
                format!("buffer of {} bytes too small for {size}-byte frame", buf.len()),
            ));
        }
        let n = inner.channel.receive_raw(&mut buf[..size as usize])?;
        inner.probed.take();
        Ok(n)
    }

    /// 按方向执行半关闭；两半都关闭后通知驱动完全关闭。
    pub fn close(&self, direction: ShutdownDirection) {
        let (close_wr, close_rd) = {
            let mut inner = self.inner.lock().unwrap();
            match direction {
                ShutdownDirection::Write | ShutdownDirection::Both => {
                    if !inner.closed_wr {
                        let _ = inner.channel.shutdown(ShutdownDirection::Write);
                        inner.closed_wr = true;
                    }
                }
                ShutdownDirection::Read => {}
            }
            match direction {
                ShutdownDirection::Read | ShutdownDirection::Both => {
                    inner.closed_rd = true;
                }
                ShutdownDirection::Write => {}
            }
            (inner.closed_wr, inner.closed_rd)
        };
        if close_wr && close_rd && !self.closed.swap(true, Ordering::AcqRel) {
            self.driver.notify_close(self.channel_id(), true, true);
            crate::observability::log_handle_closed(self.id, self.scheme);
        }
    }
}

impl Drop for HandleCore {
    fn drop(&mut self) {
        // RAII 兜底：即便应用侧忘记显式 close，也要保证驱动得到半关闭通知，
        // 呼应 spec.md §4.4 "若应用丢弃引用而未调用 close，隐式路径是 yield"，
        // 但对象即将被销毁时已经没有 yield 的意义，直接尽力关闭两端。
        if !self.closed.swap(true, Ordering::AcqRel) {
            let (closed_wr, closed_rd) = {
                let inner = self.inner.lock().unwrap();
                (inner.closed_wr, inner.closed_rd)
            };
            self.driver.notify_close(self.channel_id(), closed_wr, closed_rd);
        }
    }
}

/// 运行时持有 handle 期间使用的共享引用。
#[derive(Clone)]
pub struct SharedHandle(pub(crate) Arc<HandleCore>);

impl SharedHandle {
    pub fn new(core: Arc<HandleCore>) -> Self {
        Self(core)
    }

    pub fn core(&self) -> &Arc<HandleCore> {
        &self.0
    }
}
