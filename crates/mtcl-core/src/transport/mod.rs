//! 传输驱动的统一能力接口（spec.md §4.1/§6.1/§6.2）。
//!
//! # 设计意图（Why）
//! - TCP/SHM/MQTT/MPI 等具体介质被本 crate 视为黑盒协作者：只要实现 [`Channel`]
//!   与 [`TransportDriver`]，调度器与集合通信层就无需分支判断介质类型。
//! - 两个 trait 都要求 `Send + Sync`，以便跨调度线程与应用线程安全共享。
//!
//! # 解析逻辑（How）
//! - [`Channel`] 承载单个已建立连接上的原始读写原语，帧边界缓存由上层
//!   [`crate::handle::Handle`] 统一维护（参见 spec.md Data Model 中 `probed` 字段）；
//! - [`TransportDriver`] 承载介质级生命周期：监听、建连、非阻塞推进与半关闭通知。
use std::time::Duration;

use crate::dispatch::DispatchQueue;
use crate::error::Result;

pub mod address;

pub use address::parse_address;

/// MPIP2P 断连标签，协议内部保留，不得与应用层标签冲突（spec.md §9 open question）。
///
/// 当前仓库未附带 MPI 驱动实现，但常量提前保留，使未来的 MPI 驱动有单一事实来源。
pub const RESERVED_DISCONNECT_TAG: i32 = 42;

/// 半关闭方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownDirection {
    Read,
    Write,
    Both,
}

/// 单个连接上的原始 I/O 能力。
///
/// # 契约说明（What）
/// - `send`：要么整条消息成功写出，要么返回错误；驱动内部负责重试部分写入
///   （spec.md §4.1 "partial sends are internally resumed"）；
/// - `probe_raw`：返回下一帧的大小；`Ok(0)` 表示 EOS；非阻塞模式下若无帧就绪，
///   返回 `ErrorKind::WouldBlock`；对端重置（peer-reset）应折算为 `Ok(0)`
///   （spec.md §7 传播策略）；
/// - `receive_raw`：读取 `probe_raw` 已经宣告过的当前帧，写入 `buf` 的前
///   `buf.len()` 字节；调用方（`Handle`）保证 `buf.len()` 等于待读帧大小；
/// - `shutdown`：按方向执行半关闭；写方向关闭必须先发出一个 0 长度帧（EOS）。
pub trait Channel: Send + Sync {
    /// 连接标识，用于日志与调度层的 `notify_yield`/`notify_close` 查找。
    fn id(&self) -> u64;

    fn peer_addr(&self) -> Option<String>;

    fn send(&self, payload: &[u8]) -> Result<()>;

    fn probe_raw(&self, blocking: bool) -> Result<u64>;

    fn receive_raw(&self, buf: &mut [u8]) -> Result<usize>;

    fn shutdown(&self, direction: ShutdownDirection) -> Result<()>;
}

/// 传输驱动接口：监听、建连与后台推进（spec.md §4.1、§6.2）。
pub trait TransportDriver: Send + Sync {
    /// 驱动对应的协议名，用于地址前缀匹配（spec.md §6.1）。
    fn scheme(&self) -> &'static str;

    /// 启动驱动级资源（套接字、环形缓冲区等）。
    fn init(&self) -> Result<()> {
        Ok(())
    }

    /// 开始接受匹配 `endpoint` 的入站连接。
    fn listen(&self, endpoint: &str) -> Result<()>;

    /// 建立一条到 `address` 的连接，`timeout` 为单次尝试的超时。
    fn connect(&self, address: &str, timeout: Duration) -> Result<std::sync::Arc<dyn Channel>>;

    /// 非阻塞推进：接受新连接、检测可读 handle，并把事件推入 `queue`。
    ///
    /// 必须可以安全地被后台进度线程反复调用，且单次调用不得阻塞超过一个有界
    /// 轮询间隔（spec.md §4.1）。
    fn update(&self, queue: &DispatchQueue) -> Result<()>;

    /// 运行时重新获得某 handle 的控制权后，驱动需要重新武装就绪检测。
    fn notify_yield(&self, channel_id: u64);

    /// 按方向在驱动层执行半关闭/全关闭。
    fn notify_close(&self, channel_id: u64, close_wr: bool, close_rd: bool);

    /// 排空并关闭所有 handle，释放驱动级资源。
    fn end(&self) -> Result<()> {
        Ok(())
    }
}
