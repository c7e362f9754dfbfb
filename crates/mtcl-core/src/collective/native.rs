//! 原生集合通信扩展点（spec.md §4.6.5、§9 开放问题）。
//!
//! 本仓库不附带任何原生 fabric 驱动（MPI、UCC），因此这里只把契约写下来，供
//! 未来的实现者遵循；没有任何类型实现这个 trait。
//!
//! # 契约说明（What）
//! - 集合头（payload 大小）通过 fabric 原生的单值广播/聚集传输一个 64 位整数；
//!   `0` 是 EOS 哨兵。第二阶段才传输载荷本体。
//! - `finalize` 之前必须先排空任何在途的头部请求（例如根发起的一个尚未完成的
//!   非阻塞 EOS 广播），再销毁通信子/团队——spec.md §9 明确指出原始实现里这一
//!   跨进程关闭顺序没有被正式规定，实现者需要自行决定策略并记录下来。
use crate::error::Result;

pub trait NativeCollective: Send + Sync {
    /// 原生广播/聚集一个 64 位集合头；`0` 表示 EOS。
    fn broadcast_header(&self, header: u64) -> Result<u64>;

    /// 排空在途的头部请求，供 finalize 前调用。
    fn drain_pending_header(&self) -> Result<()>;
}
