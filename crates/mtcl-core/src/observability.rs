//! 观测门面：围绕 `tracing` 的薄封装，统一字段命名。
//!
//! # 设计意图（Why）
//! - 避免在驱动、调度器与集合层各自选择不同的字段名（`scheme` vs `protocol`），
//!   集中在此模块文档化标签约定。
//!
//! # 使用方式（How）
//! - 调用方不直接写 `tracing::info!/warn!/debug!`宏,而是调用本模块导出的
//!   `log_*` 辅助函数；字段名只在这里出现一次,其余地方通过函数签名强制复用,
//!   不会出现散落各处、拼写互不一致的裸字符串字段名。
use crate::collective::CollectiveKind;
use crate::error::MtclError;

/// span/event 中承载协议名的字段名，例如 `"tcp"`、`"mem"`。
pub const FIELD_SCHEME: &str = "scheme";
/// span/event 中承载 handle 标识的字段名。
pub const FIELD_HANDLE_ID: &str = "handle.id";
/// span/event 中承载集合通信种类的字段名。
pub const FIELD_TEAM_KIND: &str = "team.kind";
/// span/event 中承载参与者 rank 的字段名。
pub const FIELD_TEAM_RANK: &str = "team.rank";

/// 驱动开始监听某个端点。字段名: [`FIELD_SCHEME`]。
pub fn log_listening(scheme: &str, endpoint: &str) {
    tracing::info!(scheme, endpoint, "listening");
}

/// 一次 `connect` 重试尝试失败。字段名: [`FIELD_SCHEME`]。
pub fn log_connect_attempt_failed(attempt: u32, target: &str, scheme: &str, error: &MtclError) {
    tracing::debug!(attempt, target, scheme, error = %error, "connect attempt failed");
}

/// 进度线程里某个驱动的 `update` 调用失败。字段名: [`FIELD_SCHEME`]。
pub fn log_driver_update_failed(scheme: &str, error: &MtclError) {
    tracing::warn!(scheme, error = %error, "driver update failed");
}

/// `finalize(drain=true)` 时某个驱动的 `end` 调用失败。字段名: [`FIELD_SCHEME`]。
pub fn log_driver_end_failed(scheme: &str, error: &MtclError) {
    tracing::warn!(scheme, error = %error, "driver end failed during finalize");
}

/// 一个集合通信团队完成装配。字段名: [`FIELD_TEAM_KIND`]、[`FIELD_TEAM_RANK`]。
pub fn log_team_assembled(kind: CollectiveKind, rank: usize, size: usize) {
    tracing::debug!(team.kind = ?kind, team.rank = rank, size, "team assembled");
}

/// 一个 handle 两端都已关闭，驱动得到了完全关闭通知。字段名: [`FIELD_HANDLE_ID`]。
pub fn log_handle_closed(handle_id: u64, scheme: &str) {
    tracing::debug!(handle.id = handle_id, scheme, "handle closed");
}
