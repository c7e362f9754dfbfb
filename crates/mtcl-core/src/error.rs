//! 统一错误域：`MtclError` 与 `ErrorKind`。
//!
//! # 设计背景（Why）
//! - 驱动、调度器与集合通信层产生的故障需要合流为一套稳定的错误分类，
//!   使上层代码可以按语义分支处理，而不是解析字符串。
//! - `ErrorKind` 的成员与 spec.md §7 的错误分类一一对应，保持机读稳定性。
//!
//! # 契约说明（What）
//! - `MtclError::code()` 返回 `'static` 字符串，遵循 `mtcl.<area>.<reason>` 命名；
//! - `kind()` 返回结构化分类，供 `Manager::connect` 的重试循环和集合层的状态机使用；
//! - `would_block`/`end_of_stream` 等构造器是热路径上的便捷入口，避免每次都手写 `MtclError::new`。
use std::borrow::Cow;
use std::fmt;

/// 错误分类，与 spec.md §7 的错误分类一一对应。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    UnknownScheme,
    WouldBlock,
    MessageTooLarge,
    Unreachable,
    Timeout,
    PeerReset,
    EndOfStream,
    InvalidState,
    Io,
}

impl ErrorKind {
    /// 是否应当触发 `Manager::connect` 的退避重试。
    ///
    /// 仅 `Unreachable`/`Timeout`/`Io` 被视为可重试；其余分类是协议/调用约定层面的
    /// 错误，重试无法改变结果。
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Unreachable | Self::Timeout | Self::Io)
    }

    const fn code(self) -> &'static str {
        match self {
            Self::InvalidArgument => "mtcl.core.invalid_argument",
            Self::UnknownScheme => "mtcl.manager.unknown_scheme",
            Self::WouldBlock => "mtcl.handle.would_block",
            Self::MessageTooLarge => "mtcl.handle.message_too_large",
            Self::Unreachable => "mtcl.transport.unreachable",
            Self::Timeout => "mtcl.transport.timeout",
            Self::PeerReset => "mtcl.handle.peer_reset",
            Self::EndOfStream => "mtcl.handle.end_of_stream",
            Self::InvalidState => "mtcl.core.invalid_state",
            Self::Io => "mtcl.transport.io_error",
        }
    }
}

/// `mtcl-core` 的统一错误类型。
///
/// 刻意不使用 `thiserror` 的 derive：错误码与分类是本类型的核心契约，
/// 消息与底层原因只是诊断附加项，手写 `Display`/`source` 更贴合这一侧重。
pub struct MtclError {
    kind: ErrorKind,
    message: Cow<'static, str>,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl MtclError {
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn would_block(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::WouldBlock, message)
    }

    pub fn invalid_state(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidState, message)
    }

    pub fn invalid_argument(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for MtclError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MtclError")
            .field("code", &self.kind.code())
            .field("message", &self.message)
            .finish()
    }
}

impl fmt::Display for MtclError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)
    }
}

impl std::error::Error for MtclError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

pub type Result<T> = core::result::Result<T, MtclError>;
