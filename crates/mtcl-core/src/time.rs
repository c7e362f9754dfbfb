//! 可注入时钟与退避策略。
//!
//! # 设计背景（Why）
//! - `Manager::connect` 的重试预算与退避窗口依赖可靠的时间来源；直接调用
//!   `std::time::Instant::now()` 会让测试难以复现固定的重试节奏。
//! - 通过 trait 注入时钟，生产环境使用真实时间，测试场景使用可控的虚拟时间。
//!
//! 本模块是同步版本：spec.md §9 明确“无需 async/await”，因此 `sleep` 直接阻塞
//! 调用线程，而不是返回 Future。
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// 抽象可注入的时钟。
pub trait Clock: Send + Sync + 'static {
    /// 返回当前的单调时间点。
    fn now(&self) -> Instant;

    /// 阻塞调用线程，直到指定的持续时间经过。
    fn sleep(&self, duration: Duration);
}

/// 基于标准库的系统时钟。
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// 测试用的可控时钟：`sleep` 不真正阻塞，只累加一个逻辑偏移量。
///
/// # 契约说明（What）
/// - `now()` 返回构造时刻加上所有历史 `sleep` 调用累加的偏移；
/// - 适用于验证 `Manager::connect` 的重试次数与退避窗口，而不必真的等待。
#[derive(Clone)]
pub struct MockClock {
    inner: Arc<Mutex<MockClockState>>,
}

struct MockClockState {
    base: Instant,
    offset: Duration,
}

impl MockClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockClockState {
                base: Instant::now(),
                offset: Duration::ZERO,
            })),
        }
    }

    /// 手动推进虚拟时间，供断言使用。
    pub fn advance(&self, by: Duration) {
        let mut state = self.inner.lock().unwrap();
        state.offset += by;
    }

    pub fn elapsed(&self) -> Duration {
        self.inner.lock().unwrap().offset
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        let state = self.inner.lock().unwrap();
        state.base + state.offset
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// `connect` 的重试预算：最大尝试次数与每次尝试的固定超时、退避窗口。
///
/// # 契约说明（What）
/// - `attempts`：总尝试次数（含首次），`0` 或 `1` 表示不重试；
/// - `per_try_timeout`：单次尝试允许的最长等待；
/// - `backoff`：两次尝试之间的等待时长，当前采用固定窗口而非指数退避 —— 驱动层的
///   `connect` 本身已经是阻塞调用，指数放大窗口对这一规模的重试预算收益有限。
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub per_try_timeout: Duration,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            per_try_timeout: Duration::from_secs(5),
            backoff: Duration::from_millis(100),
        }
    }
}
