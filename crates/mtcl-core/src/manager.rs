//! 运行时门面：驱动注册、进度线程、`listen`/`connect`/`get_next`/`finalize`（C5）。
//!
//! # 设计意图（Why）
//! - 原始实现把这一层建成一个静态单例（`Manager::getInstance()`）；本 crate
//!   按 spec.md §9 "Global Manager state" 的再设计指引，把单例状态收敛进一个
//!   显式的 `Manager` 类型，允许测试构造多个互相独立的实例。
//! - 进度线程是唯一隐藏的并发实体：应用线程只通过 `Manager` 的方法与之交互，
//!   不直接触碰驱动或调度队列。
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::collective::{build_team, CollectiveKind, Team};
use crate::config::ConfigurationSource;
use crate::dispatch::DispatchQueue;
use crate::error::{ErrorKind, MtclError, Result};
use crate::handle::{Busy, HandleCore, SharedHandle, UserHandle};
use crate::time::{Clock, RetryPolicy, SystemClock};
use crate::transport::{parse_address, TransportDriver};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

enum Lifecycle {
    BeforeInit,
    Running,
    Finalized,
}

struct ProgressThread {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

/// 一个 Manager 实例：驱动注册表、调度队列、进度线程与（可选）配置解析器。
///
/// 构造多个实例彼此完全独立，这是本仓库相对原始静态单例设计的刻意简化
/// （spec.md §9 "prefer ... allow multiple Manager instances for testability"）。
pub struct Manager {
    drivers: Mutex<HashMap<&'static str, Arc<dyn TransportDriver>>>,
    queue: Arc<DispatchQueue>,
    progress: Mutex<Option<ProgressThread>>,
    config: Mutex<Option<Box<dyn ConfigurationSource>>>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    lifecycle: Mutex<Lifecycle>,
}

impl Manager {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            drivers: Mutex::new(HashMap::new()),
            queue: Arc::new(DispatchQueue::new()),
            progress: Mutex::new(None),
            config: Mutex::new(None),
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
            lifecycle: Mutex::new(Lifecycle::BeforeInit),
        }
    }

    /// 注册一个驱动工厂实例。必须在 `init` 之前调用（spec.md §6.5 "Static
    /// registration of driver factories is permitted before init"；原始实现：
    /// `registerType<T>(name)`）。
    pub fn register_driver(&self, driver: Arc<dyn TransportDriver>) -> Result<()> {
        let mut drivers = self.drivers.lock().unwrap();
        if matches!(*self.lifecycle.lock().unwrap(), Lifecycle::Running | Lifecycle::Finalized) {
            return Err(MtclError::invalid_state("drivers must be registered before init"));
        }
        drivers.insert(driver.scheme(), driver);
        Ok(())
    }

    pub fn set_configuration(&self, source: Box<dyn ConfigurationSource>) {
        *self.config.lock().unwrap() = Some(source);
    }

    /// 幂等初始化：对每个已注册驱动调用 `init()`，启动唯一的进度线程。
    pub fn init(&self, _app_name: &str) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().unwrap();
        if matches!(*lifecycle, Lifecycle::Running) {
            return Ok(());
        }
        if matches!(*lifecycle, Lifecycle::Finalized) {
            return Err(MtclError::invalid_state("Manager already finalized"));
        }
        for driver in self.drivers.lock().unwrap().values() {
            driver.init()?;
        }
        self.spawn_progress_thread();
        *lifecycle = Lifecycle::Running;
        Ok(())
    }

    fn spawn_progress_thread(&self) {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);
        let queue = Arc::clone(&self.queue);
        let drivers: Vec<Arc<dyn TransportDriver>> =
            self.drivers.lock().unwrap().values().cloned().collect();
        let poll_interval = self.poll_interval;
        let join = std::thread::Builder::new()
            .name("mtcl-progress".into())
            .spawn(move || {
                while !stop_clone.load(Ordering::Acquire) {
                    for driver in &drivers {
                        if let Err(err) = driver.update(&queue) {
                            crate::observability::log_driver_update_failed(driver.scheme(), &err);
                        }
                    }
                    std::thread::sleep(poll_interval);
                }
            })
            .expect("failed to spawn mtcl progress thread");
        *self.progress.lock().unwrap() = Some(ProgressThread {
            stop,
            join: Some(join),
        });
    }

    fn require_running(&self) -> Result<()> {
        match *self.lifecycle.lock().unwrap() {
            Lifecycle::Running => Ok(()),
            Lifecycle::BeforeInit => Err(MtclError::invalid_state("Manager has not been initialized")),
            Lifecycle::Finalized => Err(MtclError::invalid_state("Manager already finalized")),
        }
    }

    fn driver_for_scheme(&self, scheme: &str) -> Result<Arc<dyn TransportDriver>> {
        self.drivers
            .lock()
            .unwrap()
            .get(scheme)
            .cloned()
            .ok_or_else(|| {
                MtclError::new(ErrorKind::UnknownScheme, format!("no driver registered for scheme '{scheme}'"))
            })
    }

    /// 开始监听。`target` 要么是 `SCHEME:rest` 直接地址,要么是一个符号化组件
    /// 名——后者会查配置源里该组件自己声明的 `listen-endpoints`,依次监听每一个
    /// （spec.md §6.4 "listen with no endpoint uses the component's own
    /// entries"）。
    pub fn listen(&self, target: &str) -> Result<()> {
        self.require_running()?;
        if parse_address(target).is_ok() {
            return self.listen_address(target);
        }
        let endpoints = match self.config.lock().unwrap().as_ref() {
            Some(source) => source.listen_endpoints(target),
            None => Vec::new(),
        };
        if endpoints.is_empty() {
            return Err(MtclError::invalid_argument(format!(
                "'{target}' is not a SCHEME:rest address and no configured listen-endpoints were found for it"
            )));
        }
        for endpoint in &endpoints {
            self.listen_address(endpoint)?;
        }
        Ok(())
    }

    fn listen_address(&self, endpoint: &str) -> Result<()> {
        let parsed = parse_address(endpoint)?;
        let driver = self.driver_for_scheme(parsed.scheme)?;
        crate::observability::log_listening(parsed.scheme, endpoint);
        driver.listen(parsed.rest)
    }

    fn resolve(&self, target: &str) -> Result<String> {
        if parse_address(target).is_ok() {
            return Ok(target.to_string());
        }
        let registered: Vec<&str> = self.drivers.lock().unwrap().keys().copied().collect();
        let config = self.config.lock().unwrap();
        match config.as_ref() {
            Some(source) => source
                .resolve(target, &registered)
                .ok_or_else(|| MtclError::invalid_argument(format!("no component named '{target}' with a registered driver"))),
            None => Err(MtclError::invalid_argument(format!(
                "'{target}' is not a SCHEME:rest address and no configuration source is set"
            ))),
        }
    }

    /// 连接到 `target`：要么是 `SCHEME:rest` 直接地址，要么是走解析器的符号名。
    pub fn connect(&self, target: &str, retry: RetryPolicy) -> Result<UserHandle> {
        self.require_running()?;
        let address = self.resolve(target)?;
        let parsed = parse_address(&address)?;
        let driver = self.driver_for_scheme(parsed.scheme)?;

        let attempts = retry.attempts.max(1);
        let mut last_err = None;
        for attempt in 0..attempts {
            match driver.connect(parsed.rest, retry.per_try_timeout) {
                Ok(channel) => {
                    let core = HandleCore::new(driver.scheme(), Arc::clone(&driver), channel, Busy::Application);
                    return Ok(UserHandle::new(SharedHandle::new(core), true, false));
                }
                Err(err) => {
                    crate::observability::log_connect_attempt_failed(attempt, target, parsed.scheme, &err);
                    let retryable = err.kind().is_retryable();
                    last_err = Some(err);
                    if !retryable || attempt + 1 == attempts {
                        break;
                    }
                    self.clock.sleep(retry.backoff);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| MtclError::new(ErrorKind::Unreachable, "connect failed")))
    }

    /// 阻塞直到一个就绪事件可用，返回一个应用可见的 handle。
    pub fn get_next(&self) -> Result<UserHandle> {
        self.require_running()?;
        match self.queue.pop_blocking() {
            Some(event) => Ok(UserHandle::new(event.handle, true, event.is_new_connection)),
            None => Err(MtclError::invalid_state("Manager finalized while waiting for get_next")),
        }
    }

    /// 返回某个 handle 所属的注册驱动名（原始实现：`getTypeOfHandle`）。
    pub fn scheme_of(&self, handle: &UserHandle) -> Option<&'static str> {
        handle.scheme()
    }

    /// 构造一个集合通信团队（C7/C8，见 spec.md §4.7）。
    ///
    /// `local_name` 是调用方自己在 `participants` 中的标识：原始规范把根/非根的
    /// 区分留给了应用逻辑（哪一侧调用 `listen`，哪一侧调用 `connect`），这里把它
    /// 显式化为一个参数,使 `Manager` 的这一方法可独立实现、可测试。
    pub fn create_team(
        &self,
        participants: &[String],
        root_name: &str,
        local_name: &str,
        kind: CollectiveKind,
        retry: RetryPolicy,
    ) -> Result<Team> {
        self.require_running()?;
        build_team(self, participants, root_name, local_name, kind, retry)
    }

    /// 停止进度线程，按 `drain` 决定是否先排空所有驱动，销毁注册表。
    pub fn finalize(&self, drain: bool) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().unwrap();
        if matches!(*lifecycle, Lifecycle::Finalized) {
            return Err(MtclError::invalid_state("finalize called twice"));
        }
        if matches!(*lifecycle, Lifecycle::BeforeInit) {
            *lifecycle = Lifecycle::Finalized;
            return Ok(());
        }
        if let Some(mut progress) = self.progress.lock().unwrap().take() {
            progress.stop.store(true, Ordering::Release);
            if let Some(join) = progress.join.take() {
                let _ = join.join();
            }
        }
        self.queue.terminate();
        if drain {
            for driver in self.drivers.lock().unwrap().values() {
                if let Err(err) = driver.end() {
                    crate::observability::log_driver_end_failed(driver.scheme(), &err);
                }
            }
        }
        *lifecycle = Lifecycle::Finalized;
        Ok(())
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}
