//! `mtcl-core`: 传输无关消息运行时的并发/调度骨架与集合通信层。
//!
//! 这个 crate 刻意不包含任何具体传输介质的实现——TCP、SHM、MQTT、MPI 都是
//! 外部协作者,只需要满足 [`transport::TransportDriver`]/[`transport::Channel`]
//! 这两个能力接口。本 crate 提供的是介质无关的部分：
//! - handle 状态机与分帧（[`handle`]、[`frame`]）；
//! - 调度队列与 Manager 进度线程（[`dispatch`]、[`manager`]）；
//! - 集合通信的团队构建与四种通用算法（[`collective`]）；
//! - 统一错误分类、可注入时钟与配置解析（[`error`]、[`time`]、[`config`]）。
pub mod collective;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod handle;
pub mod manager;
pub mod observability;
pub mod time;
pub mod transport;

pub use error::{ErrorKind, MtclError, Result};
pub use handle::UserHandle;
pub use manager::Manager;
pub use transport::{Channel, ShutdownDirection, TransportDriver};
