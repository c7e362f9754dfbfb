//! 调度队列：驱动产生的就绪事件，经同一把锁+条件变量交付给 `get_next`。
//!
//! 对应 spec.md C4：一个驱动在单次 `update()` 中推送的事件在队列中保持产生
//! 顺序；跨驱动之间不保证相对顺序，只保证整体 FIFO。
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use crate::handle::SharedHandle;

/// 一个就绪事件：是否为新建立的连接，以及对应的底层 handle。
pub struct DispatchEvent {
    pub is_new_connection: bool,
    pub handle: SharedHandle,
}

struct QueueState {
    events: VecDeque<DispatchEvent>,
    terminated: bool,
}

/// 线程安全的 FIFO 事件队列，生产者为各驱动的 `update()`，消费者为
/// `Manager::get_next` 的任意调用线程。
pub struct DispatchQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                events: VecDeque::new(),
                terminated: false,
            }),
            not_empty: Condvar::new(),
        }
    }

    /// 推送一个就绪事件，唤醒一个等待中的消费者。
    pub fn push(&self, event: DispatchEvent) {
        let mut state = self.state.lock().unwrap();
        if state.terminated {
            return;
        }
        state.events.push_back(event);
        drop(state);
        self.not_empty.notify_one();
    }

    /// 阻塞直到事件可用或队列被终止；终止后返回 `None`。
    pub fn pop_blocking(&self) -> Option<DispatchEvent> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(event) = state.events.pop_front() {
                return Some(event);
            }
            if state.terminated {
                return None;
            }
            state = self.not_empty.wait(state).unwrap();
        }
    }

    /// 唤醒所有阻塞中的消费者并阻止后续 `pop_blocking` 再次阻塞
    /// （`Manager::finalize` 使用）。
    pub fn terminate(&self) {
        let mut state = self.state.lock().unwrap();
        state.terminated = true;
        drop(state);
        self.not_empty.notify_all();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().events.len()
    }
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}
