//! ### English
//! In-order command stream executed on a dedicated worker thread.
//!
//! ### 中文
//! 在独立工作线程上按顺序执行的命令流。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, unbounded};

use crate::engine::error::{SurfaceError, SurfaceResult};

type Command = Box<dyn FnOnce() + Send + 'static>;

/// ### English
/// Hook returning the artificial delay applied before each command executes.
///
/// ### 中文
/// 返回每条命令执行前人为延迟的钩子。
pub type JitterFn = dyn Fn() -> Duration + Send + Sync;

pub(super) struct Timeline {
    /// ### English
    /// Command sender; dropped first on shutdown so the worker drains and exits.
    ///
    /// ### 中文
    /// 命令发送端；关闭时先 drop，使工作线程排空队列后退出。
    sender: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
    /// ### English
    /// Last marker sequence handed out (0 means none).
    ///
    /// ### 中文
    /// 最近分配的标记序号（0 表示尚未分配）。
    submitted: AtomicU64,
    /// ### English
    /// Highest marker sequence retired by the worker.
    ///
    /// ### 中文
    /// 工作线程已完成的最大标记序号。
    retired: Arc<AtomicU64>,
}

impl Timeline {
    pub(super) fn spawn(label: &str, jitter: Option<Arc<JitterFn>>) -> SurfaceResult<Self> {
        let (sender, receiver) = unbounded::<Command>();
        let worker = thread::Builder::new()
            .name(format!("soft-domain-{label}"))
            .spawn(move || {
                for command in receiver {
                    if let Some(jitter) = &jitter {
                        let delay = jitter();
                        if !delay.is_zero() {
                            thread::sleep(delay);
                        }
                    }
                    command();
                }
            })
            .map_err(|err| {
                SurfaceError::allocation(format!("failed to spawn timeline for {label}: {err}"))
            })?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            submitted: AtomicU64::new(0),
            retired: Arc::new(AtomicU64::new(0)),
        })
    }

    /// ### English
    /// Enqueues `command` behind everything submitted so far.
    ///
    /// ### 中文
    /// 将 `command` 排在目前已提交的所有命令之后。
    pub(super) fn submit(&self, command: impl FnOnce() + Send + 'static) -> SurfaceResult<()> {
        let Some(sender) = &self.sender else {
            return Err(SurfaceError::mapping("timeline is shut down"));
        };
        sender
            .send(Box::new(command))
            .map_err(|_| SurfaceError::mapping("timeline worker has exited"))
    }

    /// ### English
    /// Enqueues a marker and returns its sequence number.
    ///
    /// ### 中文
    /// 入队一个标记并返回其序号。
    pub(super) fn signal(&self) -> SurfaceResult<u64> {
        let seq = self.submitted.fetch_add(1, Ordering::Relaxed) + 1;
        let retired = self.retired.clone();
        self.submit(move || {
            retired.fetch_max(seq, Ordering::Release);
        })
        .map_err(|err| SurfaceError::marker(err.to_string()))?;
        Ok(seq)
    }

    pub(super) fn retired(&self) -> u64 {
        self.retired.load(Ordering::Acquire)
    }

    /// ### English
    /// Blocks until every command submitted before this call has executed.
    ///
    /// ### 中文
    /// 阻塞直到本次调用之前提交的所有命令执行完毕。
    pub(super) fn finish(&self) -> SurfaceResult<()> {
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);
        self.submit(move || {
            let _ = done_tx.send(());
        })?;
        done_rx
            .recv()
            .map_err(|_| SurfaceError::mapping("timeline worker exited before finishing"))
    }
}

impl Drop for Timeline {
    fn drop(&mut self) {
        drop(self.sender.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
