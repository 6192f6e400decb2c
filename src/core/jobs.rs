//! 任务系统
//!
//! 固定数量的工作线程从同一个 FIFO 队列中取任务执行。每个任务提交后返回一个
//! [`JobHandle`]，通过它可以阻塞等待结果，也可以在每帧轮询是否完成。
//!
//! 任务 panic 不会导致工作线程退出：panic 被捕获，结果变为 [`JobError::Panicked`]。
//! 丢弃 [`JobSystem`] 时，队列中剩余的任务仍然会被执行完，然后所有工作线程退出。

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, trace, warn};

use super::error::{EngineError, JobError, Result};

type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct QueueState {
    tasks: VecDeque<Task>,
    closed: bool,
}

#[derive(Default)]
struct JobQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl JobQueue {
    fn push(&self, task: Task) -> std::result::Result<(), JobError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(JobError::ShutDown);
        }
        state.tasks.push_back(task);
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /// 阻塞直到取到任务；队列关闭且为空时返回 `None`
    fn pop(&self) -> Option<Task> {
        let mut state = self.state.lock();
        loop {
            if let Some(task) = state.tasks.pop_front() {
                return Some(task);
            }
            if state.closed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }
}

struct JobSlot<R> {
    result: Mutex<Option<std::result::Result<R, JobError>>>,
    done: Condvar,
}

impl<R> JobSlot<R> {
    fn fulfill(&self, value: std::result::Result<R, JobError>) {
        *self.result.lock() = Some(value);
        self.done.notify_all();
    }
}

/// 任务一侧持有的结果槽
///
/// 任务没有执行就被丢弃时写入 [`JobError::Disconnected`]，等待方不会永远阻塞。
struct SlotWriter<R> {
    slot: Option<Arc<JobSlot<R>>>,
}

impl<R> SlotWriter<R> {
    fn fulfill(mut self, value: std::result::Result<R, JobError>) {
        if let Some(slot) = self.slot.take() {
            slot.fulfill(value);
        }
    }
}

impl<R> Drop for SlotWriter<R> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.fulfill(Err(JobError::Disconnected));
        }
    }
}

/// 把任务包装成队列中的 [`Task`]，同时返回它的结果句柄
fn package<R, F>(job: F) -> (Task, JobHandle<R>)
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    let slot = Arc::new(JobSlot {
        result: Mutex::new(None),
        done: Condvar::new(),
    });

    let writer = SlotWriter {
        slot: Some(slot.clone()),
    };
    let task: Task = Box::new(move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(job)).map_err(|payload| {
            let message = panic_message(payload.as_ref());
            error!(message = %message, "Job panicked");
            JobError::Panicked(message)
        });
        writer.fulfill(outcome);
    });

    (task, JobHandle { slot })
}

/// 任务结果句柄
pub struct JobHandle<R> {
    slot: Arc<JobSlot<R>>,
}

impl<R> JobHandle<R> {
    /// 阻塞等待任务完成并取出结果
    pub fn wait(self) -> std::result::Result<R, JobError> {
        let mut result = self.slot.result.lock();
        loop {
            if let Some(value) = result.take() {
                return value;
            }
            self.slot.done.wait(&mut result);
        }
    }

    /// 任务已完成时取出结果，否则返回 `None`
    ///
    /// 结果只能取出一次，之后再调用同样返回 `None`。
    pub fn try_take(&self) -> Option<std::result::Result<R, JobError>> {
        self.slot.result.lock().take()
    }

    pub fn is_finished(&self) -> bool {
        self.slot.result.lock().is_some()
    }
}

/// 任务系统
pub struct JobSystem {
    queue: Arc<JobQueue>,
    workers: Vec<JoinHandle<()>>,
}

impl JobSystem {
    /// 创建任务系统
    ///
    /// `worker_count` 为 0 时使用 CPU 核心数。
    pub fn new(worker_count: usize) -> Result<Self> {
        let worker_count = if worker_count == 0 { num_cpus::get() } else { worker_count };
        let queue = Arc::new(JobQueue::default());

        let workers = (0..worker_count)
            .map(|index| {
                let queue = queue.clone();
                thread::Builder::new()
                    .name(format!("asaogea-worker-{index}"))
                    .spawn(move || worker_loop(queue))
                    .map_err(|e| {
                        EngineError::Initialization(format!("Failed to spawn job worker {index}: {e}"))
                    })
            })
            .collect::<Result<Vec<_>>>();

        // 已经启动的线程需要退出
        let workers = workers.map_err(|e| {
            queue.close();
            e
        })?;

        debug!(workers = worker_count, "Job system started");

        Ok(Self { queue, workers })
    }

    /// 提交一个任务
    pub fn push<R, F>(&self, job: F) -> std::result::Result<JobHandle<R>, JobError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (task, handle) = package(job);
        self.queue.push(task)?;
        Ok(handle)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// 队列中尚未开始执行的任务数量
    pub fn pending(&self) -> usize {
        self.queue.state.lock().tasks.len()
    }
}

impl Drop for JobSystem {
    fn drop(&mut self) {
        self.queue.close();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("Job worker exited abnormally");
            }
        }
        // 所有工作线程都异常退出时队列里可能还有任务，丢弃它们会通知等待方
        let orphaned = std::mem::take(&mut self.queue.state.lock().tasks);
        if !orphaned.is_empty() {
            warn!(jobs = orphaned.len(), "Dropping jobs that never ran");
        }
        drop(orphaned);
        debug!("Job system stopped");
    }
}

fn worker_loop(queue: Arc<JobQueue>) {
    while let Some(task) = queue.pop() {
        trace!("Running job");
        task();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
