//! Background tasks with a single-threaded completion queue.
//!
//! Work runs on its own thread. Progress and completion travel back over an
//! mpsc channel and are only acted on when the owner calls
//! [`TaskQueue::poll`] or [`TaskQueue::wait_all`], so completion callbacks
//! always run on the owning thread, in arrival order.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;
use web_time::Instant;

/// Errors delivered to completion callbacks or returned by the queue.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("A task named '{0}' is already running")]
    AlreadyRunning(String),

    #[error("Task was cancelled")]
    Cancelled,

    #[error("Task panicked: {0}")]
    Panicked(String),

    #[error("Could not start worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Identifier of a spawned task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared cancellation flag, checked cooperatively by the worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

enum TaskEvent {
    Progress {
        id: TaskId,
        fraction: f32,
        message: String,
    },
    Finished {
        id: TaskId,
        result: Result<Box<dyn Any + Send>, TaskError>,
    },
}

/// Progress reporter handed to a worker.
#[derive(Clone)]
pub struct Progress {
    id: TaskId,
    tx: Option<mpsc::Sender<TaskEvent>>,
}

impl Progress {
    /// A reporter connected to nothing, for running work inline.
    pub fn detached() -> Self {
        Self { id: TaskId(0), tx: None }
    }

    /// Report completion as a fraction in `[0, 1]` with a status message.
    pub fn report(&self, fraction: f32, message: impl Into<String>) {
        let Some(tx) = &self.tx else {
            return;
        };
        // the queue may already be gone; nothing left to tell
        let _ = tx.send(TaskEvent::Progress {
            id: self.id,
            fraction: fraction.clamp(0.0, 1.0),
            message: message.into(),
        });
    }
}

/// Snapshot of a running task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInfo {
    pub id: TaskId,
    pub name: String,
    pub progress: f32,
    pub message: String,
    pub elapsed: Duration,
}

type Completion = Box<dyn FnOnce(Result<Box<dyn Any + Send>, TaskError>)>;

struct RunningTask {
    name: String,
    progress: f32,
    message: String,
    started: Instant,
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
    on_complete: Completion,
}

/// Owns background tasks and dispatches their completions.
pub struct TaskQueue {
    tx: mpsc::Sender<TaskEvent>,
    rx: mpsc::Receiver<TaskEvent>,
    running: HashMap<TaskId, RunningTask>,
    /// Running task ids in spawn order
    order: Vec<TaskId>,
    next_id: u64,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            running: HashMap::new(),
            order: Vec::new(),
            next_id: 1,
        }
    }

    /// Start `work` on a worker thread.
    ///
    /// `on_complete` runs later on the thread that polls the queue. It
    /// receives the work's output, [`TaskError::Cancelled`] if the task was
    /// cancelled, or [`TaskError::Panicked`] if the worker panicked.
    pub fn spawn<T, W, C>(&mut self, name: &str, work: W, on_complete: C) -> Result<TaskId, TaskError>
    where
        T: Send + 'static,
        W: FnOnce(&CancelToken, &Progress) -> T + Send + 'static,
        C: FnOnce(Result<T, TaskError>) + 'static,
    {
        if self.running.values().any(|t| t.name == name) {
            return Err(TaskError::AlreadyRunning(name.to_string()));
        }

        let id = TaskId(self.next_id);
        self.next_id += 1;

        let cancel = CancelToken::new();
        let progress = Progress {
            id,
            tx: Some(self.tx.clone()),
        };
        let tx = self.tx.clone();
        let worker_cancel = cancel.clone();

        let handle = std::thread::Builder::new()
            .name(format!("task-{}", name))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    work(&worker_cancel, &progress)
                }));
                let result = match outcome {
                    Ok(_) if worker_cancel.is_cancelled() => Err(TaskError::Cancelled),
                    Ok(value) => Ok(Box::new(value) as Box<dyn Any + Send>),
                    Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
                };
                let _ = tx.send(TaskEvent::Finished { id, result });
            })?;

        let task_name = name.to_string();
        let on_complete: Completion = Box::new(move |result| {
            let result = result.and_then(|boxed| match boxed.downcast::<T>() {
                Ok(value) => Ok(*value),
                Err(_) => Err(TaskError::Panicked(format!(
                    "task '{}' returned an unexpected type",
                    task_name
                ))),
            });
            on_complete(result);
        });

        log::debug!("Started task {} '{}'", id, name);
        self.running.insert(
            id,
            RunningTask {
                name: name.to_string(),
                progress: 0.0,
                message: String::new(),
                started: Instant::now(),
                cancel,
                handle: Some(handle),
                on_complete,
            },
        );
        self.order.push(id);
        Ok(id)
    }

    /// Request cancellation. Returns false if no such task is running.
    pub fn cancel(&self, id: TaskId) -> bool {
        match self.running.get(&id) {
            Some(task) => {
                log::info!("Cancelling task {} '{}'", id, task.name);
                task.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for task in self.running.values() {
            task.cancel.cancel();
        }
    }

    pub fn is_running(&self, id: TaskId) -> bool {
        self.running.contains_key(&id)
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_empty()
    }

    /// Running tasks in spawn order.
    pub fn tasks(&self) -> Vec<TaskInfo> {
        self.order
            .iter()
            .filter_map(|id| self.running.get(id).map(|t| (id, t)))
            .map(|(id, t)| TaskInfo {
                id: *id,
                name: t.name.clone(),
                progress: t.progress,
                message: t.message.clone(),
                elapsed: t.started.elapsed(),
            })
            .collect()
    }

    /// Handle every event that has arrived, without blocking.
    ///
    /// Returns the number of completion callbacks run.
    pub fn poll(&mut self) -> usize {
        let mut completed = 0;
        while let Ok(event) = self.rx.try_recv() {
            if self.handle(event) {
                completed += 1;
            }
        }
        completed
    }

    /// Block until every running task has completed.
    pub fn wait_all(&mut self) -> usize {
        let mut completed = self.poll();
        while !self.running.is_empty() {
            // the queue holds a sender, so this only fails if that is gone
            let Ok(event) = self.rx.recv() else {
                break;
            };
            if self.handle(event) {
                completed += 1;
            }
        }
        completed
    }

    fn handle(&mut self, event: TaskEvent) -> bool {
        match event {
            TaskEvent::Progress {
                id,
                fraction,
                message,
            } => {
                if let Some(task) = self.running.get_mut(&id) {
                    log::trace!("Task {} at {:.0}%: {}", id, fraction * 100.0, message);
                    task.progress = fraction;
                    task.message = message;
                }
                false
            }
            TaskEvent::Finished { id, result } => {
                let Some(mut task) = self.running.remove(&id) else {
                    return false;
                };
                self.order.retain(|t| *t != id);
                if let Some(handle) = task.handle.take() {
                    // the worker has sent its last message
                    let _ = handle.join();
                }
                match &result {
                    Ok(_) => log::info!(
                        "Task '{}' finished in {:.2?}",
                        task.name,
                        task.started.elapsed()
                    ),
                    Err(e) => log::warn!("Task '{}' ended: {}", task.name, e),
                }
                (task.on_complete)(result);
                true
            }
        }
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        if !self.running.is_empty() {
            log::debug!("Dropping queue with {} running task(s)", self.running.len());
            self.cancel_all();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
