//! Deferral seam for queued updates.
//!
//! The model never runs work concurrently with itself: a deferred task is a
//! plain closure that a cooperative scheduler runs later on the same thread.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tokio::task::{AbortHandle, LocalSet};

use crate::error::ScheduleError;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + 'static>;

/// Runs tasks later, on the caller's thread.
pub trait Scheduler {
    /// Queue `task` to run after the current unit of work.
    fn defer(&self, task: Task) -> Result<TaskHandle, ScheduleError>;
}

/// Cancellation handle for one deferred task.
pub struct TaskHandle {
    cancelled: Rc<Cell<bool>>,
    abort: Option<AbortHandle>,
}

impl TaskHandle {
    fn new() -> Self {
        Self {
            cancelled: Rc::new(Cell::new(false)),
            abort: None,
        }
    }

    /// Wrap `task` so it does nothing once this handle is cancelled.
    fn guard(&self, task: Task) -> Task {
        let cancelled = Rc::clone(&self.cancelled);
        Box::new(move || {
            if !cancelled.get() {
                task();
            }
        })
    }

    /// Prevent the task from running if it has not run yet.
    pub fn cancel(&self) {
        self.cancelled.set(true);
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }

    /// Whether [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("cancelled", &self.cancelled.get())
            .finish()
    }
}

/// Scheduler backed by a tokio [`LocalSet`].
///
/// Tasks run whenever the set is driven, e.g. by
/// [`LocalSet::run_until`] or [`LocalScheduler::run_until_idle`].
#[derive(Clone, Default)]
pub struct LocalScheduler {
    local: Rc<LocalSet>,
}

impl LocalScheduler {
    /// Create a scheduler over a fresh local set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Share an existing local set.
    pub fn with_local_set(local: Rc<LocalSet>) -> Self {
        Self { local }
    }

    /// The underlying local set.
    pub fn local_set(&self) -> &LocalSet {
        &self.local
    }

    /// Drive the local set for one scheduling round, so every task queued
    /// so far gets to run. Must be called within a tokio runtime.
    pub async fn run_until_idle(&self) {
        self.local.run_until(tokio::task::yield_now()).await;
    }
}

impl Scheduler for LocalScheduler {
    fn defer(&self, task: Task) -> Result<TaskHandle, ScheduleError> {
        let mut handle = TaskHandle::new();
        let task = handle.guard(task);
        let join = self.local.spawn_local(async move { task() });
        handle.abort = Some(join.abort_handle());
        Ok(handle)
    }
}

impl fmt::Debug for LocalScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalScheduler").finish_non_exhaustive()
    }
}

#[derive(Default)]
struct ManualQueue {
    tasks: RefCell<VecDeque<Task>>,
    closed: Cell<bool>,
}

/// FIFO scheduler driven by hand.
///
/// Clones share one queue, so a test can keep a clone to run tasks the
/// model deferred.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Rc<ManualQueue>,
}

impl ManualScheduler {
    /// Create an open, empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks, cancelled ones included.
    pub fn pending(&self) -> usize {
        self.queue.tasks.borrow().len()
    }

    /// Run queued tasks in order until the queue is empty, including tasks
    /// queued while running. Returns how many were dequeued.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.queue.tasks.borrow_mut().pop_front();
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Reject all further tasks. Already queued tasks stay queued.
    pub fn close(&self) {
        self.queue.closed.set(true);
    }

    /// Whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.queue.closed.get()
    }
}

impl Scheduler for ManualScheduler {
    fn defer(&self, task: Task) -> Result<TaskHandle, ScheduleError> {
        if self.is_closed() {
            return Err(ScheduleError::Closed);
        }
        let handle = TaskHandle::new();
        self.queue.tasks.borrow_mut().push_back(handle.guard(task));
        Ok(handle)
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .finish()
    }
}
