//! Timers for actors that move on their own.
//!
//! A [`Scheduler`] owns one worker thread and a queue of pending tasks ordered by due
//! time. A task runs, then tells the scheduler when it wants to run again (or that it is
//! done). Every task is paired with a [`TimerHandle`]; once cancelled, the task is never
//! started again.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::cell::Cell;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::error::GameResult;

thread_local! {
    /// Set on scheduler worker threads
    static ON_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// Cancellation flag shared between a scheduled task and whoever controls it.
#[derive(Debug, Clone, Default)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prevents every future run of the task. A run already in progress is not interrupted.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// A task body. Receives its own handle; returns the delay until its next run, or `None`
/// when it is finished.
type Task = Box<dyn FnMut(&TimerHandle) -> Option<Duration> + Send>;

struct Job {
    due: Instant,
    /// Tie breaker so jobs due at the same instant run in submission order
    seq: u64,
    timer: TimerHandle,
    task: Task,
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Job {}

impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Job {
    // Reversed: BinaryHeap is a max-heap, the earliest job must come out first
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct Queue {
    jobs: BinaryHeap<Job>,
    next_seq: u64,
    shutdown: bool,
}

impl Queue {
    fn push(&mut self, due: Instant, timer: TimerHandle, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.jobs.push(Job { due, seq, timer, task });
    }
}

struct Shared {
    queue: Mutex<Queue>,
    wake: Condvar,
}

/// A single worker thread running self-rescheduling tasks.
///
/// Dropping the scheduler stops the worker; pending tasks are discarded. The drop waits
/// for a running task to return, unless it happens on a scheduler worker itself.
pub struct Scheduler {
    name: String,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawns the worker thread.
    pub fn new(name: &str) -> GameResult<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue::default()),
            wake: Condvar::new(),
        });

        let worker = thread::Builder::new().name(name.to_string()).spawn({
            let shared = Arc::clone(&shared);
            move || run(&shared)
        })?;

        debug!(scheduler = name, "Scheduler started");
        Ok(Self {
            name: name.to_string(),
            shared,
            worker: Some(worker),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs `task` after `delay`, then again after whatever delay each run returns.
    ///
    /// The returned handle cancels the whole chain.
    pub fn schedule_repeating<F>(&self, delay: Duration, task: F) -> TimerHandle
    where
        F: FnMut(&TimerHandle) -> Option<Duration> + Send + 'static,
    {
        let timer = TimerHandle::new();
        self.shared
            .queue
            .lock()
            .push(Instant::now() + delay, timer.clone(), Box::new(task));
        self.shared.wake.notify_one();

        trace!(scheduler = %self.name, ?delay, "Task scheduled");
        timer
    }

    /// The number of tasks waiting for their next run, cancelled ones included.
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().jobs.len()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shared.queue.lock().shutdown = true;
        self.shared.wake.notify_all();

        // A task may own the last reference to any scheduler, its own included. Joining
        // from there could wait on a task that waits on us; the worker exits by itself.
        if let Some(worker) = self.worker.take() {
            if !ON_WORKER.with(Cell::get) {
                let _ = worker.join();
            }
        }
        debug!(scheduler = %self.name, "Scheduler stopped");
    }
}

fn run(shared: &Shared) {
    ON_WORKER.with(|flag| flag.set(true));
    let mut queue = shared.queue.lock();
    loop {
        if queue.shutdown {
            break;
        }

        let Some(due) = queue.jobs.peek().map(|job| job.due) else {
            shared.wake.wait(&mut queue);
            continue;
        };

        if due > Instant::now() {
            shared.wake.wait_until(&mut queue, due);
            continue;
        }

        let Some(mut job) = queue.jobs.pop() else {
            continue;
        };
        if job.timer.is_cancelled() {
            continue;
        }

        let next = MutexGuard::unlocked(&mut queue, || (job.task)(&job.timer));
        if let Some(delay) = next {
            if !job.timer.is_cancelled() {
                queue.push(Instant::now() + delay, job.timer, job.task);
            }
        }
    }
}
