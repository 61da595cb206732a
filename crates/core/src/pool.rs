use std::collections::VecDeque;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool needs at least one worker")]
    NoWorkers,
    #[error("worker pool is shut down; job rejected")]
    Closed,
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("worker pool lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub workers: usize,
    pub submitted: u64,
    pub executed: u64,
    pub panicked: u64,
}

struct QueueState<J> {
    jobs: VecDeque<J>,
    stopping: bool,
}

struct Shared<J> {
    state: Mutex<QueueState<J>>,
    available: Condvar,
    submitted: AtomicU64,
    executed: AtomicU64,
    panicked: AtomicU64,
}

impl<J> Shared<J> {
    fn lock(&self) -> MutexGuard<'_, QueueState<J>> {
        // Handlers never run under this lock, so a poisoned guard still holds a consistent queue.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct WorkerPool<J: Send + 'static> {
    shared: Arc<Shared<J>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl<J: Send + 'static> WorkerPool<J> {
    pub fn new<F>(workers: usize, handler: F) -> Result<Self, PoolError>
    where
        F: Fn(J) + Send + Sync + 'static,
    {
        if workers == 0 {
            return Err(PoolError::NoWorkers);
        }

        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                stopping: false,
            }),
            available: Condvar::new(),
            submitted: AtomicU64::new(0),
            executed: AtomicU64::new(0),
            panicked: AtomicU64::new(0),
        });
        let handler = Arc::new(handler);

        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let worker_shared = Arc::clone(&shared);
            let worker_handler = Arc::clone(&handler);
            let spawned = thread::Builder::new()
                .name(format!("organize-worker-{index}"))
                .spawn(move || worker_loop(index, &worker_shared, worker_handler.as_ref()));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    stop_and_join(&shared, handles);
                    return Err(PoolError::Spawn(err));
                }
            }
        }

        debug!("worker pool started with {workers} worker(s)");
        Ok(Self {
            shared,
            workers: Mutex::new(handles),
            worker_count: workers,
        })
    }

    pub fn submit(&self, job: J) -> Result<(), PoolError> {
        {
            let mut state = self
                .shared
                .state
                .lock()
                .map_err(|_| PoolError::Poisoned)?;
            if state.stopping {
                return Err(PoolError::Closed);
            }
            state.jobs.push_back(job);
            self.shared.submitted.fetch_add(1, Ordering::Relaxed);
        }
        self.shared.available.notify_one();
        Ok(())
    }

    // Drains the queue before joining. A second call returns Closed.
    pub fn shutdown(&self) -> Result<PoolStats, PoolError> {
        {
            let mut state = self.shared.lock();
            if state.stopping {
                return Err(PoolError::Closed);
            }
            state.stopping = true;
        }
        self.shared.available.notify_all();

        let handles = {
            let mut workers = self.workers.lock().map_err(|_| PoolError::Poisoned)?;
            std::mem::take(&mut *workers)
        };
        for handle in handles {
            if handle.join().is_err() {
                error!("worker thread terminated abnormally");
            }
        }

        let stats = self.stats();
        debug!(
            "worker pool drained: submitted={} executed={} panicked={}",
            stats.submitted, stats.executed, stats.panicked
        );
        Ok(stats)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.worker_count,
            submitted: self.shared.submitted.load(Ordering::Relaxed),
            executed: self.shared.executed.load(Ordering::Relaxed),
            panicked: self.shared.panicked.load(Ordering::Relaxed),
        }
    }

    pub fn pending(&self) -> usize {
        self.shared.lock().jobs.len()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().stopping
    }
}

impl<J: Send + 'static> Drop for WorkerPool<J> {
    fn drop(&mut self) {
        if !self.is_closed() {
            let _ = self.shutdown();
        }
    }
}

fn worker_loop<J, F>(index: usize, shared: &Shared<J>, handler: &F)
where
    F: Fn(J),
{
    debug!("worker {index} started");
    loop {
        let job = {
            let mut state = shared.lock();
            loop {
                if let Some(job) = state.jobs.pop_front() {
                    break Some(job);
                }
                if state.stopping {
                    break None;
                }
                state = shared
                    .available
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        let Some(job) = job else {
            debug!("worker {index} stopping");
            return;
        };

        if panic::catch_unwind(AssertUnwindSafe(|| handler(job))).is_err() {
            error!("worker {index}: job handler panicked");
            shared.panicked.fetch_add(1, Ordering::Relaxed);
        }
        shared.executed.fetch_add(1, Ordering::Relaxed);
    }
}

fn stop_and_join<J>(shared: &Shared<J>, handles: Vec<JoinHandle<()>>) {
    shared.lock().stopping = true;
    shared.available.notify_all();
    for handle in handles {
        let _ = handle.join();
    }
}
