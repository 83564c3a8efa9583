//! The delegate thread through which every parallel region runs.
//!
//! A [`Worker`] owns one background OS thread and one `rayon` pool. Callers hand it a
//! closure with [`Worker::delegate`] and block until the closure has finished; the
//! closure receives the pool and performs its own fork-join inside it. Only one
//! delegated closure runs at a time per worker, so the number of compute threads in
//! the process stays bounded no matter how many callers start traversals.

use std::{
    mem,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError},
    thread::{self, JoinHandle, ThreadId},
};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};

use crate::{
    config::EngineConfig,
    error::{OlapError, Result},
};

type Job = Box<dyn FnOnce(&ThreadPool) + Send + 'static>;

#[derive(Default)]
struct State {
    job: Option<Job>,
    submitted: u64,
    completed: u64,
    stopping: bool,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    cv: Condvar,
}

impl Shared {
    // Jobs never unwind through the lock, so poisoning carries no information here.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        self.cv.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }
}

/// A dedicated thread that executes delegated parallel regions one at a time.
pub struct Worker {
    shared: Arc<Shared>,
    pool: Arc<ThreadPool>,
    handle: Option<JoinHandle<()>>,
    thread_id: ThreadId,
    config: EngineConfig,
}

static SHARED_WORKER: OnceLock<Arc<Worker>> = OnceLock::new();

impl Worker {
    /// Starts a worker: one delegate thread plus a pool of `config.resolved_threads()` threads.
    ///
    /// # Errors
    /// [`OlapError::InvalidConfig`] for an invalid configuration, [`OlapError::ThreadPool`]
    /// or [`OlapError::Spawn`] if the threads cannot be created.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let threads = config.resolved_threads();
        let prefix = config.thread_name.clone();
        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(move |i| format!("{prefix}-{i}"))
                .build()?,
        );
        let shared = Arc::new(Shared::default());
        let handle = thread::Builder::new()
            .name(format!("{}-delegate", config.thread_name))
            .spawn({
                let shared = Arc::clone(&shared);
                let pool = Arc::clone(&pool);
                move || run(&shared, &pool)
            })?;
        let thread_id = handle.thread().id();
        debug!(threads, name = %config.thread_name, "olap worker started");
        Ok(Self {
            shared,
            pool,
            handle: Some(handle),
            thread_id,
            config: config.clone(),
        })
    }

    /// The process-wide worker, created on first use from [`EngineConfig::from_env`].
    ///
    /// # Errors
    /// Any error from [`EngineConfig::from_env`] or [`Worker::new`] on first use.
    pub fn shared() -> Result<Arc<Worker>> {
        if let Some(worker) = SHARED_WORKER.get() {
            return Ok(Arc::clone(worker));
        }
        let worker = Arc::new(Worker::new(&EngineConfig::from_env()?)?);
        // A racing initializer may win; its worker is used and ours is dropped.
        Ok(Arc::clone(SHARED_WORKER.get_or_init(|| worker)))
    }

    /// Runs `f` on the delegate thread and blocks until it returns.
    ///
    /// If another closure is in flight, waits for it first. A panic inside `f` is
    /// resumed on the calling thread.
    ///
    /// # Errors
    /// [`OlapError::NestedDelegate`] if called from this worker's delegate thread or
    /// from one of its pool threads; such a call could never be scheduled.
    pub fn delegate<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&ThreadPool) -> R + Send,
        R: Send,
    {
        if thread::current().id() == self.thread_id || self.pool.current_thread_index().is_some() {
            return Err(OlapError::NestedDelegate);
        }

        let mut slot: Option<thread::Result<R>> = None;
        {
            let out = &mut slot;
            let job: Box<dyn FnOnce(&ThreadPool) + Send + '_> = Box::new(move |pool| {
                *out = Some(panic::catch_unwind(AssertUnwindSafe(|| f(pool))));
            });
            // SAFETY: this frame blocks below until the delegate thread has run and
            // dropped the job, so every borrow captured by it outlives its use.
            let job: Job = unsafe { mem::transmute(job) };

            let mut state = self.shared.lock();
            while state.job.is_some() {
                state = self.shared.wait(state);
            }
            state.job = Some(job);
            state.submitted += 1;
            let ticket = state.submitted;
            self.shared.cv.notify_all();
            while state.completed < ticket {
                state = self.shared.wait(state);
            }
        }

        match slot {
            Some(Ok(value)) => Ok(value),
            Some(Err(payload)) => panic::resume_unwind(payload),
            None => unreachable!("delegated job completed without storing a result"),
        }
    }

    /// Delegates `work` with exclusive access to a caller-owned compute object.
    ///
    /// # Errors
    /// As [`Worker::delegate`].
    pub fn delegate_compute<C, F, R>(&self, work: F, compute: &mut C) -> Result<R>
    where
        C: Send,
        F: FnOnce(&ThreadPool, &mut C) -> R + Send,
        R: Send,
    {
        self.delegate(move |pool| work(pool, compute))
    }

    /// Configuration this worker was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of threads in the pool used inside delegated regions.
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

fn run(shared: &Shared, pool: &ThreadPool) {
    let mut state = shared.lock();
    loop {
        if let Some(job) = state.job.take() {
            drop(state);
            job(pool);
            state = shared.lock();
            state.completed += 1;
            shared.cv.notify_all();
            continue;
        }
        if state.stopping {
            break;
        }
        state = shared.wait(state);
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shared.lock().stopping = true;
        self.shared.cv.notify_all();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(name = %self.config.thread_name, "olap worker thread panicked");
            }
        }
        debug!(name = %self.config.thread_name, "olap worker stopped");
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.config.thread_name)
            .field("threads", &self.num_threads())
            .finish_non_exhaustive()
    }
}
