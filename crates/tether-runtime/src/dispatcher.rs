#![forbid(unsafe_code)]

//! FIFO work queue bound to the UI-affine thread.
//!
//! Native toolkits deliver events on their own threads and only accept calls
//! on one designated thread. The [`Dispatcher`] is the single crossing point:
//! any thread may enqueue a closure; the closures run, one at a time, on the
//! thread that drains the dispatcher ([`run`](Dispatcher::run) or
//! [`run_pending`](Dispatcher::run_pending)).
//!
//! # Queues
//!
//! | Queue   | Entry point                 | Order                              |
//! |---------|-----------------------------|------------------------------------|
//! | delayed | `enqueue_delayed`, timers   | fire time, ties by enqueue order   |
//! | normal  | `enqueue`                   | FIFO                               |
//! | idle    | `enqueue_with_priority`     | FIFO, only when nothing else ready |
//!
//! Each step of the loop takes the earliest *due* delayed entry if there is
//! one, otherwise the head of the normal queue, otherwise the head of the
//! idle queue.
//!
//! # Invariants
//!
//! 1. **FIFO**: closures enqueued with the same priority run in enqueue
//!    order, regardless of which threads enqueued them.
//! 2. **Exactly once**: an accepted closure runs once, unless it is a
//!    cancelled delayed closure or the dispatcher is shut down first.
//! 3. **Race-free cancellation**: an entry is removed from the queue under
//!    the lock before it runs. `cancel` returning `true` means it will never
//!    run; `false` means it already started, finished, or was cancelled.
//! 4. **Isolation**: a closure that panics or returns an error is reported to
//!    the failure handler and the loop continues.
//! 5. **Non-blocking producers**: `enqueue*` never waits for the UI thread.
//!
//! # Failure Modes
//!
//! | Mode | Condition | Behavior |
//! |------|-----------|----------|
//! | Enqueue after shutdown | `shutdown()` already called | `Err(DispatchError::ShutDown)` |
//! | Drain off-thread | `run*` from a non-UI thread | `Err(DispatchError::WrongThread)` |
//! | Closure panic | Any panic inside a closure | Reported, loop continues |

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tether_core::ThreadAffinity;
use tether_core::thread_affinity;
use tracing::{debug, debug_span, trace};
use web_time::Instant;

use crate::failure::{self, DispatchError, DispatchFailure, FailureHandler, TaskError, TaskKind};

type Task = Box<dyn FnOnce() -> Result<(), TaskError> + Send>;
type Waker = Arc<dyn Fn() + Send + Sync>;

static NEXT_DISPATCHER_ID: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a dispatcher.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DispatcherConfig {
    /// Name used for the affinity label, the UI thread, and log fields.
    pub name: String,
    /// Maximum closures executed by one `run_pending` call.
    pub max_batch: usize,
    /// Lower bound for timer intervals.
    pub min_timer_interval: Duration,
    /// Handler for failed closures; falls back to the process-wide handler.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub failure_handler: Option<Arc<dyn FailureHandler>>,
}

impl fmt::Debug for DispatcherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherConfig")
            .field("name", &self.name)
            .field("max_batch", &self.max_batch)
            .field("min_timer_interval", &self.min_timer_interval)
            .field("failure_handler", &self.failure_handler.is_some())
            .finish()
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            name: "tether-ui".to_string(),
            max_batch: 256,
            min_timer_interval: Duration::from_millis(10),
            failure_handler: None,
        }
    }
}

impl DispatcherConfig {
    /// Create a config with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the per-call batch limit for `run_pending` (at least 1).
    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch.max(1);
        self
    }

    /// Set the minimum timer interval.
    pub fn with_min_timer_interval(mut self, interval: Duration) -> Self {
        self.min_timer_interval = interval;
        self
    }

    /// Set a dispatcher-local failure handler.
    pub fn with_failure_handler(mut self, handler: Arc<dyn FailureHandler>) -> Self {
        self.failure_handler = Some(handler);
        self
    }
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Scheduling priority for immediate work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    /// Regular work.
    #[default]
    Normal,
    /// Runs only when no normal or due delayed work is waiting.
    Idle,
}

/// Handle to a delayed closure, used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DelayedHandle {
    dispatcher: u64,
    fire_at: Instant,
    seq: u64,
}

impl DelayedHandle {
    /// The instant the closure becomes eligible to run.
    #[must_use]
    pub fn fire_at(&self) -> Instant {
        self.fire_at
    }
}

#[derive(Debug, Default)]
struct TimerState {
    cancelled: AtomicBool,
    pending: Mutex<Option<DelayedHandle>>,
}

/// Handle to a repeating timer.
#[derive(Clone)]
pub struct TimerHandle {
    dispatcher: Weak<Shared>,
    state: Arc<TimerState>,
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl TimerHandle {
    /// Stop the timer. A tick that already started still completes.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::Release);
        let pending = lock(&self.state.pending).take();
        if let (Some(handle), Some(shared)) = (pending, self.dispatcher.upgrade()) {
            shared.cancel(handle);
        }
    }

    /// True once the timer was cancelled or stopped itself.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

struct Job {
    task: Task,
    kind: TaskKind,
}

#[derive(Default)]
struct Queues {
    normal: VecDeque<Task>,
    idle: VecDeque<Task>,
    delayed: BTreeMap<(Instant, u64), Job>,
    next_seq: u64,
    stop_requested: bool,
    shut_down: bool,
}

impl Queues {
    fn take_ready(&mut self, now: Instant) -> Option<Job> {
        let delayed_due = self
            .delayed
            .first_key_value()
            .is_some_and(|((fire_at, _), _)| *fire_at <= now);
        if delayed_due {
            return self.delayed.pop_first().map(|(_, job)| job);
        }
        if let Some(task) = self.normal.pop_front() {
            return Some(Job {
                task,
                kind: TaskKind::Immediate,
            });
        }
        self.idle.pop_front().map(|task| Job {
            task,
            kind: TaskKind::Idle,
        })
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.delayed.first_key_value().map(|((at, _), _)| *at)
    }

    fn len(&self) -> usize {
        self.normal.len() + self.idle.len() + self.delayed.len()
    }
}

struct Shared {
    id: u64,
    config: DispatcherConfig,
    affinity: ThreadAffinity,
    queues: Mutex<Queues>,
    wakeup: Condvar,
    waker: Mutex<Option<Waker>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queues> {
        // Closures never run under this lock.
        lock(&self.queues)
    }

    fn notify(&self) {
        self.wakeup.notify_all();
        let waker = lock(&self.waker).clone();
        if let Some(waker) = waker {
            waker();
        }
    }

    fn push(&self, priority: Priority, task: Task) -> Result<(), DispatchError> {
        {
            let mut queues = self.lock();
            if queues.shut_down {
                return Err(DispatchError::ShutDown);
            }
            match priority {
                Priority::Normal => queues.normal.push_back(task),
                Priority::Idle => queues.idle.push_back(task),
            }
        }
        self.notify();
        Ok(())
    }

    fn push_delayed(
        &self,
        delay: Duration,
        kind: TaskKind,
        task: Task,
    ) -> Result<DelayedHandle, DispatchError> {
        let handle = {
            let mut queues = self.lock();
            if queues.shut_down {
                return Err(DispatchError::ShutDown);
            }
            let seq = queues.next_seq;
            queues.next_seq += 1;
            let fire_at = deadline_after(Instant::now(), delay);
            queues.delayed.insert((fire_at, seq), Job { task, kind });
            DelayedHandle {
                dispatcher: self.id,
                fire_at,
                seq,
            }
        };
        self.notify();
        Ok(handle)
    }

    fn cancel(&self, handle: DelayedHandle) -> bool {
        if handle.dispatcher != self.id {
            return false;
        }
        let removed = self.lock().delayed.remove(&(handle.fire_at, handle.seq));
        // Drop the closure outside the lock; its captures may enqueue on drop.
        removed.is_some()
    }

    fn execute(&self, job: Job) {
        let Job { task, kind } = job;
        let outcome = panic::catch_unwind(AssertUnwindSafe(task));
        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(error)) => DispatchFailure::Errored {
                dispatcher: self.config.name.clone(),
                kind,
                error,
            },
            Err(payload) => DispatchFailure::from_panic(&self.config.name, kind, payload.as_ref()),
        };
        failure::report(self.config.failure_handler.as_ref(), &failure);
    }
}

/// Furthest a deadline is scheduled ahead; longer delays are clamped.
const MAX_DELAY: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay.min(MAX_DELAY))
        .or_else(|| now.checked_add(Duration::from_secs(24 * 60 * 60)))
        .unwrap_or(now)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Multi-producer, single-drainer work queue bound to a UI-affine thread.
///
/// Cloning a `Dispatcher` creates another handle to the same queue.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.shared.config.name)
            .field("pending", &self.pending_count())
            .field("affinity", &self.shared.affinity)
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher whose UI thread is the first thread that drains it.
    #[must_use]
    pub fn new(config: DispatcherConfig) -> Self {
        let affinity = ThreadAffinity::unbound(config.name.clone());
        Self::with_affinity(config, affinity)
    }

    /// Create a dispatcher bound to the calling thread.
    #[must_use]
    pub fn for_current_thread(config: DispatcherConfig) -> Self {
        let affinity = ThreadAffinity::for_current_thread(config.name.clone());
        Self::with_affinity(config, affinity)
    }

    fn with_affinity(config: DispatcherConfig, affinity: ThreadAffinity) -> Self {
        let id = NEXT_DISPATCHER_ID.fetch_add(1, Ordering::Relaxed);
        debug!(name = %config.name, id, "dispatcher created");
        Self {
            shared: Arc::new(Shared {
                id,
                config,
                affinity,
                queues: Mutex::new(Queues::default()),
                wakeup: Condvar::new(),
                waker: Mutex::new(None),
            }),
        }
    }

    /// Dispatcher name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// The configuration this dispatcher was built with.
    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.shared.config
    }

    /// The UI-thread affinity record shared with properties.
    #[must_use]
    pub fn affinity(&self) -> &ThreadAffinity {
        &self.shared.affinity
    }

    /// True if the calling thread is this dispatcher's UI thread.
    #[must_use]
    pub fn is_ui_thread(&self) -> bool {
        self.shared.affinity.is_current()
    }

    /// True if both handles share one queue.
    #[must_use]
    pub fn same_as(&self, other: &Dispatcher) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Register a hook called after every enqueue, from the enqueuing thread.
    ///
    /// Platform glue uses this to wake a native run loop that drives
    /// [`run_pending`](Self::run_pending).
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *lock(&self.shared.waker) = Some(Arc::new(waker));
    }

    /// Remove the wake hook.
    pub fn clear_waker(&self) {
        lock(&self.shared.waker).take();
    }

    // ── Producers ──────────────────────────────────────────────────────

    /// Append a closure to the FIFO. Callable from any thread.
    pub fn enqueue(&self, f: impl FnOnce() + Send + 'static) -> Result<(), DispatchError> {
        self.enqueue_with_priority(Priority::Normal, f)
    }

    /// Append a closure with the given priority.
    pub fn enqueue_with_priority(
        &self,
        priority: Priority,
        f: impl FnOnce() + Send + 'static,
    ) -> Result<(), DispatchError> {
        self.shared.push(
            priority,
            Box::new(move || {
                f();
                Ok(())
            }),
        )
    }

    /// Append a closure whose error is reported to the failure handler.
    pub fn enqueue_fallible(
        &self,
        f: impl FnOnce() -> Result<(), TaskError> + Send + 'static,
    ) -> Result<(), DispatchError> {
        self.shared.push(Priority::Normal, Box::new(f))
    }

    /// Append a closure that runs only if `target` is still alive when its
    /// turn comes. A dropped target silently cancels the call.
    pub fn enqueue_weak<T>(
        &self,
        target: &Arc<T>,
        f: impl FnOnce(&T) + Send + 'static,
    ) -> Result<(), DispatchError>
    where
        T: Send + Sync + 'static,
    {
        let weak = Arc::downgrade(target);
        self.enqueue(move || match weak.upgrade() {
            Some(target) => f(&target),
            None => trace!("weak dispatch target dropped"),
        })
    }

    /// Schedule a closure to run no earlier than `delay` from now.
    pub fn enqueue_delayed(
        &self,
        delay: Duration,
        f: impl FnOnce() + Send + 'static,
    ) -> Result<DelayedHandle, DispatchError> {
        self.shared.push_delayed(
            delay,
            TaskKind::Delayed,
            Box::new(move || {
                f();
                Ok(())
            }),
        )
    }

    /// Cancel a delayed closure.
    ///
    /// Returns `true` if the closure was still waiting and will now never run.
    /// Returns `false` if it already started or finished, was cancelled
    /// before, or belongs to another dispatcher.
    pub fn cancel(&self, handle: DelayedHandle) -> bool {
        let cancelled = self.shared.cancel(handle);
        trace!(seq = handle.seq, cancelled, "delayed task cancel");
        cancelled
    }

    /// Call `tick` every `interval` until it returns `false` or the returned
    /// handle is cancelled.
    ///
    /// At most one tick per timer is pending at any time. Intervals shorter
    /// than the configured minimum are raised to it. A tick that panics stops
    /// the timer.
    pub fn create_timer(
        &self,
        interval: Duration,
        tick: impl FnMut() -> bool + Send + 'static,
    ) -> Result<TimerHandle, DispatchError> {
        let interval = interval.max(self.shared.config.min_timer_interval);
        let state = Arc::new(TimerState::default());
        arm_timer(&self.shared, interval, tick, Arc::clone(&state))?;
        Ok(TimerHandle {
            dispatcher: Arc::downgrade(&self.shared),
            state,
        })
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    /// Number of closures waiting in all queues.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.lock().len()
    }

    /// Make a running [`run`](Self::run) return after its current closure.
    /// Pending work stays queued.
    pub fn stop(&self) {
        self.shared.lock().stop_requested = true;
        self.shared.notify();
    }

    /// Stop the loop, drop all pending work, and reject further enqueues.
    pub fn shutdown(&self) {
        let dropped = {
            let mut queues = self.shared.lock();
            queues.shut_down = true;
            (
                std::mem::take(&mut queues.normal),
                std::mem::take(&mut queues.idle),
                std::mem::take(&mut queues.delayed),
            )
        };
        let count = dropped.0.len() + dropped.1.len() + dropped.2.len();
        // Captured values may enqueue when dropped; the lock is released here.
        drop(dropped);
        debug!(name = %self.shared.config.name, dropped = count, "dispatcher shut down");
        self.shared.notify();
    }

    /// True after [`shutdown`](Self::shutdown).
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shared.lock().shut_down
    }

    // ── Drain ──────────────────────────────────────────────────────────

    /// Execute ready closures without blocking, up to the configured batch
    /// limit. Returns how many ran.
    ///
    /// The first call binds the dispatcher to the calling thread.
    pub fn run_pending(&self) -> Result<usize, DispatchError> {
        let _guard = thread_affinity::enter(&self.shared.affinity)?;
        let mut executed = 0;
        while executed < self.shared.config.max_batch.max(1) {
            let job = self.shared.lock().take_ready(Instant::now());
            let Some(job) = job else { break };
            self.shared.execute(job);
            executed += 1;
        }
        Ok(executed)
    }

    /// Run the loop on the calling thread until [`stop`](Self::stop) or
    /// [`shutdown`](Self::shutdown).
    ///
    /// The first call binds the dispatcher to the calling thread.
    pub fn run(&self) -> Result<(), DispatchError> {
        let _guard = thread_affinity::enter(&self.shared.affinity)?;
        let _span = debug_span!("dispatcher.run", name = %self.shared.config.name).entered();
        loop {
            let job = {
                let mut queues = self.shared.lock();
                loop {
                    if queues.shut_down {
                        return Ok(());
                    }
                    if queues.stop_requested {
                        queues.stop_requested = false;
                        return Ok(());
                    }
                    let now = Instant::now();
                    if let Some(job) = queues.take_ready(now) {
                        break job;
                    }
                    queues = match queues.next_deadline() {
                        Some(deadline) => {
                            let timeout = deadline.saturating_duration_since(now);
                            self.shared
                                .wakeup
                                .wait_timeout(queues, timeout)
                                .unwrap_or_else(|poisoned| poisoned.into_inner())
                                .0
                        }
                        None => self
                            .shared
                            .wakeup
                            .wait(queues)
                            .unwrap_or_else(|poisoned| poisoned.into_inner()),
                    };
                }
            };
            self.shared.execute(job);
        }
    }
}

/// Marks a timer stopped if its tick unwinds.
struct StopOnUnwind<'a>(&'a AtomicBool);

impl Drop for StopOnUnwind<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.store(true, Ordering::Release);
        }
    }
}

fn arm_timer<F>(
    shared: &Arc<Shared>,
    interval: Duration,
    mut tick: F,
    state: Arc<TimerState>,
) -> Result<(), DispatchError>
where
    F: FnMut() -> bool + Send + 'static,
{
    let weak = Arc::downgrade(shared);
    let task_state = Arc::clone(&state);
    let task: Task = Box::new(move || {
        if task_state.cancelled.load(Ordering::Acquire) {
            return Ok(());
        }
        let again = {
            let _stop_on_unwind = StopOnUnwind(&task_state.cancelled);
            tick()
        };
        if !again {
            task_state.cancelled.store(true, Ordering::Release);
            return Ok(());
        }
        // `cancel` may have run inside the tick; it must win over re-arming.
        if task_state.cancelled.load(Ordering::Acquire) {
            return Ok(());
        }
        if let Some(shared) = weak.upgrade() {
            // A failed re-arm means shutdown; the timer simply ends.
            if arm_timer(&shared, interval, tick, Arc::clone(&task_state)).is_err() {
                task_state.cancelled.store(true, Ordering::Release);
            }
        }
        Ok(())
    });
    let handle = shared.push_delayed(interval, TaskKind::Timer, task)?;
    *lock(&state.pending) = Some(handle);
    Ok(())
}
