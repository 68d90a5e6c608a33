//! Coalescing queue for layout saves.
//!
//! Layout mutations arrive in synchronous bursts. The first mutation of a burst schedules one
//! task on the injected spawner and later ones are absorbed. The task yields once before building
//! its job, so it observes the state left by the last mutation of the burst. At most one job runs
//! at a time: a mutation that arrives while a save is in flight marks the queue dirty, and the
//! running task saves again once the current save has finished.

use std::{
    cell::{Cell, RefCell},
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use futures::{
    future::LocalBoxFuture,
    task::{LocalSpawn, LocalSpawnExt},
};
use leptos::logging;

/// Future that returns `Pending` once, waking itself, then completes.
#[derive(Debug, Default)]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Yields control back to the executor once.
pub fn yield_now() -> YieldNow {
    YieldNow::default()
}

type SaveJob = Box<dyn FnOnce() -> LocalBoxFuture<'static, ()>>;

#[derive(Default)]
struct QueueState {
    scheduled: Cell<bool>,
    running: Cell<bool>,
    dirty: Cell<bool>,
    job: RefCell<Option<SaveJob>>,
}

#[derive(Clone)]
/// Single-flight scheduler for debounced work.
pub struct LayoutSaveQueue {
    spawner: Rc<dyn LocalSpawn>,
    state: Rc<QueueState>,
}

impl LayoutSaveQueue {
    /// Creates a queue running jobs on `spawner`.
    pub fn new(spawner: Rc<dyn LocalSpawn>) -> Self {
        Self {
            spawner,
            state: Rc::new(QueueState::default()),
        }
    }

    /// Returns `true` while a job is waiting to start, including a rerun queued behind a running
    /// job.
    pub fn is_pending(&self) -> bool {
        self.state.scheduled.get() || self.state.dirty.get()
    }

    /// Returns `true` while a job is running.
    pub fn is_running(&self) -> bool {
        self.state.running.get()
    }

    /// Schedules `job`, replacing any job that has not started yet. Returns `true` when a new task
    /// was spawned.
    ///
    /// The job is built after the yield, so it reads whatever state is current then. While a job
    /// is running, `job` is kept for a single rerun after it finishes.
    pub fn schedule<F>(&self, job: F) -> bool
    where
        F: FnOnce() -> LocalBoxFuture<'static, ()> + 'static,
    {
        let state = &self.state;
        state.job.replace(Some(Box::new(job)));
        if state.running.get() {
            state.dirty.set(true);
            return false;
        }
        if state.scheduled.replace(true) {
            return false;
        }
        let task_state = state.clone();
        let spawned = self.spawner.spawn_local(async move {
            loop {
                yield_now().await;
                task_state.scheduled.set(false);
                task_state.dirty.set(false);
                let Some(job) = task_state.job.borrow_mut().take() else {
                    break;
                };
                task_state.running.set(true);
                job().await;
                task_state.running.set(false);
                if !task_state.dirty.get() {
                    break;
                }
                task_state.scheduled.set(true);
            }
        });
        if let Err(err) = spawned {
            logging::warn!("scheduling layout save failed: {err:?}");
            state.scheduled.set(false);
            state.job.replace(None);
            return false;
        }
        true
    }
}

impl std::fmt::Debug for LayoutSaveQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutSaveQueue")
            .field("pending", &self.is_pending())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use futures::{channel::oneshot, executor::LocalPool, FutureExt};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn burst_collapses_into_one_job_reading_last_state() {
        let mut pool = LocalPool::new();
        let queue = LayoutSaveQueue::new(Rc::new(pool.spawner()));
        let state = Rc::new(Cell::new(0));
        let saved = Rc::new(RefCell::new(Vec::new()));

        for value in 1..=3 {
            state.set(value);
            let state = state.clone();
            let saved = saved.clone();
            queue.schedule(move || {
                saved.borrow_mut().push(state.get());
                async {}.boxed_local()
            });
        }
        assert!(queue.is_pending());
        state.set(4);

        pool.run_until_stalled();
        assert_eq!(*saved.borrow(), vec![4]);
        assert!(!queue.is_pending());

        let again = saved.clone();
        assert!(queue.schedule(move || {
            again.borrow_mut().push(5);
            async {}.boxed_local()
        }));
        pool.run_until_stalled();
        assert_eq!(*saved.borrow(), vec![4, 5]);
    }

    #[test]
    fn mutation_during_running_job_waits_and_reruns_with_latest_state() {
        let mut pool = LocalPool::new();
        let queue = LayoutSaveQueue::new(Rc::new(pool.spawner()));
        let state = Rc::new(Cell::new(1));
        let saved = Rc::new(RefCell::new(Vec::new()));
        let in_flight = Rc::new(Cell::new(0));
        let max_in_flight = Rc::new(Cell::new(0));
        let releases = Rc::new(RefCell::new(Vec::new()));

        let schedule = |queue: &LayoutSaveQueue| {
            let state = state.clone();
            let saved = saved.clone();
            let in_flight = in_flight.clone();
            let max_in_flight = max_in_flight.clone();
            let releases = releases.clone();
            queue.schedule(move || {
                let value = state.get();
                let (release, released) = oneshot::channel::<()>();
                releases.borrow_mut().push(release);
                in_flight.set(in_flight.get() + 1);
                max_in_flight.set(max_in_flight.get().max(in_flight.get()));
                async move {
                    let _ = released.await;
                    saved.borrow_mut().push(value);
                    in_flight.set(in_flight.get() - 1);
                }
                .boxed_local()
            })
        };

        assert!(schedule(&queue));
        pool.run_until_stalled();
        assert!(queue.is_running());
        assert_eq!(releases.borrow().len(), 1);

        state.set(2);
        assert!(!schedule(&queue));
        state.set(3);
        assert!(!schedule(&queue));
        assert!(queue.is_pending());
        pool.run_until_stalled();
        assert_eq!(releases.borrow().len(), 1);

        let first = releases.borrow_mut().remove(0);
        let _ = first.send(());
        pool.run_until_stalled();
        assert_eq!(*saved.borrow(), vec![1]);
        assert_eq!(releases.borrow().len(), 1);

        let second = releases.borrow_mut().remove(0);
        let _ = second.send(());
        pool.run_until_stalled();
        assert_eq!(*saved.borrow(), vec![1, 3]);
        assert_eq!(max_in_flight.get(), 1);
        assert!(!queue.is_pending());
        assert!(!queue.is_running());
    }
}
