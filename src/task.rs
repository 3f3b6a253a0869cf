//! Task and execution management.
//!
//! This module provides the two halves of the scheduler: [`Task`], the unit
//! of schedulable work, and [`EventLoop`], the single-threaded driver that
//! runs a whole graph of tasks to completion. A task bundles a resumable
//! computation (see the [`coroutine`](crate::coroutine) module), an
//! optional link to the task waiting on its outcome, and the write-once
//! outcome itself.
//!
//! The loop is an explicit value: construct one and call
//! [`EventLoop::run_until_complete`], or use the [`run`] shorthand for the
//! common one-root case. There is no ambient global loop; a drained loop
//! holds no state, so a fresh one per top-level call costs nothing.
//!
//! # Example
//!
//! ```
//! use strand::coroutine::Step;
//! use strand::task::{run, Task};
//!
//! let task = Task::from_fn(|_| Step::Done(2 + 8));
//! assert_eq!(run(task).unwrap(), 10);
//! ```
//!
//! Waiting on a child task suspends the waiter until the child's outcome
//! is delivered back at the suspension point:
//!
//! ```
//! use strand::coroutine::{Resume, Step};
//! use strand::task::{run, Task};
//!
//! fn answer() -> Task<u32> {
//!     Task::from_fn(|_| Step::Done(21))
//! }
//!
//! let mut stage = 0;
//! let root = Task::from_fn(move |input: Resume| {
//!     stage += 1;
//!     match stage {
//!         1 => Step::wait(answer()),
//!         _ => match input.into_value::<u32>() {
//!             Ok(n) => Step::Done(n * 2),
//!             Err(error) => Step::Failed(error),
//!         },
//!     }
//! });
//!
//! assert_eq!(run(root).unwrap(), 42);
//! ```
//!
//! The same loop can drive tasks back to back:
//!
//! ```
//! use strand::coroutine::Step;
//! use strand::task::{EventLoop, Task};
//!
//! let mut el = EventLoop::new();
//! let x: u32 = el.run_until_complete(Task::from_fn(|_| Step::Done(21))).unwrap();
//! let y: u32 = el.run_until_complete(Task::from_fn(|_| Step::Done(21))).unwrap();
//! assert_eq!(x + y, 42);
//! ```

use std::{any::Any, collections::VecDeque, fmt, marker::PhantomData};

use log::trace;
use slab::Slab;
use thiserror::Error;

use crate::coroutine::{co_fn, Coroutine, Erased, Resume, Step};

/// Violation of one of the write-once contracts on a [`Task`].
///
/// These are programming errors, not runtime failures: the scheduler never
/// handles them internally and lets them surface to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UsageError {
    /// A continuation was attached to a task that already has one.
    #[error("continuation is already attached")]
    AlreadyAttached,
    /// A task was scheduled without a continuation to run.
    #[error("no continuation is attached")]
    NotAttached,
    /// A parent was recorded on a task that already has one.
    #[error("parent is already set")]
    ParentAlreadySet,
    /// An outcome was written to a task that already has one.
    #[error("outcome is already written")]
    AlreadyResolved,
    /// A result was read from a task that has not resolved.
    #[error("task has not resolved yet")]
    Pending,
}

/// Why a task's result is unavailable or unsuccessful.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A write-once contract was violated; see [`UsageError`].
    #[error(transparent)]
    Usage(#[from] UsageError),
    /// The computation failed. Carries the error it reported, verbatim.
    #[error(transparent)]
    Computation(anyhow::Error),
}

/// Handle to a task owned by an [`EventLoop`].
///
/// Parent links between tasks are stored as ids into the loop's arena
/// rather than as references, so no task is ever aliased by another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskId(usize);

enum Outcome {
    Pending,
    Value(Box<dyn Any>),
    Failed(anyhow::Error),
}

/// The type-erased core of a task: the continuation, the parent link and
/// the write-once outcome. This is what the event loop's arena holds.
pub(crate) struct TaskState {
    continuation: Option<Box<dyn Coroutine<Output = Box<dyn Any>>>>,
    parent: Option<TaskId>,
    outcome: Outcome,
}

impl TaskState {
    fn new() -> Self {
        Self {
            continuation: None,
            parent: None,
            outcome: Outcome::Pending,
        }
    }

    fn is_done(&self) -> bool {
        !matches!(self.outcome, Outcome::Pending)
    }

    fn set_parent(&mut self, parent: TaskId) -> Result<(), UsageError> {
        if self.parent.is_some() {
            return Err(UsageError::ParentAlreadySet);
        }
        self.parent = Some(parent);
        Ok(())
    }

    fn resolve(&mut self, value: Box<dyn Any>) -> Result<(), UsageError> {
        if self.is_done() {
            return Err(UsageError::AlreadyResolved);
        }
        self.outcome = Outcome::Value(value);
        Ok(())
    }

    fn fail(&mut self, error: anyhow::Error) -> Result<(), UsageError> {
        if self.is_done() {
            return Err(UsageError::AlreadyResolved);
        }
        self.outcome = Outcome::Failed(error);
        Ok(())
    }

    fn into_result<T: 'static>(self) -> Result<T, TaskError> {
        match self.outcome {
            Outcome::Value(value) => Ok(*value
                .downcast::<T>()
                .expect("outcome was written by a coroutine with this output type")),
            Outcome::Failed(error) => Err(TaskError::Computation(error)),
            Outcome::Pending => Err(UsageError::Pending.into()),
        }
    }
}

/// A unit of schedulable, suspendable work and its eventual outcome.
///
/// A task owns a continuation (the computation), an optional link to the
/// task waiting on it, and a write-once outcome. All three may be set at
/// most once; violating that is a [`UsageError`].
///
/// `T` is the type of the final value the attached computation produces.
/// Inside the scheduler values travel type-erased; the parameter pins the
/// type back down at the edges, when the task is built and when its result
/// is read.
pub struct Task<T> {
    state: TaskState,
    _out: PhantomData<fn() -> T>,
}

impl<T: 'static> Task<T> {
    /// Create an empty, pending task with no continuation attached.
    pub fn new() -> Self {
        Self {
            state: TaskState::new(),
            _out: PhantomData,
        }
    }

    /// Create a task with `coroutine` already attached.
    ///
    /// The computation does not start here; it first runs once an
    /// [`EventLoop`] schedules the task.
    pub fn from_coroutine<C>(coroutine: C) -> Self
    where
        C: Coroutine<Output = T> + 'static,
    {
        let mut task = Self::new();
        task.state.continuation = Some(Box::new(Erased(coroutine)));
        task
    }

    /// Create a task from a closure; see [`co_fn`].
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnMut(Resume) -> Step<T> + 'static,
    {
        Self::from_coroutine(co_fn(f))
    }

    /// Bind the computation this task will run.
    ///
    /// Fails if a continuation is already attached.
    pub fn attach<C>(&mut self, coroutine: C) -> Result<(), UsageError>
    where
        C: Coroutine<Output = T> + 'static,
    {
        if self.state.continuation.is_some() {
            return Err(UsageError::AlreadyAttached);
        }
        self.state.continuation = Some(Box::new(Erased(coroutine)));
        Ok(())
    }

    /// Record the task waiting on this one.
    ///
    /// The event loop calls this when the task is first yielded at a
    /// suspension point; it is not normally called by hand. Fails if a
    /// parent is already recorded.
    pub fn set_parent(&mut self, parent: TaskId) -> Result<(), UsageError> {
        self.state.set_parent(parent)
    }

    /// Write the task's outcome as a success.
    ///
    /// Fails if the outcome was already written.
    pub fn resolve(&mut self, value: T) -> Result<(), UsageError> {
        self.state.resolve(Box::new(value))
    }

    /// Write the task's outcome as a failure.
    ///
    /// Fails if the outcome was already written.
    pub fn fail(&mut self, error: anyhow::Error) -> Result<(), UsageError> {
        self.state.fail(error)
    }

    /// Whether the outcome has been written.
    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    /// Consume the task and return its outcome: the resolved value, the
    /// stored failure verbatim, or [`UsageError::Pending`] if it never
    /// resolved.
    pub fn result(self) -> Result<T, TaskError> {
        self.state.into_result()
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("attached", &self.state.continuation.is_some())
            .field("parent", &self.state.parent)
            .field("done", &self.state.is_done())
            .finish()
    }
}

/// A [`Task`] with its output type erased, as carried by
/// [`Step::Wait`](crate::coroutine::Step::Wait).
pub struct AnyTask(pub(crate) TaskState);

impl<T: 'static> From<Task<T>> for AnyTask {
    fn from(task: Task<T>) -> Self {
        AnyTask(task.state)
    }
}

/// The single-threaded scheduler.
///
/// The loop owns every task handed to it in a [`Slab`] arena and keeps a
/// FIFO queue of task ids awaiting a scheduling decision. Among tasks with
/// no dependency on each other, execution order is queue order; a task
/// waiting on a child is resumed only once the child's outcome has been
/// delivered back to it.
///
/// Scheduling is strictly cooperative and non-preemptive: a resumed
/// computation runs uninterrupted until its next suspension point, so no
/// locking exists anywhere in the loop.
pub struct EventLoop {
    tasks: Slab<TaskState>,
    ready: VecDeque<TaskId>,
}

impl EventLoop {
    /// Create an empty loop.
    pub fn new() -> Self {
        Self {
            tasks: Slab::new(),
            ready: VecDeque::new(),
        }
    }

    /// Submit `task` and drive the scheduler until every reachable task has
    /// resolved, then return `task`'s outcome.
    ///
    /// This is the only blocking call: from the caller's point of view the
    /// whole continuation graph rooted at `task` runs to completion inside
    /// it. A failure stored on the root task is returned as
    /// [`TaskError::Computation`], verbatim.
    pub fn run_until_complete<T: 'static>(&mut self, task: Task<T>) -> Result<T, TaskError> {
        let root = self.insert(task.state);
        self.ready.push_back(root);

        let driven = self.drive();
        let finished = self.tasks.remove(root.0);
        driven?;

        finished.into_result()
    }

    /// One scheduling decision per iteration until the queue drains.
    fn drive(&mut self) -> Result<(), UsageError> {
        while let Some(id) = self.ready.pop_front() {
            if !self.tasks[id.0].is_done() {
                // Runnable as-is: its first turn, or re-queued after a
                // yield.
                self.step(id, Resume::Nothing)?;
                continue;
            }

            let Some(parent) = self.tasks[id.0].parent else {
                // Finished with no waiter; the outcome stays with whoever
                // holds the task.
                trace!("task {} finished with no waiter", id.0);
                continue;
            };

            // Finished with a waiter: discard the task and hand its outcome
            // up the chain.
            let finished = self.tasks.remove(id.0);
            let input = match finished.outcome {
                Outcome::Value(value) => Resume::Value(value),
                Outcome::Failed(error) => Resume::Throw(error),
                Outcome::Pending => unreachable!("checked is_done above"),
            };
            self.step(parent, input)?;
        }

        Ok(())
    }

    /// Resume one task and react to how it suspends or terminates.
    fn step(&mut self, id: TaskId, input: Resume) -> Result<(), UsageError> {
        let mut continuation = self.tasks[id.0]
            .continuation
            .take()
            .ok_or(UsageError::NotAttached)?;

        match continuation.resume(input) {
            Step::Done(value) => {
                trace!("task {} resolved", id.0);
                self.tasks[id.0].resolve(value)?;
                // Re-queued so a later iteration can deliver the value to
                // the parent.
                self.ready.push_back(id);
            }
            Step::Failed(error) => {
                trace!("task {} failed: {error}", id.0);
                self.tasks[id.0].fail(error)?;
                self.ready.push_back(id);
            }
            Step::Wait(child) => {
                self.tasks[id.0].continuation = Some(continuation);
                let mut state = child.0;
                state.set_parent(id)?;
                let child_id = self.insert(state);
                trace!("task {} waits on task {}", id.0, child_id.0);
                // The waiter is not re-queued; it becomes runnable again
                // only when the child's outcome is delivered to it.
                self.ready.push_back(child_id);
            }
            Step::Yield => {
                trace!("task {} yielded", id.0);
                self.tasks[id.0].continuation = Some(continuation);
                self.ready.push_back(id);
            }
        }

        Ok(())
    }

    fn insert(&mut self, state: TaskState) -> TaskId {
        TaskId(self.tasks.insert(state))
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `task` on a fresh [`EventLoop`] and block until it resolves.
///
/// Returns the task's final value, or the failure its computation reported.
pub fn run<T: 'static>(task: Task<T>) -> Result<T, TaskError> {
    EventLoop::new().run_until_complete(task)
}
