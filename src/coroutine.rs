//! The suspension protocol connecting computations to the scheduler.
//!
//! A computation is a value implementing [`Coroutine`]: a resumable state
//! machine that the event loop drives from one suspension point to the
//! next. Each call to [`Coroutine::resume`] advances the computation until
//! it suspends again or terminates, reporting what happened as a [`Step`]:
//!
//! - [`Step::Wait`] hands the scheduler another, possibly not-yet-started,
//!   task whose outcome the computation needs before it can continue.
//! - [`Step::Yield`] cedes the thread without waiting on anything; the
//!   scheduler gives other ready tasks a turn and then resumes the
//!   computation unchanged.
//! - [`Step::Done`] terminates the computation with its final value.
//! - [`Step::Failed`] terminates it with an error.
//!
//! The [`Resume`] argument carries what the scheduler delivers back at the
//! suspension point: the awaited task's value, its failure (thrown into the
//! computation so it can be handled like any other error), or nothing at
//! all for the first resumption and for resumptions after [`Step::Yield`].
//!
//! # Example
//!
//! A computation that counts its own resumptions:
//!
//! ```
//! use strand::coroutine::{Resume, Step};
//! use strand::task::{run, Task};
//!
//! let mut turns = 0;
//! let task = Task::from_fn(move |_input: Resume| {
//!     turns += 1;
//!     if turns < 3 {
//!         Step::Yield
//!     } else {
//!         Step::Done(turns)
//!     }
//! });
//!
//! assert_eq!(run(task).unwrap(), 3);
//! ```

use std::any::Any;

use anyhow::{anyhow, Error};

use crate::task::{AnyTask, Task};

/// A resumable computation: the state machine bound to a task.
///
/// Implementors advance from one suspension point to the next on every
/// [`resume`](Coroutine::resume) call. Returning [`Step::Done`] or
/// [`Step::Failed`] ends the computation; the scheduler never resumes it
/// again afterwards.
pub trait Coroutine {
    /// The computation's final value.
    type Output;

    /// Advance the computation, delivering `input` at the suspension point
    /// it last stopped at.
    fn resume(&mut self, input: Resume) -> Step<Self::Output>;
}

/// What the scheduler delivers when it resumes a computation.
pub enum Resume {
    /// Nothing: the first resumption, or one following [`Step::Yield`].
    Nothing,
    /// The value of the task the computation was waiting on.
    Value(Box<dyn Any>),
    /// The failure of the task the computation was waiting on, thrown at
    /// the suspension point. The computation may handle it and keep
    /// running, or report [`Step::Failed`] to pass it on to its own waiter.
    Throw(Error),
}

impl Resume {
    /// Extract the delivered value, downcast to `T`.
    ///
    /// A thrown failure comes back as `Err`, so a computation that does not
    /// want to handle it can forward the error into [`Step::Failed`] with a
    /// single match arm.
    pub fn into_value<T: 'static>(self) -> Result<T, Error> {
        match self {
            Resume::Value(value) => value
                .downcast::<T>()
                .map(|boxed| *boxed)
                .map_err(|_| anyhow!("awaited value has a different type")),
            Resume::Throw(error) => Err(error),
            Resume::Nothing => Err(anyhow!("no value was delivered")),
        }
    }
}

/// The outcome of resuming a computation: a new suspension point or
/// termination.
pub enum Step<T> {
    /// Suspend until the given task resolves. Its outcome is delivered at
    /// this suspension point by the next [`Resume`].
    Wait(AnyTask),
    /// Suspend without waiting on anything; the scheduler re-queues the
    /// computation behind the other ready tasks.
    Yield,
    /// The computation finished with its final value.
    Done(T),
    /// The computation failed. The error is stored on its task verbatim.
    Failed(Error),
}

impl<T> Step<T> {
    /// Suspend on `child`, erasing its output type.
    pub fn wait<U: 'static>(child: Task<U>) -> Self {
        Step::Wait(child.into())
    }
}

/// Build a [`Coroutine`] from a closure, in the style of
/// [`std::future::poll_fn`].
///
/// The closure owns whatever state the computation keeps between
/// resumptions; a captured stage counter stands in for the suspension
/// points a generator would give for free.
pub fn co_fn<T, F>(f: F) -> CoFn<F>
where
    F: FnMut(Resume) -> Step<T>,
{
    CoFn(f)
}

/// A [`Coroutine`] backed by a closure. Created by [`co_fn`].
pub struct CoFn<F>(F);

impl<T, F> Coroutine for CoFn<F>
where
    F: FnMut(Resume) -> Step<T>,
{
    type Output = T;

    fn resume(&mut self, input: Resume) -> Step<T> {
        (self.0)(input)
    }
}

/// Adapter boxing a coroutine's output so the scheduler can hold
/// heterogeneous tasks behind one trait object.
pub(crate) struct Erased<C>(pub(crate) C);

impl<C> Coroutine for Erased<C>
where
    C: Coroutine,
    C::Output: 'static,
{
    type Output = Box<dyn Any>;

    fn resume(&mut self, input: Resume) -> Step<Box<dyn Any>> {
        match self.0.resume(input) {
            Step::Wait(child) => Step::Wait(child),
            Step::Yield => Step::Yield,
            Step::Done(value) => Step::Done(Box::new(value)),
            Step::Failed(error) => Step::Failed(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::{co_fn, Coroutine, Resume, Step};

    #[test]
    fn a_closure_advances_like_a_state_machine() {
        let mut stage = 0;
        let mut co = co_fn(move |_| {
            stage += 1;
            if stage < 2 {
                Step::Yield
            } else {
                Step::Done(stage)
            }
        });

        assert!(matches!(co.resume(Resume::Nothing), Step::Yield));
        assert!(matches!(co.resume(Resume::Nothing), Step::Done(2)));
    }

    #[test]
    fn into_value_downcasts_the_delivered_value() {
        let input = Resume::Value(Box::new("hi".to_string()));
        assert_eq!(input.into_value::<String>().unwrap(), "hi");
    }

    #[test]
    fn into_value_rejects_the_wrong_type() {
        let input = Resume::Value(Box::new(1u32));
        assert!(input.into_value::<String>().is_err());
    }

    #[test]
    fn into_value_forwards_a_thrown_failure() {
        let input = Resume::Throw(anyhow!("boom"));
        let error = input.into_value::<u32>().unwrap_err();
        assert_eq!(error.to_string(), "boom");
    }
}
