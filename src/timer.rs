//! A wall-clock timer computation.
//!
//! The scheduler has no notion of time, so [`Timer`] is built entirely out
//! of the yield-control suspension: it re-checks the clock every time it is
//! resumed and keeps yielding until its deadline has passed. The whole wait
//! is spent cycling through the ready queue rather than sleeping the
//! thread; that is the accepted cost of keeping time out of the scheduling
//! model.
//!
//! # Example
//!
//! ```
//! use std::time::{Duration, Instant};
//! use strand::task::run;
//! use strand::timer::Timer;
//!
//! let before = Instant::now();
//! run(Timer::sleep(Duration::from_millis(50))).unwrap();
//! assert!(before.elapsed() >= Duration::from_millis(50));
//! ```

use std::time::{Duration, Instant};

use crate::{
    coroutine::{Coroutine, Resume, Step},
    task::Task,
};

/// A computation that resolves once a deadline has passed.
pub struct Timer {
    deadline: Instant,
}

impl Timer {
    /// A task that resolves after at least `duration` has elapsed.
    ///
    /// The wait is cooperative: the task yields its turn on every
    /// resumption until the deadline, so other ready tasks keep running.
    /// It is guaranteed to wait for *at least* `duration`; it can wait
    /// longer, depending on how busy the queue is.
    #[must_use]
    pub fn sleep(duration: Duration) -> Task<()> {
        Task::from_coroutine(Timer {
            deadline: Instant::now() + duration,
        })
    }
}

impl Coroutine for Timer {
    type Output = ();

    fn resume(&mut self, _input: Resume) -> Step<()> {
        if Instant::now() < self.deadline {
            Step::Yield
        } else {
            Step::Done(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        rc::Rc,
        time::{Duration, Instant},
    };

    use crate::{
        coroutine::{Coroutine, Resume, Step},
        task::{run, Task},
    };

    use super::Timer;

    #[test]
    fn sleep_simple() {
        let before = Instant::now();
        run(Timer::sleep(Duration::from_millis(50))).unwrap();
        assert!(before.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn zero_sleep_resolves_on_the_first_resumption() {
        run(Timer::sleep(Duration::ZERO)).unwrap();
    }

    #[test]
    fn sleep_spins_through_the_scheduler() {
        let turns = Rc::new(RefCell::new(0));
        let counter = turns.clone();

        let mut timer = Timer {
            deadline: Instant::now() + Duration::from_millis(20),
        };
        let task = Task::from_fn(move |input| {
            *counter.borrow_mut() += 1;
            timer.resume(input)
        });

        run(task).unwrap();
        assert!(*turns.borrow() > 1);
    }

    #[test]
    fn greet_after_a_cooperative_sleep() {
        fn greet(name: &str) -> Task<String> {
            let name = name.to_owned();
            let mut stage = 0;
            Task::from_fn(move |input: Resume| {
                stage += 1;
                match stage {
                    1 => Step::wait(Timer::sleep(Duration::from_millis(20))),
                    _ => match input.into_value::<()>() {
                        Ok(()) => Step::Done(format!("Hello, {name}")),
                        Err(error) => Step::Failed(error),
                    },
                }
            })
        }

        assert_eq!(run(greet("world")).unwrap(), "Hello, world");
    }
}
