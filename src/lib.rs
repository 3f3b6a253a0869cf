//! # `strand`: a single-threaded cooperative task scheduler
//!
//! This project implements a minimal cooperative scheduler from first
//! principles, written in as few lines as possible. Its primary goal is to
//! serve as an educational resource: it shows what a runtime does
//! underneath `async`/`await` by building the suspension, resumption and
//! parent-chaining machinery by hand, without any native coroutine support
//! from the language.
//!
//! A computation implements the [`coroutine::Coroutine`] protocol: every
//! resumption advances it to its next suspension point, where it either
//! waits on a child task, cedes its turn, or terminates with a value or an
//! error. The [`task::EventLoop`] owns every submitted task and drives the
//! whole graph with a single FIFO ready queue; a failed child's error is
//! thrown back into its waiter at the exact suspension point, where it can
//! be handled like any other error.
//!
//! For creating and running tasks, refer to the [task] module. The
//! [timer] module provides a ready-made cooperative sleep.
//!
//! ## Example
//!
//! Greeting the world, the long way around:
//!
//! ```
//! use std::time::Duration;
//! use strand::coroutine::{Resume, Step};
//! use strand::task::{run, Task};
//! use strand::timer::Timer;
//!
//! fn greet(name: &str) -> Task<String> {
//!     let name = name.to_owned();
//!     let mut stage = 0;
//!     Task::from_fn(move |input: Resume| {
//!         stage += 1;
//!         match stage {
//!             1 => Step::wait(Timer::sleep(Duration::from_millis(10))),
//!             _ => match input.into_value::<()>() {
//!                 Ok(()) => Step::Done(format!("Hello, {name}")),
//!                 Err(error) => Step::Failed(error),
//!             },
//!         }
//!     })
//! }
//!
//! assert_eq!(run(greet("world")).unwrap(), "Hello, world");
//! ```
pub mod coroutine;
pub mod task;
pub mod timer;
