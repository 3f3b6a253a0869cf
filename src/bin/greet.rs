use std::time::Duration;

use anyhow::anyhow;
use strand::coroutine::{Resume, Step};
use strand::task::{run, Task};
use strand::timer::Timer;

fn trigger() -> Task<()> {
    let mut started = false;
    Task::from_fn(move |_| {
        if !started {
            started = true;
            Step::Yield
        } else {
            Step::Failed(anyhow!("TriggerError"))
        }
    })
}

fn greet(name: &str) -> Task<String> {
    let name = name.to_owned();
    let mut stage = 0;
    Task::from_fn(move |input: Resume| {
        stage += 1;
        match stage {
            1 => Step::wait(Timer::sleep(Duration::from_millis(500))),
            _ => match input.into_value::<()>() {
                Ok(()) => Step::Done(format!("Hello, {name}")),
                Err(error) => Step::Failed(error),
            },
        }
    })
}

fn main() {
    env_logger::init();

    let mut stage = 0;
    let root = Task::from_fn(move |input: Resume| {
        stage += 1;
        match stage {
            1 => Step::wait(trigger()),
            2 => {
                if let Resume::Throw(error) = input {
                    println!("Got error: {error}, ignored!");
                }
                Step::wait(greet("world"))
            }
            _ => match input.into_value::<String>() {
                Ok(greeting) => Step::Done(greeting),
                Err(error) => Step::Failed(error),
            },
        }
    });

    match run(root) {
        Ok(greeting) => println!("{greeting}"),
        Err(error) => eprintln!("error: {error}"),
    }
}
