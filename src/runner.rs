/*!
  Run mode: a periodic task that steps the machine at a fixed interval until
  it halts or is cancelled.

  The loop owns the only source of ticks, so two steps can never overlap: a
  step that overruns the interval simply makes the next tick fire immediately
  instead of concurrently. The machine is locked for exactly one step per
  tick, and the update callback observes the settled snapshot taken while the
  lock is still held, so a renderer never sees partial state. Cancellation
  (`stop` or drop) takes effect between ticks; there is no in-flight step to
  cancel because each step completes synchronously.
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::machine::{Machine, StepOutcome};

pub struct Runner {
  cancel :  Arc<AtomicBool>,
  handle :  Option<JoinHandle<()>>,
}

impl Runner {
  /**
    Starts stepping `machine` every `interval`. `input` is sampled once per
    tick and feeds IN; `on_update` sees the snapshot after every completed
    step. The loop exits on halt or cancellation.
  */
  pub fn spawn<I, F>(
    machine   : Arc<Mutex<Machine>>,
    interval  : Duration,
    mut input : I,
    mut on_update : F,
  ) -> Runner
  where
    I: FnMut() -> u8 + Send + 'static,
    F: FnMut(&crate::machine::Snapshot) + Send + 'static,
  {
    let cancel = Arc::new(AtomicBool::new(false));
    let cancelled = Arc::clone(&cancel);

    let handle = thread::spawn(move || {
      while !cancelled.load(Ordering::Acquire) {
        let tick_started = Instant::now();
        {
          // A poisoned lock means a step panicked; stop driving the machine.
          let mut locked = match machine.lock() {
            Ok(guard) => guard,
            Err(_)    => break,
          };
          match locked.step(input()) {
            StepOutcome::Halted  => break,
            StepOutcome::Stepped => on_update(&locked.snapshot()),
          }
        }
        if let Some(remaining) = interval.checked_sub(tick_started.elapsed()) {
          thread::sleep(remaining);
        }
      }
    });

    Runner { cancel, handle: Some(handle) }
  }

  pub fn is_running(&self) -> bool {
    self.handle.as_ref().map_or(false, |handle| !handle.is_finished())
  }

  /// Cancels the loop and waits for it to wind down.
  pub fn stop(mut self) {
    self.shutdown();
  }

  fn shutdown(&mut self) {
    self.cancel.store(true, Ordering::Release);
    if let Some(handle) = self.handle.take() {
      let _ = handle.join();
    }
  }
}

impl Drop for Runner {
  fn drop(&mut self) {
    self.shutdown();
  }
}

#[cfg(test)]
mod tests {
  use std::sync::mpsc;

  use crate::isa::Register;

  use super::*;

  #[test]
  fn runs_a_program_to_halt() {
    let mut machine = Machine::new();
    machine.load_source("SET 2A\nOUT\n").unwrap();
    let machine = Arc::new(Mutex::new(machine));

    let (updates, seen) = mpsc::channel();
    let runner = Runner::spawn(
      Arc::clone(&machine),
      Duration::from_millis(1),
      || 0,
      move |snapshot| { let _ = updates.send(snapshot.pc); },
    );

    // Halting stops the loop on its own.
    let deadline = Instant::now() + Duration::from_secs(5);
    while runner.is_running() && Instant::now() < deadline {
      thread::sleep(Duration::from_millis(1));
    }
    assert!(!runner.is_running());
    runner.stop();

    let locked = machine.lock().unwrap();
    assert!(locked.halted());
    assert_eq!(locked.rs(), 0x2A);
    drop(locked);

    let observed: Vec<u8> = seen.try_iter().collect();
    assert_eq!(observed, vec![1, 2]);
  }

  #[test]
  fn cancellation_stops_an_endless_loop() {
    let mut machine = Machine::new();
    machine.load_source("START: INC R0\nJMP START\n").unwrap();
    let machine = Arc::new(Mutex::new(machine));

    let runner = Runner::spawn(
      Arc::clone(&machine),
      Duration::from_millis(1),
      || 0,
      |_snapshot| {},
    );

    // Wait for some progress, then cancel; the loop itself never halts.
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
      if machine.lock().unwrap().register(Register::R0) > 0 {
        break;
      }
      thread::sleep(Duration::from_millis(1));
    }
    runner.stop();

    let locked = machine.lock().unwrap();
    assert!(!locked.halted());
    assert!(locked.register(Register::R0) > 0);
  }

  #[test]
  fn each_tick_samples_the_input() {
    let mut machine = Machine::new();
    machine.load_source("IN\nOUT\n").unwrap();
    let machine = Arc::new(Mutex::new(machine));

    let runner = Runner::spawn(
      Arc::clone(&machine),
      Duration::from_millis(1),
      || 0x0F,
      |_snapshot| {},
    );
    let deadline = Instant::now() + Duration::from_secs(5);
    while runner.is_running() && Instant::now() < deadline {
      thread::sleep(Duration::from_millis(1));
    }
    runner.stop();

    let locked = machine.lock().unwrap();
    assert_eq!(locked.register(Register::Ac), 0x0F);
    assert_eq!(locked.rs(), 0x0F);
  }
}
