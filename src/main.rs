/*!
  Command-line driver for the micro8 machine.

  ```text
  micro8 [--hex] [--export] [--run MILLIS] [--steps N] [--input HH] FILE
  ```

  FILE is assembled (or, with `--hex`, loaded as one 4-hex-digit word per
  line). The program then either prints as a memory-initialization table
  (`--export`), free-runs on the periodic runner (`--run`), or single-steps up
  to a bounded cycle count, showing the machine state tables at the end.
  `--input` fixes the 8-bit switch value sampled by IN.
*/

use std::process;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use micro8::{Machine, Runner, StepOutcome};

struct Options {
  hex     :  bool,
  export  :  bool,
  run     :  Option<u64>,
  steps   :  usize,
  input   :  u8,
  file    :  Option<String>,
}

const USAGE: &str = "usage: micro8 [--hex] [--export] [--run MILLIS] [--steps N] [--input HH] FILE";

fn parse_options() -> Result<Options, String> {
  let mut options = Options {
    hex    :  false,
    export :  false,
    run    :  None,
    steps  :  1024,
    input  :  0,
    file   :  None,
  };

  let mut arguments = std::env::args().skip(1);
  while let Some(argument) = arguments.next() {
    match argument.as_str() {
      "--hex"    => options.hex = true,
      "--export" => options.export = true,
      "--run" => {
        let value = arguments.next().ok_or("--run needs an interval in milliseconds")?;
        options.run = Some(value.parse().map_err(|_| format!("bad interval `{}`", value))?);
      }
      "--steps" => {
        let value = arguments.next().ok_or("--steps needs a count")?;
        options.steps = value.parse().map_err(|_| format!("bad step count `{}`", value))?;
      }
      "--input" => {
        let value = arguments.next().ok_or("--input needs a 2-digit hex value")?;
        options.input = u8::from_str_radix(&value, 16)
          .map_err(|_| format!("bad input value `{}`", value))?;
      }
      other if other.starts_with('-') => {
        return Err(format!("unknown flag `{}`\n{}", other, USAGE));
      }
      file => {
        if options.file.replace(file.to_string()).is_some() {
          return Err(USAGE.to_string());
        }
      }
    }
  }

  if options.file.is_none() {
    return Err(USAGE.to_string());
  }
  Ok(options)
}

fn drive(options: Options) -> Result<(), String> {
  let path = options.file.as_deref().unwrap_or_default();
  let source = std::fs::read_to_string(path)
    .map_err(|e| format!("cannot read `{}`: {}", path, e))?;

  let mut machine = Machine::new();
  let loaded = match options.hex {
    true  => machine.load_hex_source(&source),
    false => machine.load_source(&source),
  };
  loaded.map_err(|e| e.to_string())?;

  if options.export {
    match machine.program().export_memory_table() {
      Some(table) => print!("{}", table),
      None        => return Err("nothing to export: the program is empty".to_string()),
    }
    return Ok(());
  }

  match options.run {

    Some(millis) => {
      let input = options.input;
      let machine = Arc::new(Mutex::new(machine));
      let runner = Runner::spawn(
        Arc::clone(&machine),
        Duration::from_millis(millis),
        move || input,
        |_snapshot| {},
      );
      while runner.is_running() {
        std::thread::sleep(Duration::from_millis(millis.max(1)));
      }
      runner.stop();
      let locked = machine.lock().map_err(|_| "machine thread panicked".to_string())?;
      println!("{}", *locked);
    }

    None => {
      let mut cycles = 0;
      while cycles < options.steps {
        if machine.step(options.input) == StepOutcome::Halted {
          break;
        }
        cycles += 1;
      }
      if !machine.halted() {
        println!("Paused after {} cycles.", cycles);
      }
      println!("{}", machine);
    }

  }

  Ok(())
}

fn main() {
  let result = parse_options().and_then(drive);
  if let Err(message) = result {
    eprintln!("{}", message);
    process::exit(1);
  }
}
