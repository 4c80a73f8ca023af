#![allow(dead_code)]

use std::collections::HashMap;
use tone::mach::{compile, Config, Eval, Machine};

pub const RATE: u32 = 22050;

pub fn config(workers: usize) -> Config {
    Config {
        sample_rate: RATE,
        history_seconds: 0.01,
        workers,
        ..Config::default()
    }
}

pub fn build(source: &str) -> Machine {
    build_with(source, &HashMap::new(), 1)
}

pub fn build_with(source: &str, imports: &HashMap<String, String>, workers: usize) -> Machine {
    compile(source, imports, &config(workers)).expect("program should compile")
}

pub fn tick(machine: &mut Machine) -> Eval {
    machine.run_one_tick().expect("tick should run")
}

/// Stack left after running the program once.
pub fn stack(source: &str) -> Vec<f64> {
    tick(&mut build(source)).stack
}

/// Output-channel values from running the program once.
pub fn output(source: &str) -> Vec<f64> {
    tick(&mut build(source)).output
}

pub fn compile_err(source: &str) -> String {
    match compile(source, &HashMap::new(), &config(1)) {
        Ok(_) => panic!("{:?} should not compile", source),
        Err(err) => err.to_string(),
    }
}

pub fn tick_err(source: &str) -> String {
    match build(source).run_one_tick() {
        Ok(_) => panic!("{:?} should not run", source),
        Err(err) => err.to_string(),
    }
}
