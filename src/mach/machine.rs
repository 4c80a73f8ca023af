use super::history::History;
use super::interp::{eval, Env, Eval};
use super::program::Program;
use super::LOOP;
use crate::error;
use crate::lang::Error;
use std::collections::HashMap;

type Result<T> = std::result::Result<T, Error>;

/// Settings for building a machine.
pub struct Config {
    pub sample_rate: u32,
    /// Seconds of history the `OLD` word can reach back into.
    pub history_seconds: f64,
    /// Initial mixdown divisor; a program may replace it with `CLIP`.
    pub clip: f64,
    pub workers: usize,
    /// Trace every opcode as it executes.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            sample_rate: 44100,
            history_seconds: 0.0,
            clip: 1.0,
            workers: 1,
            debug: false,
        }
    }
}

/// ## Machine
///
/// Sole owner of a compiled program, its history ring, and the tick
/// counter. Evaluates the whole program once per sample tick.
#[derive(Debug)]
pub struct Machine {
    pub(crate) program: Program,
    pub(crate) sample_rate: u32,
    pub(crate) step: f64,
    pub(crate) clip: f64,
    pub(crate) workers: usize,
    pub(crate) debug: bool,
    pub(crate) tick: u64,
    pub(crate) history: History,
    pub(crate) controls: Vec<(String, u64)>,
    pub(crate) inputs: HashMap<String, f64>,
}

impl Machine {
    pub(crate) fn build(
        program: Program,
        controls: Vec<(String, u64)>,
        config: &Config,
    ) -> Machine {
        let workers = config.workers.max(1);
        let lookback = (config.history_seconds * config.sample_rate as f64).ceil() as usize;
        // workers cells of slack keep the round being cleared out of
        // reach of the requested lookback window
        let save_len = lookback + workers * 2;
        let mut inputs = HashMap::new();
        for (name, _) in &controls {
            inputs.insert(name.clone(), 0.0);
        }
        Machine {
            program,
            sample_rate: config.sample_rate,
            step: 1.0 / (LOOP * config.sample_rate as f64),
            clip: config.clip,
            workers,
            debug: config.debug,
            tick: 0,
            history: History::new(save_len, workers),
            controls,
            inputs,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn clip(&self) -> f64 {
        self.clip
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Names declared with `CONTROL`, in declaration order.
    pub fn control_names(&self) -> Vec<String> {
        self.controls.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Set a control input. Takes effect at the start of the next tick.
    pub fn set_control(&mut self, name: &str, value: f64) -> Result<()> {
        let name = name.to_uppercase();
        match self.inputs.get_mut(&name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(error!(Runtime; "{} is not a declared control", name)),
        }
    }

    pub(crate) fn env(&self) -> Env {
        Env {
            step: self.step,
            workers: self.workers,
            debug: self.debug,
        }
    }

    pub(crate) fn control_seed(&self) -> Vec<(u64, f64)> {
        self.controls
            .iter()
            .map(|(name, addr)| (*addr, self.inputs.get(name).copied().unwrap_or(0.0)))
            .collect()
    }

    /// Evaluate the program for the current tick and advance. A `CLIP`
    /// in the program takes effect for this tick's mixdown onward.
    pub fn run_one_tick(&mut self) -> Result<Eval> {
        self.history.begin_tick(self.tick, &self.control_seed());
        let result = eval(
            self.program.cells(),
            self.tick,
            Some(&self.history),
            &self.env(),
        )?;
        if let Some(clip) = result.clip {
            self.clip = clip;
        }
        self.tick += 1;
        Ok(result)
    }
}
