use super::interp::{eval, Eval};
use super::machine::Machine;
use crate::error;
use crate::lang::Error;
use rayon::prelude::*;

type Result<T> = std::result::Result<T, Error>;

/// Clamp every output value, sum, and normalize by the clip divisor.
fn mix(output: &[f64], clip: f64) -> f32 {
    let sum: f64 = output.iter().map(|v| v.max(-1.0).min(1.0)).sum();
    (sum / clip) as f32
}

impl Machine {
    /// Fill a buffer with one sample per tick. With more than one
    /// worker, ticks run in lock-step rounds across a thread pool;
    /// results commit in tick order, and the history ring carries
    /// `workers` cells of slack past the lookback window, so output
    /// matches the serial fill for any in-window lookback.
    pub fn fill(&mut self, buffer: &mut [f32]) -> Result<()> {
        if self.workers > 1 {
            self.fill_parallel(buffer)
        } else {
            self.fill_serial(buffer)
        }
    }

    fn fill_serial(&mut self, buffer: &mut [f32]) -> Result<()> {
        for sample in buffer.iter_mut() {
            let result = self.run_one_tick()?;
            check_stack(&result)?;
            *sample = mix(&result.output, self.clip);
        }
        Ok(())
    }

    fn fill_parallel(&mut self, buffer: &mut [f32]) -> Result<()> {
        let mut filled = 0;
        while filled < buffer.len() {
            let round = self.workers.min(buffer.len() - filled);
            let seed = self.control_seed();
            for k in 0..round as u64 {
                self.history.begin_tick(self.tick + k, &seed);
            }
            let env = self.env();
            let program = self.program.cells();
            let history = &self.history;
            let base = self.tick;
            let results: Vec<Result<Eval>> = (0..round as u64)
                .into_par_iter()
                .map(|k| eval(program, base + k, Some(history), &env))
                .collect();
            for (k, result) in results.into_iter().enumerate() {
                let result = result?;
                check_stack(&result)?;
                if let Some(clip) = result.clip {
                    self.clip = clip;
                }
                buffer[filled + k] = mix(&result.output, self.clip);
            }
            self.tick += round as u64;
            filled += round;
        }
        Ok(())
    }
}

fn check_stack(result: &Eval) -> Result<()> {
    if result.stack.is_empty() {
        Ok(())
    } else {
        Err(error!(Runtime; "{} values left on the stack", result.stack.len()))
    }
}
