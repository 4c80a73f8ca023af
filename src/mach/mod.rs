/*!
# Machine Module

This module provides the compiler back end and the bytecode virtual
machine: the opcode catalog, the compiled program representation, the
word reader, the compiler, the literal-folding optimizer, the per-tick
interpreter, the history ring, and the buffer fill driver.

A program is compiled once and then evaluated from the top on every
sample tick; values it sends to the output channel are mixed down into
one sample.

*/

mod compile;
mod fill;
mod history;
mod interp;
mod machine;
mod opcode;
mod optimize;
mod program;
mod reader;

pub use compile::compile;
pub use interp::Eval;
pub use machine::Config;
pub use machine::Machine;
pub use opcode::Opcode;
pub use program::Cell;
pub use program::Program;
pub use reader::Reader;

/// Loop length in seconds. Phase wraps after this long, so playback
/// clicks once a day.
pub const LOOP: f64 = 60.0 * 60.0 * 24.0;

/// Seconds-per-loop, for converting real-world units to loop units.
pub const SEC: f64 = LOOP;

/// Beats-per-minute conversion factor.
pub const BPM: f64 = LOOP / 60.0;

/// Equal-temperament semitone ratio, the twelfth root of two.
pub const SEMITONE: f64 = 1.0594630943592953;
