//! # Tone
//!
//! A tiny Forth-like language for generating audio.
//!
//! A program is compiled once into a flat opcode stream, then evaluated
//! from the top on every sample tick. Whatever it sends to the output
//! channel with `.` is clamped, summed, and normalized into the next
//! sample.
//!
//! ```
//! use std::collections::HashMap;
//! use tone::mach::{compile, Config};
//!
//! let mut machine = compile(
//!     "( concert A ) 440 HZ SIN .",
//!     &HashMap::new(),
//!     &Config::default(),
//! )
//! .unwrap();
//! let mut buffer = [0.0f32; 128];
//! machine.fill(&mut buffer).unwrap();
//! ```

pub mod lang;
pub mod mach;
