use super::history::History;
use super::program::Cell;
use super::reader::FIRST_SLOT;
use super::Opcode;
use super::{BPM, SEC, SEMITONE};
use crate::error;
use crate::lang::Error;
use rand::Rng;
use tracing::trace;

type Result<T> = std::result::Result<T, Error>;

/// Per-machine settings the evaluator needs on every tick.
pub(crate) struct Env {
    pub step: f64,
    pub workers: usize,
    pub debug: bool,
}

/// Result of evaluating one tick.
#[derive(Debug)]
pub struct Eval {
    /// Values sent to the output channel by `.`, in order.
    pub output: Vec<f64>,
    /// Whatever was left on the operand stack.
    pub stack: Vec<f64>,
    /// New clip divisor, if `CLIP` ran.
    pub clip: Option<f64>,
}

/// Execution mode. Skip modes ignore every opcode except the control
/// words that bound the region being skipped, counting inner
/// `IF`/`FROM` openers so nested structures skip as a unit.
#[derive(Clone, Copy, PartialEq, Debug)]
enum Mode {
    Normal,
    /// Inside a branch a false `IF` (or an executed branch's `ELSE`)
    /// told us not to run.
    SkipIf { nested: usize },
    /// Inside `FROM ... CHOOSE` arms that were not selected. Counts
    /// down a separator per arm; -1 means skip to `CHOOSE`.
    SkipChoice { remaining: i64, nested: usize },
}

fn pop(stack: &mut Vec<f64>) -> f64 {
    // arity is checked before dispatch
    stack.pop().unwrap_or_default()
}

fn slot(v: f64) -> Result<u64> {
    if v >= FIRST_SLOT && v.fract() == 0.0 {
        Ok(v as u64)
    } else {
        Err(error!(Runtime; "{} is not a slot address", v))
    }
}

/// Run one tick of a compiled opcode stream.
///
/// `history` is absent only when folding literal blocks at compile
/// time; every time-dependent word is rejected before that evaluation
/// so the runtime never misses it.
pub(crate) fn eval(
    code: &[Cell],
    tick: u64,
    history: Option<&History>,
    env: &Env,
) -> Result<Eval> {
    let mut stack: Vec<f64> = vec![];
    let mut output: Vec<f64> = vec![];
    let mut clip: Option<f64> = None;
    let mut mode = Mode::Normal;
    let mut saved: Vec<Mode> = vec![];
    let phase = (tick as f64 * env.step).fract();
    let mut rng = rand::thread_rng();

    let mut i = 0;
    while i < code.len() {
        let op = match code[i] {
            Cell::Op(op) => op,
            Cell::Val(v) => {
                return Err(error!(Runtime; "compiler defect: stray operand {}", v));
            }
        };
        if env.debug {
            trace!("{} {} -- {:?} {:?}", tick, op, mode, stack);
        }

        if op == Opcode::Number {
            let v = match code.get(i + 1) {
                Some(Cell::Val(v)) => *v,
                _ => return Err(error!(Runtime; "compiler defect: NUMBER without operand")),
            };
            if mode == Mode::Normal {
                stack.push(v);
            }
            i += 2;
            continue;
        }
        i += 1;

        if op == Opcode::Eof {
            if mode != Mode::Normal || !saved.is_empty() {
                return Err(error!(Runtime; "unterminated control structure at end of program"));
            }
            break;
        }

        match mode {
            Mode::SkipIf { nested } => {
                match op {
                    Opcode::If | Opcode::From => mode = Mode::SkipIf { nested: nested + 1 },
                    Opcode::Then => {
                        if nested > 0 {
                            mode = Mode::SkipIf { nested: nested - 1 };
                        } else {
                            mode = match saved.pop() {
                                Some(m) => m,
                                None => return Err(error!(Runtime; "THEN without IF")),
                            };
                        }
                    }
                    Opcode::Else => {
                        if nested == 0 {
                            mode = Mode::Normal;
                        }
                    }
                    Opcode::Choose => {
                        if nested > 0 {
                            mode = Mode::SkipIf { nested: nested - 1 };
                        } else {
                            return Err(error!(Runtime; "CHOOSE without FROM"));
                        }
                    }
                    _ => {}
                }
                continue;
            }
            Mode::SkipChoice { remaining, nested } => {
                match op {
                    Opcode::If | Opcode::From => {
                        mode = Mode::SkipChoice {
                            remaining,
                            nested: nested + 1,
                        };
                    }
                    Opcode::Then => {
                        if nested > 0 {
                            mode = Mode::SkipChoice {
                                remaining,
                                nested: nested - 1,
                            };
                        }
                    }
                    Opcode::Choose => {
                        if nested > 0 {
                            mode = Mode::SkipChoice {
                                remaining,
                                nested: nested - 1,
                            };
                        } else {
                            mode = match saved.pop() {
                                Some(m) => m,
                                None => return Err(error!(Runtime; "CHOOSE without FROM")),
                            };
                        }
                    }
                    Opcode::ChooseSep => {
                        if nested == 0 && remaining > 0 {
                            if remaining == 1 {
                                mode = Mode::Normal;
                            } else {
                                mode = Mode::SkipChoice {
                                    remaining: remaining - 1,
                                    nested: 0,
                                };
                            }
                        }
                    }
                    _ => {}
                }
                continue;
            }
            Mode::Normal => {}
        }

        let needs = op.needs();
        if stack.len() < needs {
            return Err(error!(Runtime; "{} needs {} values on the stack", op, needs));
        }
        let top = stack.len().wrapping_sub(1);

        match op {
            Opcode::Noop | Opcode::BeginLit | Opcode::EndLit => {}

            Opcode::Output => {
                let v = pop(&mut stack);
                output.push(v);
            }
            Opcode::Clip => {
                let v = pop(&mut stack);
                if v == 0.0 {
                    return Err(error!(Runtime; "CLIP by zero"));
                }
                clip = Some(v);
            }

            // *** branch control
            Opcode::If => {
                let v = pop(&mut stack);
                saved.push(Mode::Normal);
                if v == 0.0 {
                    mode = Mode::SkipIf { nested: 0 };
                }
            }
            Opcode::Then => {
                mode = match saved.pop() {
                    Some(m) => m,
                    None => return Err(error!(Runtime; "THEN without IF")),
                };
            }
            Opcode::Else => {
                mode = Mode::SkipIf { nested: 0 };
            }
            Opcode::From => {
                let k = pop(&mut stack) as i64;
                saved.push(Mode::Normal);
                if k != 0 {
                    mode = Mode::SkipChoice {
                        remaining: k,
                        nested: 0,
                    };
                }
            }
            Opcode::ChooseSep => {
                mode = Mode::SkipChoice {
                    remaining: -1,
                    nested: 0,
                };
            }
            Opcode::Choose => {
                mode = match saved.pop() {
                    Some(m) => m,
                    None => return Err(error!(Runtime; "CHOOSE without FROM")),
                };
            }
            Opcode::Loop => return Err(error!(Runtime; "LOOP is reserved")),

            // *** Forth words
            Opcode::False => stack.push(0.0),
            Opcode::True => stack.push(1.0),
            Opcode::Plus => {
                let b = pop(&mut stack);
                let a = pop(&mut stack);
                stack.push(a + b);
            }
            Opcode::Minus => {
                let b = pop(&mut stack);
                let a = pop(&mut stack);
                stack.push(a - b);
            }
            Opcode::Times => {
                let b = pop(&mut stack);
                let a = pop(&mut stack);
                stack.push(a * b);
            }
            Opcode::Divide => {
                let b = pop(&mut stack);
                let a = pop(&mut stack);
                if b == 0.0 {
                    return Err(error!(Runtime; "division by zero"));
                }
                stack.push(a / b);
            }
            Opcode::Mod => {
                let b = pop(&mut stack);
                let a = pop(&mut stack);
                if b == 0.0 {
                    return Err(error!(Runtime; "division by zero"));
                }
                stack.push(a % b);
            }
            Opcode::Dmod => {
                let b = pop(&mut stack);
                let a = pop(&mut stack);
                if b == 0.0 {
                    return Err(error!(Runtime; "division by zero"));
                }
                let q = (a / b).trunc();
                stack.push(a - q * b);
                stack.push(q);
            }
            Opcode::Equals => {
                let b = pop(&mut stack);
                let a = pop(&mut stack);
                stack.push(if a == b { 1.0 } else { 0.0 });
            }
            Opcode::Greater => {
                let b = pop(&mut stack);
                let a = pop(&mut stack);
                stack.push(if a > b { 1.0 } else { 0.0 });
            }
            Opcode::Less => {
                let b = pop(&mut stack);
                let a = pop(&mut stack);
                stack.push(if a < b { 1.0 } else { 0.0 });
            }
            Opcode::Not => {
                stack[top] = if stack[top] == 0.0 { 1.0 } else { 0.0 };
            }
            Opcode::And => {
                let b = pop(&mut stack);
                let a = pop(&mut stack);
                stack.push(if a != 0.0 && b != 0.0 { 1.0 } else { 0.0 });
            }
            Opcode::Or => {
                let b = pop(&mut stack);
                let a = pop(&mut stack);
                stack.push(if a != 0.0 || b != 0.0 { 1.0 } else { 0.0 });
            }
            Opcode::Max => {
                let b = pop(&mut stack);
                let a = pop(&mut stack);
                stack.push(a.max(b));
            }
            Opcode::Min => {
                let b = pop(&mut stack);
                let a = pop(&mut stack);
                stack.push(a.min(b));
            }
            Opcode::Dup => stack.push(stack[top]),
            Opcode::Ddup => {
                let a = stack[top - 1];
                let b = stack[top];
                stack.push(a);
                stack.push(b);
            }
            Opcode::Over => stack.push(stack[top - 1]),
            Opcode::Drop => {
                pop(&mut stack);
            }
            Opcode::Nip => {
                let b = pop(&mut stack);
                stack[top - 1] = b;
            }
            Opcode::Tuck => {
                let b = stack[top];
                let a = stack[top - 1];
                stack[top - 1] = b;
                stack[top] = a;
                stack.push(b);
            }
            Opcode::Swap => stack.swap(top, top - 1),
            Opcode::Rot => {
                let a = stack.remove(top - 2);
                stack.push(a);
            }

            // *** musical words
            Opcode::Hz => stack[top] *= SEC,
            Opcode::Bpm => stack[top] *= BPM,
            Opcode::S => stack[top] /= SEC,
            Opcode::Flat => stack[top] /= SEMITONE,
            Opcode::Sharp => stack[top] *= SEMITONE,
            Opcode::High => stack[top] *= 2.0,
            Opcode::Low => stack[top] /= 2.0,
            Opcode::On => {
                let now = pop(&mut stack);
                let dur = pop(&mut stack);
                let sched = pop(&mut stack);
                let age = now - sched;
                if age > 0.0 && age < dur {
                    stack.push(age);
                    stack.push(1.0);
                } else {
                    stack.push(0.0);
                }
            }

            // *** time-dependent words
            Opcode::T => stack.push(phase),
            Opcode::Sin => {
                let f = (stack[top] * phase).fract();
                stack[top] = (f * 2.0 * std::f64::consts::PI).sin();
            }
            Opcode::Saw => {
                stack[top] = (stack[top] * phase * 2.0) % 2.0 - 1.0;
            }
            Opcode::Tr => {
                let f = (stack[top] * phase).fract();
                stack[top] = if f < 0.5 { f * 4.0 - 1.0 } else { 3.0 - f * 4.0 };
            }
            Opcode::Pulse => {
                let width = pop(&mut stack);
                let f = (stack[top - 1] * phase).fract();
                stack[top - 1] = if f < width { 1.0 } else { -1.0 };
            }
            Opcode::Sq => {
                let f = (stack[top] * phase).fract();
                stack[top] = if f < 0.5 { 1.0 } else { -1.0 };
            }
            Opcode::Noise => {
                stack[top] = rng.gen_range(-1.0..1.0);
            }

            // *** history access
            Opcode::Peek | Opcode::Poke | Opcode::Old | Opcode::Delta => {
                let hist = match history {
                    Some(h) => h,
                    None => {
                        return Err(error!(Runtime; "{} requires the history ring", op));
                    }
                };
                match op {
                    Opcode::Peek => {
                        let addr = slot(pop(&mut stack))?;
                        match hist.peek(tick, addr) {
                            Some(v) => stack.push(v),
                            None => {
                                return Err(
                                    error!(Runtime; "slot {} read before it was written", addr),
                                );
                            }
                        }
                    }
                    Opcode::Poke => {
                        let addr = slot(pop(&mut stack))?;
                        let value = pop(&mut stack);
                        if !hist.poke(tick, addr, value) {
                            return Err(
                                error!(Runtime; "slot {} written twice in one tick", addr),
                            );
                        }
                    }
                    Opcode::Old => {
                        let n = pop(&mut stack) as i64;
                        let addr = slot(pop(&mut stack))?;
                        stack.push(hist.old(tick, addr, n));
                    }
                    _ => {
                        let addr = slot(pop(&mut stack))?;
                        stack.push(hist.old(tick, addr, env.workers as i64));
                    }
                }
            }

            // consumed earlier in the pipeline
            _ => {
                return Err(error!(Runtime; "compiler defect: {} reached the machine", op));
            }
        }
    }

    Ok(Eval {
        output,
        stack,
        clip,
    })
}
