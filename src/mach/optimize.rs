use super::interp::{eval, Env};
use super::program::{Cell, Program};
use super::Opcode;
use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## Literal folding
///
/// Replaces every `[ ... ]` span with the values left on the stack
/// after evaluating the span once in isolation. Only the outermost
/// closing bracket triggers evaluation; inner brackets ride along in
/// the span as no-ops. An unterminated literal at end of stream is
/// treated as implicitly closed. The result contains no brackets, so
/// folding is idempotent.
pub(crate) fn optimize(program: Program, env: &Env) -> Result<Program> {
    let cells = program.into_cells();
    let mut out: Vec<Cell> = Vec::with_capacity(cells.len());
    let mut i = 0;
    while i < cells.len() {
        match cells[i] {
            Cell::Op(Opcode::BeginLit) => {
                let mut span: Vec<Cell> = vec![];
                let mut depth = 0;
                let mut j = i + 1;
                loop {
                    if j >= cells.len() {
                        break;
                    }
                    match cells[j] {
                        Cell::Op(Opcode::Eof) => break,
                        Cell::Op(Opcode::BeginLit) => {
                            depth += 1;
                            span.push(cells[j]);
                            j += 1;
                        }
                        Cell::Op(Opcode::EndLit) => {
                            if depth == 0 {
                                j += 1;
                                break;
                            }
                            depth -= 1;
                            span.push(cells[j]);
                            j += 1;
                        }
                        Cell::Op(Opcode::Number) => {
                            span.push(cells[j]);
                            if let Some(v) = cells.get(j + 1) {
                                span.push(*v);
                            }
                            j += 2;
                        }
                        c => {
                            span.push(c);
                            j += 1;
                        }
                    }
                }
                fold(&span, env, &mut out)?;
                i = j;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Ok(Program::from_cells(out))
}

fn fold(span: &[Cell], env: &Env, out: &mut Vec<Cell>) -> Result<()> {
    for cell in span {
        if let Cell::Op(op) = cell {
            if op.time_dependent() {
                return Err(error!(Optimize; "{} is not constant inside a literal", op));
            }
        }
    }
    let mut code = span.to_vec();
    code.push(Cell::Op(Opcode::Eof));
    let result = eval(&code, 0, None, env)?;
    if !result.output.is_empty() {
        return Err(error!(Optimize; "attempted output from within a literal"));
    }
    if result.clip.is_some() {
        return Err(error!(Optimize; "attempted CLIP from within a literal"));
    }
    for v in result.stack {
        out.push(Cell::Op(Opcode::Number));
        out.push(Cell::Val(v));
    }
    Ok(())
}
