use super::interp::Env;
use super::machine::{Config, Machine};
use super::optimize::optimize;
use super::program::{Cell, Program};
use super::reader::Reader;
use super::Opcode;
use crate::error;
use crate::lang::Error;
use std::collections::HashMap;
use tracing::debug;

type Result<T> = std::result::Result<T, Error>;

/// Compile a program into a ready-to-run machine.
///
/// `imports` maps library names to their source text; a library is only
/// read if the program requests it with `:: name ... ;`. Word names are
/// case-insensitive throughout.
pub fn compile(
    source: &str,
    imports: &HashMap<String, String>,
    config: &Config,
) -> Result<Machine> {
    let mut reader = Reader::new();
    reader.read(source)?;

    let mut libraries = HashMap::new();
    for (name, text) in imports {
        libraries.insert(name.to_uppercase(), text.as_str());
    }
    for name in reader.imports().to_vec() {
        match libraries.get(&name) {
            Some(text) => reader.read_import(text)?,
            None => return Err(error!(Compile; "import {} not found", name)),
        }
    }

    let mut program = Program::new();
    let mut trail: Vec<String> = vec![];
    expand(&reader, "", &mut trail, &mut program)?;
    program.push(Opcode::Eof);
    check_balance(&program)?;

    let controls = reader
        .controls()
        .iter()
        .map(|(name, addr)| (name.clone(), *addr as u64))
        .collect();

    let env = Env {
        step: 1.0 / (super::LOOP * config.sample_rate as f64),
        workers: config.workers.max(1),
        debug: config.debug,
    };
    let program = optimize(program, &env)?;
    debug!("compiled {:?}", program);
    Ok(Machine::build(program, controls, config))
}

/// Recursively expand a word's token definition into opcodes. The
/// trail of names being expanded catches definition cycles.
fn expand(
    reader: &Reader,
    name: &str,
    trail: &mut Vec<String>,
    program: &mut Program,
) -> Result<()> {
    let tokens = match reader.words().get(name) {
        Some(tokens) => tokens,
        None => return Err(error!(Compile; "{} is not defined", name)),
    };
    for w in tokens {
        if let Some(op) = Opcode::from_name(w) {
            program.push(op);
            continue;
        }
        if reader.words().contains_key(w) {
            if trail.iter().any(|t| t == w) {
                trail.push(w.clone());
                return Err(error!(Compile; "recursive definition: {}", trail.join(" ")));
            }
            trail.push(w.clone());
            expand(reader, w, trail, program)?;
            trail.pop();
            continue;
        }
        match w.parse::<f64>() {
            Ok(v) => program.push_number(v),
            Err(_) => return Err(error!(Compile; "{} is not defined", w)),
        }
    }
    Ok(())
}

/// Whole-stream control-structure balance check. Literal brackets are
/// transparent here; a structure split across a bracket boundary is
/// caught when the literal is folded.
fn check_balance(program: &Program) -> Result<()> {
    let mut open: Vec<Opcode> = vec![];
    let cells = program.cells();
    let mut i = 0;
    while i < cells.len() {
        let op = match cells[i] {
            Cell::Op(op) => op,
            Cell::Val(_) => {
                i += 1;
                continue;
            }
        };
        if op == Opcode::Number {
            i += 2;
            continue;
        }
        i += 1;
        match op {
            Opcode::If | Opcode::From => open.push(op),
            Opcode::Then => {
                if open.pop() != Some(Opcode::If) {
                    return Err(error!(Compile; "THEN without IF"));
                }
            }
            Opcode::Else => {
                if open.last() != Some(&Opcode::If) {
                    return Err(error!(Compile; "ELSE without IF"));
                }
            }
            Opcode::Choose => {
                if open.pop() != Some(Opcode::From) {
                    return Err(error!(Compile; "CHOOSE without FROM"));
                }
            }
            Opcode::ChooseSep => {
                if open.last() != Some(&Opcode::From) {
                    return Err(error!(Compile; ", outside FROM ... CHOOSE"));
                }
            }
            _ => {}
        }
    }
    match open.last() {
        None => Ok(()),
        Some(Opcode::If) => Err(error!(Compile; "IF without THEN")),
        _ => Err(error!(Compile; "FROM without CHOOSE")),
    }
}

#[cfg(test)]
mod tests {
    use super::super::machine::Config;
    use super::compile;
    use std::collections::HashMap;

    fn build(src: &str) -> Result<super::Machine, crate::lang::Error> {
        compile(src, &HashMap::new(), &Config::default())
    }

    #[test]
    fn test_words_expand_inline() {
        let m = build(":five 5; :ten five five +; ten").unwrap();
        assert_eq!(format!("{:?}", m.program()), "[NUMBER 5 NUMBER 5 + EOF]");
    }

    #[test]
    fn test_unknown_word() {
        let err = build("oops").unwrap_err();
        assert!(err.to_string().contains("OOPS"));
    }

    #[test]
    fn test_recursive_definition() {
        let err = build(":a b; :b a; a").unwrap_err();
        assert!(err.to_string().contains("recursive"));
    }

    #[test]
    fn test_self_recursion() {
        assert!(build(":a a; a").is_err());
    }

    #[test]
    fn test_missing_import() {
        assert!(build(":: nothere;").is_err());
    }

    #[test]
    fn test_import_words_compile() {
        let mut imports = HashMap::new();
        imports.insert("pads".to_string(), ":warm 3 4 +;".to_string());
        let m = compile(":: pads; warm", &imports, &Config::default()).unwrap();
        assert_eq!(format!("{:?}", m.program()), "[NUMBER 3 NUMBER 4 + EOF]");
    }

    #[test]
    fn test_balance_errors() {
        assert!(build("TRUE IF 1").is_err());
        assert!(build("1 THEN").is_err());
        assert!(build("ELSE").is_err());
        assert!(build("1 FROM 2 , 3").is_err());
        assert!(build("2 , 3 CHOOSE").is_err());
        assert!(build("TRUE IF 1 CHOOSE").is_err());
    }

    #[test]
    fn test_balanced_program_compiles() {
        assert!(build("TRUE IF 1 ELSE 2 THEN").is_ok());
        assert!(build("1 FROM 2 , 3 CHOOSE").is_ok());
    }

    #[test]
    fn test_literals_fold_at_compile_time() {
        let m = build("[ 21 2 * ]").unwrap();
        assert_eq!(format!("{:?}", m.program()), "[NUMBER 42 EOF]");
    }
}
