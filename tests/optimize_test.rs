mod common;
use common::*;
use tone::mach::{Cell, Opcode};

#[test]
fn test_nested_literal_folding() {
    assert_eq!(output("[400 2 * 800 /] [96 30 - [12 21 +] /] +."), [3.0]);
}

#[test]
fn test_folded_matches_baseline() {
    let folded = output("[400 2 * 800 /] [96 30 - [12 21 +] /] +.");
    let baseline = output("400 2 * 800 / 96 30 - 12 21 + / +.");
    assert_eq!(folded, baseline);
}

#[test]
fn test_folded_stream_is_constants_only() {
    let machine = build("[1 2 + 4 *] [5 5 +]");
    let numbers = machine
        .program()
        .cells()
        .iter()
        .filter(|c| **c == Cell::Op(Opcode::Number))
        .count();
    assert_eq!(numbers, 2);
    assert!(!machine
        .program()
        .cells()
        .contains(&Cell::Op(Opcode::BeginLit)));
}

#[test]
fn test_number_has_exactly_one_operand() {
    let machine = build("1 [2 3 +] 4 . . .");
    let cells = machine.program().cells();
    let mut i = 0;
    while i < cells.len() {
        match cells[i] {
            Cell::Op(Opcode::Number) => {
                assert!(matches!(cells[i + 1], Cell::Val(_)));
                i += 2;
            }
            Cell::Val(_) => panic!("operand cell outside NUMBER"),
            _ => i += 1,
        }
    }
}

#[test]
fn test_literals_inside_definitions() {
    assert_eq!(stack(":half [1 2 /]; 8 half *"), [4.0]);
}

#[test]
fn test_unterminated_literal_is_implicitly_closed() {
    assert_eq!(stack("[1 2 +"), [3.0]);
}

#[test]
fn test_output_inside_literal_rejected() {
    let err = compile_err("[1 .]");
    assert!(err.contains("literal"), "{}", err);
}

#[test]
fn test_time_dependent_words_rejected_in_literals() {
    assert!(compile_err("[T]").contains("T"));
    assert!(compile_err("[440 SIN]").contains("SIN"));
    assert!(compile_err("[1 NOISE]").contains("NOISE"));
    assert!(compile_err("[1000 PEEK]").contains("PEEK"));
}

#[test]
fn test_unit_words_fold() {
    // pure unit conversions are compile-time constants
    assert!(build("[440 HZ] DROP").program().len() <= 4);
}

#[test]
fn test_runtime_fault_in_literal_fails_compilation() {
    assert!(compile_err("[1 0 /]").contains("division by zero"));
}

#[test]
fn test_branches_fold_inside_literals() {
    assert_eq!(stack("[TRUE IF 4 ELSE 5 THEN]"), [4.0]);
}
