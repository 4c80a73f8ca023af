mod common;
use common::*;
use std::collections::HashMap;
use tone::mach::compile;

#[test]
fn test_fill_writes_every_sample() {
    let mut machine = build("0.25 .");
    let mut buffer = [0.0f32; 16];
    machine.fill(&mut buffer).unwrap();
    assert!(buffer.iter().all(|s| *s == 0.25));
    assert_eq!(machine.tick(), 16);
}

#[test]
fn test_empty_program_is_silence() {
    let mut machine = build("( nothing but a comment )");
    let mut buffer = [1.0f32; 8];
    machine.fill(&mut buffer).unwrap();
    assert!(buffer.iter().all(|s| *s == 0.0));
}

#[test]
fn test_mixdown_clamps() {
    let mut machine = build("2 .");
    let mut buffer = [0.0f32; 4];
    machine.fill(&mut buffer).unwrap();
    assert!(buffer.iter().all(|s| *s == 1.0));

    let mut machine = build("-4 .");
    machine.fill(&mut buffer).unwrap();
    assert!(buffer.iter().all(|s| *s == -1.0));
}

#[test]
fn test_outputs_sum_per_tick() {
    let mut machine = build("0.25 . 0.5 .");
    let mut buffer = [0.0f32; 4];
    machine.fill(&mut buffer).unwrap();
    assert!(buffer.iter().all(|s| *s == 0.75));
}

#[test]
fn test_configured_clip_normalizes() {
    let mut cfg = config(1);
    cfg.clip = 2.0;
    let mut machine = compile("1 .", &HashMap::new(), &cfg).unwrap();
    let mut buffer = [0.0f32; 4];
    machine.fill(&mut buffer).unwrap();
    assert!(buffer.iter().all(|s| *s == 0.5));
}

#[test]
fn test_clip_opcode_replaces_divisor() {
    let mut machine = build("4 CLIP 1 .");
    let mut buffer = [0.0f32; 4];
    machine.fill(&mut buffer).unwrap();
    assert!(buffer.iter().all(|s| *s == 0.25));
    assert_eq!(machine.clip(), 4.0);
}

#[test]
fn test_leftover_stack_stops_the_fill() {
    let mut machine = build("1 0.5 .");
    let mut buffer = [0.0f32; 4];
    let err = machine.fill(&mut buffer).unwrap_err();
    assert!(err.to_string().contains("left on the stack"));
}

#[test]
fn test_parallel_matches_serial_without_history() {
    let src = "440 HZ SIN . 0 0.1 T ON IF 0.5 * . ELSE 0 . THEN";
    let mut serial = vec![0.0f32; 300];
    build(src).fill(&mut serial).unwrap();
    let mut parallel = vec![0.0f32; 300];
    build_with(src, &HashMap::new(), 4).fill(&mut parallel).unwrap();
    assert_eq!(serial, parallel);
}

#[test]
fn test_parallel_fill_is_deterministic() {
    // feedback through the ring at the worker stride
    let src = "1000 DELTA 0.9 * 0.1 + DUP 1000 ! .";
    let mut first = vec![0.0f32; 256];
    build_with(src, &HashMap::new(), 4).fill(&mut first).unwrap();
    let mut second = vec![0.0f32; 256];
    build_with(src, &HashMap::new(), 4).fill(&mut second).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_parallel_old_near_the_window_top() {
    // lookback one short of the retained window, so the read lands
    // close to the cells the running round has already cleared
    let src = "T 1000 ! 1000 7 OLD .";
    let mut cfg = config(1);
    cfg.sample_rate = 100;
    cfg.history_seconds = 0.08;
    let mut serial = vec![0.0f32; 64];
    compile(src, &HashMap::new(), &cfg)
        .unwrap()
        .fill(&mut serial)
        .unwrap();
    cfg.workers = 4;
    let mut parallel = vec![0.0f32; 64];
    compile(src, &HashMap::new(), &cfg)
        .unwrap()
        .fill(&mut parallel)
        .unwrap();
    assert_eq!(serial, parallel);
    // from tick 8 on the lookback reads a real phase, never zero
    assert!(parallel[8..].iter().all(|s| *s > 0.0));
}

#[test]
fn test_parallel_error_aborts_the_operation() {
    let mut machine = build_with("1 0 / .", &HashMap::new(), 4);
    let mut buffer = [0.0f32; 64];
    assert!(machine.fill(&mut buffer).is_err());
}
