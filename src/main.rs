//! # Tone
//!
//! Renders a program to raw audio: little-endian 32-bit float samples
//! on stdout, ready for `aplay -f FLOAT_LE` or `ffplay -f f32le`.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::exit;

use tone::mach::{compile, Config};
use tracing::info;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .init();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("usage: tone FILE [SECONDS]");
        exit(2);
    }
    let seconds = match args.get(2) {
        Some(s) => match s.parse::<f64>() {
            Ok(v) if v > 0.0 => v,
            _ => {
                eprintln!("SECONDS must be a positive number, not {}", args[2]);
                exit(2);
            }
        },
        None => 10.0,
    };
    if let Err(err) = run(&args[1], seconds) {
        eprintln!("{}", err);
        exit(1);
    }
}

fn run(path: &str, seconds: f64) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(path)?;
    let imports = sibling_imports(Path::new(path))?;
    let config = Config {
        history_seconds: 1.0,
        workers: rayon::current_num_threads(),
        ..Config::default()
    };
    let mut machine = compile(&source, &imports, &config)?;
    info!(
        "{}: {} samples/s, {} workers",
        path,
        machine.sample_rate(),
        config.workers
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut remaining = (seconds * machine.sample_rate() as f64) as usize;
    let mut buffer = [0.0f32; 1024];
    let mut bytes = Vec::with_capacity(buffer.len() * 4);
    while remaining > 0 {
        let n = remaining.min(buffer.len());
        machine.fill(&mut buffer[..n])?;
        bytes.clear();
        for sample in &buffer[..n] {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        out.write_all(&bytes)?;
        remaining -= n;
    }
    Ok(())
}

/// Every `.d4` file beside the program is offered as an importable
/// library named after its file stem.
fn sibling_imports(path: &Path) -> io::Result<HashMap<String, String>> {
    let mut imports = HashMap::new();
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let entry_path = entry.path();
        if entry_path == path {
            continue;
        }
        if entry_path.extension().and_then(|e| e.to_str()) != Some("d4") {
            continue;
        }
        if let Some(stem) = entry_path.file_stem().and_then(|s| s.to_str()) {
            imports.insert(stem.to_string(), fs::read_to_string(&entry_path)?);
        }
    }
    Ok(imports)
}
