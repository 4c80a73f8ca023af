use super::Opcode;
use crate::error;
use crate::lang::{scan, Error};
use std::collections::HashMap;
use tracing::trace;

type Result<T> = std::result::Result<T, Error>;

/// First slot address handed out to `CONSTANT`/`CONTROL`/`KEEP`
/// declarations. Integral values at or above this are history-slot
/// names, never legitimate signal values.
pub const FIRST_SLOT: f64 = 1000.0;

#[derive(Clone, Copy, PartialEq, Debug)]
enum Mode {
    Normal,
    DefName,
    Def,
    Comment,
    ImportNames,
    ConstantName,
    ControlName,
    KeepName,
}

/// ## Program reader
///
/// Consumes word tokens and builds the name to token-sequence mapping
/// that the compiler expands. The anonymous word `""` collects every
/// token outside a `: ... ;` definition. Also records `::` import
/// requests and allocates history-slot addresses for
/// `CONSTANT`/`CONTROL`/`KEEP` declarations, rewriting each declared
/// name as an `addr PEEK` token pair.
pub struct Reader {
    words: HashMap<String, Vec<String>>,
    imports: Vec<String>,
    controls: Vec<(String, f64)>,
    next_slot: f64,
}

impl Reader {
    pub fn new() -> Reader {
        let mut words = HashMap::new();
        words.insert(String::new(), vec![]);
        Reader {
            words,
            imports: vec![],
            controls: vec![],
            next_slot: FIRST_SLOT,
        }
    }

    pub fn words(&self) -> &HashMap<String, Vec<String>> {
        &self.words
    }

    /// Import names requested by the main program, in request order.
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// Declared `CONTROL` names and their slot addresses.
    pub fn controls(&self) -> &[(String, f64)] {
        &self.controls
    }

    pub fn read(&mut self, source: &str) -> Result<()> {
        self.read_source(source, false)
    }

    /// Read an imported word library. Top-level code is discarded and a
    /// word already defined keeps its first definition. Imports may not
    /// request further imports.
    pub fn read_import(&mut self, source: &str) -> Result<()> {
        self.read_source(source, true)
    }

    fn read_source(&mut self, source: &str, importing: bool) -> Result<()> {
        let mut mode = vec![Mode::Normal];
        let mut target = String::new();
        let mut discard = false;

        for raw in scan(source) {
            let w = raw.to_uppercase();
            trace!("scan {} -- {:?}", w, mode);
            let top = match mode.last() {
                Some(m) => *m,
                None => Mode::Normal,
            };
            if top == Mode::Comment {
                match w.as_str() {
                    "(" => mode.push(Mode::Comment),
                    ")" => {
                        mode.pop();
                    }
                    _ => {}
                }
                continue;
            }
            if w == "(" {
                mode.push(Mode::Comment);
                continue;
            }
            match top {
                Mode::Normal => match w.as_str() {
                    ":" => mode.push(Mode::DefName),
                    ";" => return Err(error!(Scan; "; found outside definition")),
                    ")" => return Err(error!(Scan; ") found outside comment")),
                    "CONSTANT" => mode.push(Mode::ConstantName),
                    "CONTROL" => mode.push(Mode::ControlName),
                    "KEEP" => mode.push(Mode::KeepName),
                    _ => self.append(&target, w, importing, discard),
                },
                Mode::DefName => {
                    if w == ":" {
                        if importing {
                            return Err(error!(Scan; "imports may not declare imports"));
                        }
                        if let Some(m) = mode.last_mut() {
                            *m = Mode::ImportNames;
                        }
                        continue;
                    }
                    self.check_name(&w, importing)?;
                    if self.words.contains_key(&w) {
                        // first definition wins across imports
                        discard = true;
                    } else {
                        self.words.insert(w.clone(), vec![]);
                        discard = false;
                    }
                    target = w;
                    if let Some(m) = mode.last_mut() {
                        *m = Mode::Def;
                    }
                }
                Mode::Def => match w.as_str() {
                    ":" => return Err(error!(Scan; ": found inside definition")),
                    ";" => {
                        mode.pop();
                        target = String::new();
                        discard = false;
                    }
                    ")" => return Err(error!(Scan; ") found outside comment")),
                    "CONSTANT" => mode.push(Mode::ConstantName),
                    "CONTROL" => mode.push(Mode::ControlName),
                    "KEEP" => mode.push(Mode::KeepName),
                    _ => self.append(&target, w, importing, discard),
                },
                Mode::ImportNames => match w.as_str() {
                    ";" => {
                        mode.pop();
                    }
                    ":" => return Err(error!(Scan; ": found inside import declaration")),
                    ")" => return Err(error!(Scan; ") found outside comment")),
                    _ => {
                        if Opcode::from_name(&w).is_some() || w.parse::<f64>().is_ok() {
                            return Err(error!(Scan; "{} cannot be used as an import name", w));
                        }
                        self.imports.push(w);
                    }
                },
                Mode::ConstantName | Mode::ControlName | Mode::KeepName => {
                    self.check_name(&w, importing)?;
                    if self.words.contains_key(&w) {
                        return Err(error!(Scan; "{} has already been defined", w));
                    }
                    let addr = self.next_slot;
                    self.next_slot += 1.0;
                    let addr_token = format!("{}", addr);
                    self.words
                        .insert(w.clone(), vec![addr_token.clone(), "PEEK".to_string()]);
                    match top {
                        Mode::ControlName => self.controls.push((w, addr)),
                        Mode::KeepName => {
                            self.append(&target, addr_token, importing, discard);
                            self.append(&target, "!".to_string(), importing, discard);
                        }
                        _ => {}
                    }
                    mode.pop();
                }
                Mode::Comment => {}
            }
        }

        match mode.last() {
            Some(Mode::Normal) if mode.len() == 1 => Ok(()),
            Some(Mode::Comment) => Err(error!(Scan; "unterminated comment at end of input")),
            Some(Mode::DefName) | Some(Mode::Def) => {
                Err(error!(Scan; "unterminated definition at end of input"))
            }
            Some(Mode::ImportNames) => {
                Err(error!(Scan; "unterminated import declaration at end of input"))
            }
            _ => Err(error!(Scan; "declaration without a name at end of input")),
        }
    }

    fn append(&mut self, target: &str, w: String, importing: bool, discard: bool) {
        if discard || (importing && target.is_empty()) {
            return;
        }
        if let Some(tokens) = self.words.get_mut(target) {
            tokens.push(w);
        }
    }

    fn check_name(&self, w: &str, importing: bool) -> Result<()> {
        if Opcode::from_name(w).is_some() {
            return Err(error!(Scan; "{} is a built-in word and cannot be redefined", w));
        }
        if w.parse::<f64>().is_ok() {
            return Err(error!(Scan; "{} cannot be used as a name", w));
        }
        if !importing && self.words.contains_key(w) {
            return Err(error!(Scan; "{} has already been defined", w));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Reader;

    #[test]
    fn test_definitions() {
        let mut r = Reader::new();
        r.read("3 :five 5; five +").unwrap();
        assert_eq!(r.words()[""], ["3", "FIVE", "+"]);
        assert_eq!(r.words()["FIVE"], ["5"]);
    }

    #[test]
    fn test_comments_nest_anywhere() {
        let mut r = Reader::new();
        r.read("47 (Hi; I am: a comment (quite a hard one)) 21 SWAP").unwrap();
        assert_eq!(r.words()[""], ["47", "21", "SWAP"]);
    }

    #[test]
    fn test_import_request() {
        let mut r = Reader::new();
        r.read(":: drums keys; 1").unwrap();
        assert_eq!(r.imports(), ["DRUMS", "KEYS"]);
        assert_eq!(r.words()[""], ["1"]);
    }

    #[test]
    fn test_first_definition_wins_for_imports() {
        let mut r = Reader::new();
        r.read(":pad 1;").unwrap();
        r.read_import(":pad 2; :lead 3; 99").unwrap();
        assert_eq!(r.words()["PAD"], ["1"]);
        assert_eq!(r.words()["LEAD"], ["3"]);
        // import top-level code is discarded
        assert!(r.words()[""].is_empty());
    }

    #[test]
    fn test_constant_rewrites_to_peek() {
        let mut r = Reader::new();
        r.read("CONSTANT cutoff CONSTANT res cutoff").unwrap();
        assert_eq!(r.words()["CUTOFF"], ["1000", "PEEK"]);
        assert_eq!(r.words()["RES"], ["1001", "PEEK"]);
        assert_eq!(r.words()[""], ["CUTOFF"]);
    }

    #[test]
    fn test_keep_emits_store() {
        let mut r = Reader::new();
        r.read("0.7 KEEP level level").unwrap();
        assert_eq!(r.words()[""], ["0.7", "1000", "!", "LEVEL"]);
    }

    #[test]
    fn test_control_registers_name() {
        let mut r = Reader::new();
        r.read("CONTROL vol vol").unwrap();
        assert_eq!(r.controls(), [("VOL".to_string(), 1000.0)]);
    }

    #[test]
    fn test_scan_errors() {
        assert!(Reader::new().read(";").is_err());
        assert!(Reader::new().read(")").is_err());
        assert!(Reader::new().read(":a : b;;").is_err());
        assert!(Reader::new().read(":sin 1;").is_err());
        assert!(Reader::new().read(":five 5; :five 6;").is_err());
        assert!(Reader::new().read("(no end").is_err());
        assert!(Reader::new().read(":dangling 1").is_err());
        assert!(Reader::new().read("CONSTANT").is_err());
        assert!(Reader::new().read("CONSTANT 5").is_err());
    }

    #[test]
    fn test_import_names_must_be_names() {
        assert!(Reader::new().read(":: 5;").is_err());
        assert!(Reader::new().read(":: );").is_err());
        assert!(Reader::new().read(":: dup;").is_err());
        let err = Reader::new().read(":: drums ) keys;").unwrap_err();
        assert!(err.to_string().contains(")"));
    }

    #[test]
    fn test_nested_import_rejected() {
        let mut r = Reader::new();
        assert!(r.read_import(":: more;").is_err());
    }
}
