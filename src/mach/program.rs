use super::Opcode;

/// One cell of a compiled program. `Number` opcodes are always followed
/// by exactly one `Val` cell holding the inline operand; nothing else
/// may scan a `Val` cell as an instruction.
#[derive(Clone, Copy, PartialEq)]
pub enum Cell {
    Op(Opcode),
    Val(f64),
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string())
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Cell::Op(op) => write!(f, "{}", op),
            Cell::Val(v) => write!(f, "{}", v),
        }
    }
}

/// ## Compiled program
///
/// A flat opcode stream ending in an `EOF` sentinel. Immutable once the
/// machine owns it.
#[derive(Clone, PartialEq)]
pub struct Program {
    cells: Vec<Cell>,
}

impl Program {
    pub fn new() -> Program {
        Program { cells: vec![] }
    }

    pub fn push(&mut self, op: Opcode) {
        self.cells.push(Cell::Op(op));
    }

    pub fn push_number(&mut self, value: f64) {
        self.cells.push(Cell::Op(Opcode::Number));
        self.cells.push(Cell::Val(value));
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub(crate) fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    pub(crate) fn from_cells(cells: Vec<Cell>) -> Program {
        Program { cells }
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listing = self
            .cells
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "[{}]", listing)
    }
}
