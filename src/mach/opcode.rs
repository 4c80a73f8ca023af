/// ## Virtual machine instruction set
///
/// The machine has no registers. Every word operates on the operand
/// stack, and the compiled program is a flat sequence of these opcodes
/// with `Number` immediately followed by one inline operand cell.
///
/// The catalog in `from_name` is the language's portable surface: every
/// spelling, alias, stack requirement and time-dependence flag must stay
/// source compatible.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// End of program sentinel. Always the last cell.
    Eof,
    Noop,
    /// The next cell is an inline operand, not an opcode.
    Number,
    /// Pop one value to the output channel.
    Output,
    /// Pop one value and replace the mixdown clip divisor.
    Clip,

    // *** Consumed by the reader; never reach the runtime
    BeginComment,
    EndComment,
    BeginDef,
    EndDef,
    Constant,
    Control,
    Keep,

    // *** Branch control
    If,
    Then,
    Else,
    From,
    ChooseSep,
    Choose,
    /// Reserved. Never implemented.
    Loop,

    // *** Literal blocks, folded away by the optimizer
    BeginLit,
    EndLit,

    // *** Forth words
    False,
    True,
    Plus,
    Minus,
    Times,
    Divide,
    Mod,
    Dmod,
    Equals,
    Greater,
    Less,
    Not,
    And,
    Or,
    Max,
    Min,
    Dup,
    Ddup,
    Over,
    Drop,
    Nip,
    Tuck,
    Swap,
    Rot,

    // *** Musical words
    Hz,
    Bpm,
    S,
    Flat,
    Sharp,
    High,
    Low,
    On,

    // *** Time-dependent words
    T,
    Sin,
    Saw,
    Tr,
    Pulse,
    Sq,
    Noise,

    // *** History access
    Peek,
    Poke,
    Old,
    Delta,
}

impl Opcode {
    /// Look up a built-in word by its (upper-cased) spelling.
    pub fn from_name(name: &str) -> Option<Opcode> {
        use Opcode::*;
        let op = match name {
            "NOOP" => Noop,
            "." => Output,
            "CLIP" => Clip,

            "(" => BeginComment,
            ")" => EndComment,
            ":" => BeginDef,
            ";" => EndDef,
            "CONSTANT" => Constant,
            "CONTROL" => Control,
            "KEEP" => Keep,

            "IF" => If,
            "THEN" => Then,
            "ELSE" => Else,
            "FROM" => From,
            "," => ChooseSep,
            "CHOOSE" => Choose,
            "LOOP" => Loop,

            "[" => BeginLit,
            "]" => EndLit,

            "FALSE" => False,
            "TRUE" => True,
            "+" => Plus,
            "-" => Minus,
            "*" => Times,
            "/" => Divide,
            "MOD" => Mod,
            "DMOD" => Dmod,
            "=" => Equals,
            ">" => Greater,
            "<" => Less,
            "NOT" => Not,
            "AND" => And,
            "OR" => Or,
            "MAX" => Max,
            "MIN" => Min,
            "DUP" => Dup,
            "DDUP" => Ddup,
            "OVER" => Over,
            "DROP" => Drop,
            "NIP" => Nip,
            "TUCK" => Tuck,
            "SWAP" => Swap,
            "ROT" => Rot,

            "HZ" => Hz,
            "BPM" => Bpm,
            "S" => S,
            "FLAT" => Flat,
            "SHARP" | "#" | "♯" => Sharp,
            "HIGH" | "'" | "↑" => High,
            "LOW" | "_" => Low,
            "ON" => On,

            "T" => T,
            "SIN" => Sin,
            "SAW" => Saw,
            "TR" => Tr,
            "PULSE" => Pulse,
            "SQ" => Sq,
            "NOISE" => Noise,

            "PEEK" | "@" => Peek,
            "POKE" | "!" => Poke,
            "OLD" => Old,
            "DELTA" => Delta,

            _ => return None,
        };
        Some(op)
    }

    /// How many values must be on the stack before this opcode may run.
    pub fn needs(self) -> usize {
        use Opcode::*;
        match self {
            Output | Clip | If | From | Constant | Keep | Not | Dup | Drop | Hz | Bpm | S
            | Flat | Sharp | High | Low | Sin | Saw | Tr | Sq | Noise | Peek | Delta => 1,
            Plus | Minus | Times | Divide | Mod | Dmod | Equals | Greater | Less | And | Or
            | Max | Min | Ddup | Over | Nip | Tuck | Swap | Pulse | Poke | Old => 2,
            Rot | On => 3,
            _ => 0,
        }
    }

    /// True for words whose result depends on when they run. These can
    /// never be folded into a constant by the optimizer.
    pub fn time_dependent(self) -> bool {
        use Opcode::*;
        match self {
            T | Sin | Saw | Tr | Pulse | Sq | Noise | Peek | Poke | Old | Delta => true,
            _ => false,
        }
    }
}

impl std::fmt::Debug for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string())
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Opcode::*;
        let name = match self {
            Eof => "EOF",
            Noop => "NOOP",
            Number => "NUMBER",
            Output => ".",
            Clip => "CLIP",
            BeginComment => "(",
            EndComment => ")",
            BeginDef => ":",
            EndDef => ";",
            Constant => "CONSTANT",
            Control => "CONTROL",
            Keep => "KEEP",
            If => "IF",
            Then => "THEN",
            Else => "ELSE",
            From => "FROM",
            ChooseSep => ",",
            Choose => "CHOOSE",
            Loop => "LOOP",
            BeginLit => "[",
            EndLit => "]",
            False => "FALSE",
            True => "TRUE",
            Plus => "+",
            Minus => "-",
            Times => "*",
            Divide => "/",
            Mod => "MOD",
            Dmod => "DMOD",
            Equals => "=",
            Greater => ">",
            Less => "<",
            Not => "NOT",
            And => "AND",
            Or => "OR",
            Max => "MAX",
            Min => "MIN",
            Dup => "DUP",
            Ddup => "DDUP",
            Over => "OVER",
            Drop => "DROP",
            Nip => "NIP",
            Tuck => "TUCK",
            Swap => "SWAP",
            Rot => "ROT",
            Hz => "HZ",
            Bpm => "BPM",
            S => "S",
            Flat => "FLAT",
            Sharp => "SHARP",
            High => "HIGH",
            Low => "LOW",
            On => "ON",
            T => "T",
            Sin => "SIN",
            Saw => "SAW",
            Tr => "TR",
            Pulse => "PULSE",
            Sq => "SQ",
            Noise => "NOISE",
            Peek => "PEEK",
            Poke => "POKE",
            Old => "OLD",
            Delta => "DELTA",
        };
        write!(f, "{}", name)
    }
}
