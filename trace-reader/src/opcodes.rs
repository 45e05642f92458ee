//! Opcode table and instruction decoding rules
//!
//! The trace is a flat stream of opcodes emitted by the Scheme interpreter's
//! dispatch loop. Every named opcode occupies one byte, except the
//! terminator (`RET`), which is written to disk as the reserved sentinel
//! byte [`RET_SENTINEL`] followed by one operand byte.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;
use std::fmt;
use strum::EnumCount;
use strum_macros::{EnumCount, IntoStaticStr};

/// Raw byte value that encodes the terminator on disk
pub const RET_SENTINEL: u8 = 254;

/// Placeholder printed in place of a name for bytes outside the opcode table
pub const INVALID_OPCODE_NAME: &str = "!ERR!";

/// Number of named opcodes, terminator included
///
/// `RET` is the last entry, so every value below `Op::Ret` is an ordinary
/// one-byte opcode and `OP_MAXDEFINED - 1` is the terminator's value.
pub const OP_MAXDEFINED: usize = Op::COUNT;

/// Every named opcode, in value order
///
/// Values are assigned implicitly from 0. `Ret` must stay the last variant:
/// its value is "one past the last ordinary opcode".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, IntoStaticStr, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Op {
    // Top level
    Load,
    T0lvl,
    T1lvl,
    ReadInternal,
    Gensym,
    Valueprint,

    // Evaluator
    Eval,
    RealEval,
    E0args,
    E1args,
    Apply,
    RealApply,
    Lambda,
    Lambda1,
    Mkclosure,
    Quote,
    Def0,
    Def1,
    Defp,
    Begin,
    If0,
    If1,
    Set0,
    Set1,
    Let0,
    Let1,
    Let2,
    Let0ast,
    Let1ast,
    Let2ast,
    Let0rec,
    Let1rec,
    Let2rec,
    Cond0,
    Cond1,
    Delay,
    And0,
    And1,
    Or0,
    Or1,
    C0stream,
    C1stream,
    Macro0,
    Macro1,
    Case0,
    Case1,
    Case2,
    Peval,
    Papply,
    Continuation,

    // Numbers
    Inex2ex,
    Exp,
    Log,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sqrt,
    Expt,
    Floor,
    Ceiling,
    Truncate,
    Round,
    Add,
    Sub,
    Mul,
    Div,
    Intdiv,
    Rem,
    Mod,

    // Pairs, characters, strings and vectors
    Car,
    Cdr,
    Cons,
    Setcar,
    Setcdr,
    Char2int,
    Int2char,
    Charupcase,
    Chardncase,
    Sym2str,
    Atom2str,
    Str2sym,
    Str2atom,
    Mkstring,
    Strlen,
    Strref,
    Strset,
    Strappend,
    Substr,
    Vector,
    Mkvector,
    Veclen,
    Vecref,
    Vecset,

    // Predicates
    Not,
    Boolp,
    Eofobjp,
    Nullp,
    Numeq,
    Less,
    Gre,
    Leq,
    Geq,
    Symbolp,
    Numberp,
    Stringp,
    Integerp,
    Realp,
    Charp,
    Charap,
    Charnp,
    Charwp,
    Charup,
    Charlp,
    Portp,
    Inportp,
    Outportp,
    Procp,
    Pairp,
    Listp,
    Envp,
    Vectorp,
    Eq,
    Eqv,

    // Miscellaneous builtins
    Force,
    SaveForced,
    Write,
    WriteChar,
    Display,
    Newline,
    Err0,
    Err1,
    Reverse,
    ListStar,
    Append,
    Put,
    Get,
    Quit,
    Gc,
    Gcverb,
    Newsegment,
    Oblist,

    // Ports
    CurrInport,
    CurrOutport,
    OpenInfile,
    OpenOutfile,
    OpenInoutfile,
    OpenInstring,
    OpenInoutstring,
    OpenOutstring,
    GetOutstring,
    CloseInport,
    CloseOutport,
    IntEnv,
    CurrEnv,

    // Reader
    Read,
    ReadChar,
    PeekChar,
    CharReady,
    SetInport,
    SetOutport,
    Rdsexpr,
    Rdlist,
    Rddot,
    Rdquote,
    Rdqquote,
    Rdqquotevec,
    Rdunquote,
    Rduqtsp,
    Rdvec,

    // Printer
    P0list,
    P1list,
    Pvecfrom,

    // Introspection
    ListLength,
    Assq,
    GetClosure,
    Closurep,
    Macrop,

    // Terminator
    Ret,
}

// The sentinel byte must never be mistaken for a named opcode.
const _: () = assert!(OP_MAXDEFINED < RET_SENTINEL as usize);

impl Op {
    /// Display name of this opcode
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Decoded opcode value
///
/// Holds the symbolic value: the sentinel byte has already been mapped to
/// [`Opcode::RET`]. Any other byte is kept unchanged, valid or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Opcode(u8);

impl Opcode {
    /// Symbolic value of the terminator
    pub const RET: Opcode = Opcode(Op::Ret as u8);

    /// Decode a raw trace byte
    pub fn decode(raw: u8) -> Self {
        if raw == RET_SENTINEL {
            Self::RET
        } else {
            Self(raw)
        }
    }

    /// Opcode with the given symbolic value, bypassing sentinel mapping
    pub fn from_value(value: u8) -> Self {
        Self(value)
    }

    /// Symbolic value
    pub fn value(self) -> u8 {
        self.0
    }

    /// True for every named opcode, terminator included
    pub fn is_valid(self) -> bool {
        (self.0 as usize) < OP_MAXDEFINED
    }

    pub fn is_terminator(self) -> bool {
        self == Self::RET
    }

    /// True for single-byte opcodes
    pub fn is_ordinary(self) -> bool {
        self.0 < Self::RET.0
    }

    /// Named opcode, if the value is in the table
    pub fn op(self) -> Option<Op> {
        Op::try_from(self.0).ok()
    }

    pub fn name(self) -> Option<&'static str> {
        self.op().map(Op::name)
    }

    /// Number of trace bytes the instruction starting with this opcode spans
    pub fn instruction_size(self) -> InstructionSize {
        if self.is_ordinary() {
            InstructionSize::Bytes(1)
        } else if self.is_terminator() {
            InstructionSize::Bytes(2)
        } else {
            InstructionSize::Invalid
        }
    }
}

impl From<Op> for Opcode {
    fn from(op: Op) -> Self {
        Self(op.into())
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().unwrap_or(INVALID_OPCODE_NAME))
    }
}

/// Size of a decoded instruction
///
/// `Invalid` is deliberately not a number: an undecodable byte has no size,
/// and treating it as one would silently move the instruction pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionSize {
    Bytes(u8),
    Invalid,
}

impl InstructionSize {
    /// Byte count, or `None` for an undecodable instruction
    pub fn bytes(self) -> Option<u64> {
        match self {
            InstructionSize::Bytes(n) => Some(u64::from(n)),
            InstructionSize::Invalid => None,
        }
    }

    pub fn is_valid(self) -> bool {
        matches!(self, InstructionSize::Bytes(_))
    }
}
