//! Trace Reader - Post-mortem stepping through recorded opcode traces
//!
//! This crate loads a flat binary trace of interpreter opcodes and lets a
//! caller walk it one instruction at a time, the way a debugger walks a live
//! program.
//!
//! # Overview
//!
//! The reader keeps a small amount of session state on top of the immutable
//! trace bytes:
//!
//! * An instruction pointer (IP), advanced by each instruction's size
//! * One breakpoint flag per trace offset
//! * A hit counter per opcode value, bumped every time stepping lands on it
//!
//! Inspection at another offset goes through [`IpFrame`], which moves the IP
//! for the lifetime of a scope and puts it back afterwards.
//!
//! # Usage
//!
//! ```no_run
//! use trace_reader::{ExecState, TraceReader};
//!
//! let mut reader = TraceReader::load("out_primary.log").unwrap();
//! reader.set_breakpoint(128).unwrap();
//!
//! if reader.continue_exec() == ExecState::AtBreakpoint {
//!     print!("{}", reader.format_trace("%i: %o\\n"));
//! }
//! for count in reader.hit_counts() {
//!     println!("{}: {}", count.name, count.count);
//! }
//! ```
//!
//! # Trace format
//!
//! * Each byte below [`OP_MAXDEFINED`] - 1 is a one-byte instruction
//! * Byte [`RET_SENTINEL`] is the terminator and is followed by one operand
//!   byte that the reader skips
//! * Anything else is undecodable; it is reported as `!ERR!` and stepping off
//!   it ends the run

pub mod buffer;
pub mod error;
pub mod frame;
pub mod opcodes;
pub mod reader;

pub use buffer::TraceBuffer;
pub use error::{LoadError, ReaderError};
pub use frame::IpFrame;
pub use opcodes::{InstructionSize, Op, Opcode, INVALID_OPCODE_NAME, OP_MAXDEFINED, RET_SENTINEL};
pub use reader::{DisassembledInstruction, ExecState, HitCount, TraceReader};

/// Result type for trace reader operations
pub type Result<T> = std::result::Result<T, ReaderError>;
