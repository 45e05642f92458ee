//! Trace stepping engine
//!
//! Owns the instruction pointer, the breakpoint flags and the per-opcode hit
//! counters, and walks the trace buffer one instruction at a time.
//!
//! Every public operation that takes an offset is bounds checked and returns
//! [`ReaderError::OutOfBounds`] instead of reading past the trace.

use crate::buffer::TraceBuffer;
use crate::error::{LoadError, ReaderError};
use crate::frame::IpFrame;
use crate::opcodes::{InstructionSize, Opcode, INVALID_OPCODE_NAME};
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::Path;

/// Outcome of a stepping operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    /// Landed on an ordinary position
    Stopped,
    /// Landed on a flagged offset
    AtBreakpoint,
    /// Ran off the end of the trace
    Finished,
}

/// Non-zero hit counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HitCount {
    pub opcode: Opcode,
    pub name: &'static str,
    pub count: u64,
}

/// One decoded instruction from a disassembly walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisassembledInstruction {
    /// Offset of the opcode byte
    pub offset: u64,
    /// Byte as stored in the trace
    pub raw: u8,
    pub opcode: Opcode,
}

impl DisassembledInstruction {
    pub fn size(&self) -> InstructionSize {
        self.opcode.instruction_size()
    }
}

impl fmt::Display for DisassembledInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.offset, self.opcode)
    }
}

/// Interactive reader over a recorded opcode trace
#[derive(Debug, Clone)]
pub struct TraceReader {
    ip: u64,
    buffer: TraceBuffer,
    /// One flag per trace byte
    breakpoints: Vec<bool>,
    /// Indexed by symbolic opcode value
    hitcounts: [u64; 256],
}

impl TraceReader {
    pub fn new(buffer: TraceBuffer) -> Self {
        let breakpoints = vec![false; buffer.as_bytes().len()];
        Self {
            ip: 0,
            buffer,
            breakpoints,
            hitcounts: [0; 256],
        }
    }

    /// Load a trace file and position the reader at its first byte
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        TraceBuffer::load(path).map(Self::new)
    }

    pub fn buffer(&self) -> &TraceBuffer {
        &self.buffer
    }

    pub fn ip(&self) -> u64 {
        self.ip
    }

    /// Trace length in bytes
    pub fn len(&self) -> u64 {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Decoded opcode at `offset`
    pub fn opcode_at(&self, offset: u64) -> Result<Opcode, ReaderError> {
        self.buffer.byte(offset).map(Opcode::decode)
    }

    pub fn current_opcode(&self) -> Result<Opcode, ReaderError> {
        self.opcode_at(self.ip)
    }

    /// Size of the instruction starting at `offset`
    pub fn instruction_size(&self, offset: u64) -> Result<InstructionSize, ReaderError> {
        self.opcode_at(offset).map(Opcode::instruction_size)
    }

    pub fn is_valid_opcode(&self, opcode: Opcode) -> bool {
        opcode.is_valid()
    }

    /// Advance past the current instruction
    ///
    /// The hit counter of the instruction landed on is incremented, so the
    /// instruction the reader starts on is never counted by stepping alone.
    pub fn step(&mut self) -> ExecState {
        let size = match self.instruction_size(self.ip) {
            Ok(size) => size,
            Err(_) => return ExecState::Finished,
        };

        match size.bytes() {
            Some(n) => self.ip = self.ip.saturating_add(n),
            None => {
                tracing::warn!(
                    "Undecodable opcode {} at offset {}, treating rest of trace as unreadable",
                    self.buffer.as_bytes()[self.ip as usize],
                    self.ip
                );
                self.ip = self.len();
                return ExecState::Finished;
            }
        }

        let opcode = match self.current_opcode() {
            Ok(opcode) => opcode,
            Err(_) => return ExecState::Finished,
        };
        self.hitcounts[opcode.value() as usize] += 1;

        if self.breakpoints[self.ip as usize] {
            ExecState::AtBreakpoint
        } else {
            ExecState::Stopped
        }
    }

    /// Step until a breakpoint or the end of the trace
    pub fn continue_exec(&mut self) -> ExecState {
        loop {
            let status = self.step();
            if status != ExecState::Stopped {
                tracing::debug!("Continue stopped at {} ({:?})", self.ip, status);
                return status;
            }
        }
    }

    /// Step until the current opcode is the terminator
    ///
    /// Does nothing if the reader is already on a terminator. A breakpoint or
    /// the end of the trace interrupts the run and is reported as-is.
    pub fn run_to_return(&mut self) -> ExecState {
        loop {
            match self.current_opcode() {
                Ok(opcode) if opcode.is_terminator() => return ExecState::Stopped,
                Ok(_) => {}
                Err(_) => return ExecState::Finished,
            }

            let status = self.step();
            if status != ExecState::Stopped {
                tracing::debug!("Run to return interrupted at {} ({:?})", self.ip, status);
                return status;
            }
        }
    }

    /// Set the instruction pointer, without validation
    pub fn jump(&mut self, ip: u64) {
        self.ip = ip;
    }

    /// Move the IP to `ip` until the returned frame is dropped
    pub fn push_frame(&mut self, ip: u64) -> IpFrame<'_> {
        IpFrame::push(self, ip)
    }

    pub fn set_breakpoint(&mut self, offset: u64) -> Result<(), ReaderError> {
        let index = self.breakpoint_index(offset)?;
        self.breakpoints[index] = true;
        Ok(())
    }

    pub fn clear_breakpoint(&mut self, offset: u64) -> Result<(), ReaderError> {
        let index = self.breakpoint_index(offset)?;
        self.breakpoints[index] = false;
        Ok(())
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.fill(false);
    }

    pub fn is_breakpoint(&self, offset: u64) -> bool {
        usize::try_from(offset)
            .ok()
            .and_then(|i| self.breakpoints.get(i).copied())
            .unwrap_or(false)
    }

    /// Flagged offsets, ascending
    pub fn breakpoints(&self) -> Vec<u64> {
        self.breakpoints
            .iter()
            .enumerate()
            .filter(|(_, set)| **set)
            .map(|(offset, _)| offset as u64)
            .collect()
    }

    pub fn hit_count(&self, opcode: Opcode) -> u64 {
        self.hitcounts[opcode.value() as usize]
    }

    /// Non-zero hit counters, in opcode value order
    pub fn hit_counts(&self) -> Vec<HitCount> {
        (0..=u8::MAX)
            .map(Opcode::from_value)
            .filter_map(|opcode| {
                let count = self.hit_count(opcode);
                (count != 0).then(|| HitCount {
                    opcode,
                    name: opcode.name().unwrap_or(INVALID_OPCODE_NAME),
                    count,
                })
            })
            .collect()
    }

    pub fn reset_hit_counts(&mut self) {
        self.hitcounts = [0; 256];
    }

    /// Back to the first byte, with no breakpoints and no counts
    pub fn reset(&mut self) {
        self.ip = 0;
        self.clear_breakpoints();
        self.reset_hit_counts();
    }

    /// Decode up to `count` instructions starting at `offset`
    ///
    /// Walks by instruction size without touching the reader's position. An
    /// undecodable byte is listed and the walk resumes at the next byte.
    pub fn disassemble(
        &mut self,
        offset: u64,
        count: u64,
    ) -> Result<Vec<DisassembledInstruction>, ReaderError> {
        self.buffer.byte(offset)?;

        let mut listing = Vec::new();
        let mut next = offset;
        while listing.len() as u64 != count && next < self.len() {
            let frame = self.push_frame(next);
            let instruction = DisassembledInstruction {
                offset: next,
                raw: frame.buffer().byte(next)?,
                opcode: frame.current_opcode()?,
            };
            drop(frame);

            next += instruction.size().bytes().unwrap_or(1);
            listing.push(instruction);
        }
        Ok(listing)
    }

    /// Expand a prompt/info template
    ///
    /// `%i` is the IP, `%o` the current opcode name (`!ERR!` if invalid or
    /// past the end), `%%` a percent sign; `\n`, `\t` and `\\` are escapes.
    /// Any other directive, and a lone `%` or `\` at the end, expands to
    /// nothing.
    pub fn format_trace(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars();

        while let Some(c) = chars.next() {
            match c {
                '%' => match chars.next() {
                    Some('i') => out.push_str(&self.ip.to_string()),
                    Some('o') => match self.current_opcode() {
                        Ok(opcode) => out.push_str(&opcode.to_string()),
                        Err(_) => out.push_str(INVALID_OPCODE_NAME),
                    },
                    Some('%') => out.push('%'),
                    _ => {}
                },
                '\\' => match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('\\') => out.push('\\'),
                    _ => {}
                },
                c => out.push(c),
            }
        }
        out
    }

    /// [`format_trace`](Self::format_trace) into an output sink
    pub fn write_trace<W: io::Write>(&self, template: &str, sink: &mut W) -> io::Result<()> {
        sink.write_all(self.format_trace(template).as_bytes())
    }

    fn breakpoint_index(&self, offset: u64) -> Result<usize, ReaderError> {
        usize::try_from(offset)
            .ok()
            .filter(|&i| i < self.breakpoints.len())
            .ok_or(ReaderError::OutOfBounds {
                offset,
                len: self.len(),
            })
    }
}
