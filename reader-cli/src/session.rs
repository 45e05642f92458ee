//! Interactive Session
//!
//! Reads commands line by line, runs them against a [`TraceReader`] and
//! writes the results. Per-command problems go to the error stream and the
//! session continues; only I/O failures on the streams end it early.

use crate::command::{Command, CommandError, Window, COMMANDS};
use crate::config::ReaderConfig;
use std::io::{self, BufRead, Write};
use trace_reader::{ExecState, TraceReader};

/// Bytes per row of a hex dump
const HEX_ROW_LEN: usize = 16;

pub struct Session {
    reader: TraceReader,
    prompt: String,
    info: String,
    default_count: u64,
    last_line: String,
    running: bool,
}

impl Session {
    pub fn new(reader: TraceReader, config: &ReaderConfig) -> Self {
        Self {
            reader,
            prompt: config.prompt.clone(),
            info: config.info.clone(),
            default_count: config.default_count,
            last_line: String::new(),
            running: false,
        }
    }

    pub fn reader(&self) -> &TraceReader {
        &self.reader
    }

    pub fn info(&self) -> &str {
        &self.info
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run until `quit` or end of input
    pub fn run<R, W, E>(&mut self, input: R, out: &mut W, err: &mut E) -> io::Result<()>
    where
        R: BufRead,
        W: Write,
        E: Write,
    {
        self.running = true;
        self.show_prompt(out)?;

        for line in input.lines() {
            self.execute_line(&line?, out, err)?;
            if !self.running {
                break;
            }
            self.show_prompt(out)?;
        }

        self.running = false;
        Ok(())
    }

    /// Run one input line
    ///
    /// A line without a command repeats the previous one.
    pub fn execute_line<W: Write, E: Write>(
        &mut self,
        line: &str,
        out: &mut W,
        err: &mut E,
    ) -> io::Result<()> {
        if line.trim().is_empty() {
            let last = self.last_line.clone();
            if last.is_empty() {
                return Ok(());
            }
            return self.dispatch(&last, out, err);
        }

        self.last_line = line.to_string();
        self.dispatch(line, out, err)
    }

    fn dispatch<W: Write, E: Write>(&mut self, line: &str, out: &mut W, err: &mut E) -> io::Result<()> {
        let result = match Command::parse(line) {
            Ok(Some(command)) => self.execute(command, out),
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => Ok(()),
            Err(CommandError::Io(e)) => Err(e),
            Err(CommandError::NotFound(name)) => {
                writeln!(err, "Command {} not found", name)
            }
            Err(e) => writeln!(err, "Error: {}", e),
        }
    }

    /// Run a parsed command, writing its output
    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<(), CommandError> {
        tracing::debug!("Executing {:?} at {}", command, self.reader.ip());

        match command {
            Command::Step => {
                let status = self.reader.step();
                self.report(status, out)?;
            }
            Command::Continue => {
                let status = self.reader.continue_exec();
                self.report(status, out)?;
            }
            Command::Finish => {
                let status = self.reader.run_to_return();
                self.report(status, out)?;
            }
            Command::Counts { json: false } => {
                writeln!(out, "Counts:")?;
                for count in self.reader.hit_counts() {
                    writeln!(out, "{}: {}", count.name, count.count)?;
                }
            }
            Command::Counts { json: true } => {
                serde_json::to_writer_pretty(&mut *out, &self.reader.hit_counts())?;
                writeln!(out)?;
            }
            Command::Breakpoints => {
                writeln!(out, "Breakpoints:")?;
                for offset in self.reader.breakpoints() {
                    writeln!(out, "{}", offset)?;
                }
            }
            Command::Break(offset) => self.reader.set_breakpoint(offset)?,
            Command::Delete(offset) => self.reader.clear_breakpoint(offset)?,
            Command::Jump(ip) => self.reader.jump(ip),
            Command::Reset => self.reader.reset(),
            Command::Disassemble(window) => {
                let (start, count) = self.resolve(window);
                for instruction in self.reader.disassemble(start, count)? {
                    writeln!(out, "{}", instruction)?;
                }
            }
            Command::Raw(window) => {
                let (start, count) = self.resolve(window);
                for byte in self.reader.buffer().slice(start, count)? {
                    writeln!(out, "{}", byte)?;
                }
            }
            Command::Hex(window) => {
                let (start, count) = self.resolve(window);
                let bytes = self.reader.buffer().slice(start, count)?;
                for (row, chunk) in bytes.chunks(HEX_ROW_LEN).enumerate() {
                    let offset = start + (row * HEX_ROW_LEN) as u64;
                    writeln!(out, "{:08x}: {}", offset, hex::encode(chunk))?;
                }
            }
            Command::Info(None) => writeln!(out, "{:?}", self.info)?,
            Command::Info(Some(template)) => {
                self.info = template;
                writeln!(out, "info string set to {:?}", self.info)?;
            }
            Command::Prompt(template) => {
                self.prompt = template;
                writeln!(out, "prompt set to {:?}", self.prompt)?;
            }
            Command::Help => {
                for (usage, description) in COMMANDS {
                    writeln!(out, "  {:<20} {}", usage, description)?;
                }
            }
            Command::Quit => self.running = false,
        }

        out.flush()?;
        Ok(())
    }

    fn report<W: Write>(&self, status: ExecState, out: &mut W) -> io::Result<()> {
        match status {
            ExecState::Stopped => {}
            ExecState::AtBreakpoint => writeln!(out, "Breakpoint at {}", self.reader.ip())?,
            ExecState::Finished => writeln!(out, "End of trace")?,
        }
        self.reader.write_trace(&self.info, out)
    }

    fn resolve(&self, window: Window) -> (u64, u64) {
        (
            window.start.unwrap_or_else(|| self.reader.ip()),
            window.count.unwrap_or(self.default_count),
        )
    }

    fn show_prompt<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.reader.write_trace(&self.prompt, out)?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trace_reader::{Op, TraceBuffer, RET_SENTINEL};

    fn session(bytes: &[u8]) -> Session {
        let reader = TraceReader::new(TraceBuffer::from_bytes(bytes.to_vec()));
        Session::new(reader, &ReaderConfig::default())
    }

    fn run_line(session: &mut Session, line: &str) -> (String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        session.execute_line(line, &mut out, &mut err).unwrap();
        (String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
    }

    #[test]
    fn test_raw_ignores_instruction_boundaries() {
        let mut session = session(&[5, RET_SENTINEL, 9]);
        let (out, err) = run_line(&mut session, "raw 0 3");
        assert_eq!(out, "5\n254\n9\n");
        assert_eq!(err, "");
    }

    #[test]
    fn test_raw_stops_at_end_of_trace() {
        let mut session = session(&[1, 2, 3]);
        let (out, _) = run_line(&mut session, "raw 1 10");
        assert_eq!(out, "2\n3\n");
    }

    #[test]
    fn test_hex_rows() {
        let bytes: Vec<u8> = (0..20).collect();
        let mut session = session(&bytes);
        let (out, _) = run_line(&mut session, "hex 2 18");
        assert_eq!(
            out,
            "00000002: 02030405060708090a0b0c0d0e0f1011\n00000012: 1213\n"
        );
    }

    #[test]
    fn test_disassemble_defaults_to_current_ip() {
        let mut session = session(&[Op::Load as u8, Op::Add as u8, RET_SENTINEL, 0, Op::Car as u8]);
        run_line(&mut session, "s");
        let (out, _) = run_line(&mut session, "dis");
        assert_eq!(out, "1: ADD\n2: RET\n4: CAR\n");
        assert_eq!(session.reader().ip(), 1);
    }

    #[test]
    fn test_step_renders_info_template() {
        let mut session = session(&[Op::Load as u8, Op::Add as u8, Op::Car as u8]);
        run_line(&mut session, r#"info "%i: %o\n""#);

        let (out, _) = run_line(&mut session, "s");
        assert_eq!(out, "1: ADD\n");

        // Empty line repeats the last command
        let (out, _) = run_line(&mut session, "");
        assert_eq!(out, "2: CAR\n");

        let (out, _) = run_line(&mut session, "s");
        assert_eq!(out, "End of trace\n3: !ERR!\n");
    }

    #[test]
    fn test_breakpoint_commands() {
        let mut session = session(&[Op::Load as u8, Op::Add as u8, Op::Car as u8, Op::Add as u8]);
        run_line(&mut session, "b 2");
        run_line(&mut session, "b 3");
        run_line(&mut session, "d 3");

        let (out, _) = run_line(&mut session, "bps");
        assert_eq!(out, "Breakpoints:\n2\n");

        let (out, _) = run_line(&mut session, "c");
        assert_eq!(out, "Breakpoint at 2\n");

        let (_, err) = run_line(&mut session, "b 4");
        assert_eq!(err, "Error: offset 4 is outside the trace (4 bytes)\n");
    }

    #[test]
    fn test_counts_listing() {
        let mut session = session(&[Op::Load as u8, Op::Car as u8, Op::Add as u8, Op::Car as u8]);
        run_line(&mut session, "c");

        let (out, _) = run_line(&mut session, "counts");
        assert_eq!(out, "Counts:\nADD: 1\nCAR: 2\n");

        let (out, _) = run_line(&mut session, "counts json");
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["name"], "ADD");
        assert_eq!(parsed[1]["count"], 2);
    }

    #[test]
    fn test_info_and_prompt_templates() {
        let mut session = session(&[Op::Load as u8]);
        assert_eq!(session.prompt(), "> ");

        let (out, _) = run_line(&mut session, "info");
        assert_eq!(out, "\"\"\n");

        let (out, _) = run_line(&mut session, "info '%o @ %i'");
        assert_eq!(out, "info string set to \"%o @ %i\"\n");
        assert_eq!(session.info(), "%o @ %i");

        run_line(&mut session, "prompt '(%i) '");
        assert_eq!(session.prompt(), "(%i) ");
    }

    #[test]
    fn test_unknown_command_reports_and_continues() {
        let mut session = session(&[0]);
        let (out, err) = run_line(&mut session, "bogus");
        assert_eq!(out, "");
        assert_eq!(err, "Command bogus not found\n");
    }

    #[test]
    fn test_run_until_quit() {
        let mut session = session(&[Op::Load as u8, Op::Add as u8]);
        let input = "prompt '[%i] '\ns\nquit\ns\n";
        let mut out = Vec::new();
        let mut err = Vec::new();

        session.run(input.as_bytes(), &mut out, &mut err).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert_eq!(out, "> prompt set to \"[%i] \"\n[0] [1] ");
        assert_eq!(session.reader().ip(), 1);
        assert!(!session.is_running());
    }
}
