//! Scoped instruction pointer save/restore

use crate::reader::TraceReader;
use std::ops::Deref;

/// Temporarily relocated instruction pointer
///
/// Created by [`TraceReader::push_frame`]. While the frame is alive the
/// reader's IP points at the pushed offset, and the reader can be inspected
/// through the frame. Dropping the frame puts the saved IP back, whether
/// the scope is left normally, through `?`, or by unwinding.
///
/// Access through the frame is read-only, apart from pushing a nested
/// frame. Breakpoints and hit counters can't be changed from inside one:
///
/// ```compile_fail
/// use trace_reader::{TraceBuffer, TraceReader};
///
/// let mut reader = TraceReader::new(TraceBuffer::from_bytes(vec![0; 8]));
/// let mut frame = reader.push_frame(3);
/// frame.step();
/// ```
///
/// A frame mutably borrows its reader, so frames nest strictly: an inner
/// frame must be dropped before the frame it was pushed from.
///
/// ```
/// use trace_reader::{TraceBuffer, TraceReader};
///
/// let mut reader = TraceReader::new(TraceBuffer::from_bytes(vec![0; 8]));
/// {
///     let mut outer = reader.push_frame(3);
///     {
///         let inner = outer.push_frame(5);
///         assert_eq!(inner.ip(), 5);
///     }
///     assert_eq!(outer.ip(), 3);
/// }
/// assert_eq!(reader.ip(), 0);
/// ```
///
/// Releasing the outer frame while the inner one is still alive does not
/// compile:
///
/// ```compile_fail
/// use trace_reader::{TraceBuffer, TraceReader};
///
/// let mut reader = TraceReader::new(TraceBuffer::from_bytes(vec![0; 8]));
/// let mut outer = reader.push_frame(3);
/// let inner = outer.push_frame(5);
/// drop(outer);
/// drop(inner);
/// ```
#[must_use = "the instruction pointer is restored as soon as the frame is dropped"]
pub struct IpFrame<'a> {
    reader: &'a mut TraceReader,
    saved_ip: u64,
}

impl<'a> IpFrame<'a> {
    pub(crate) fn push(reader: &'a mut TraceReader, ip: u64) -> Self {
        let saved_ip = reader.ip();
        reader.jump(ip);
        tracing::trace!("Pushed IP frame {} -> {}", saved_ip, ip);
        Self { reader, saved_ip }
    }

    /// IP that will be restored when the frame is dropped
    pub fn saved_ip(&self) -> u64 {
        self.saved_ip
    }

    /// Push a nested frame; it must be dropped before this one
    pub fn push_frame(&mut self, ip: u64) -> IpFrame<'_> {
        IpFrame::push(&mut *self.reader, ip)
    }
}

impl Deref for IpFrame<'_> {
    type Target = TraceReader;

    fn deref(&self) -> &TraceReader {
        self.reader
    }
}

impl Drop for IpFrame<'_> {
    fn drop(&mut self) {
        tracing::trace!("Popped IP frame, restoring {}", self.saved_ip);
        self.reader.jump(self.saved_ip);
    }
}
