//! Line framing for the GatePro serial protocol.
//!
//! The controller speaks line-oriented ASCII. Every inbound line starts with
//! one of two markers and ends with `\r\n`:
//!
//! ```text
//! ACK RS:00,80,C4,C6,3E,16,FF,FF,FF\r\n     reply to a command
//! $V1PKF0,17,Closed;src=0001\r\n           unsolicited motor event
//! ```
//!
//! [`FrameParser`] turns an unaligned byte stream into validated [`Frame`]s.
//! Bytes that do not belong to a marker-prefixed line are skipped and
//! reported once per run as [`FrameError::Garbage`].

use core::fmt;

use heapless::Vec;

/// Maximum frame length in bytes, excluding the line terminator.
pub const MAX_FRAME_LEN: usize = 96;

/// Prefix of every reply line.
pub const ACK_MARKER: &[u8] = b"ACK ";

/// Prefix of every unsolicited event line.
pub const EVENT_MARKER: &[u8] = b"$V1";

const MARKERS: [&[u8]; 2] = [ACK_MARKER, EVENT_MARKER];

/// Error reported by the frame parser. None of these are fatal; the
/// parser resynchronises on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// This many bytes were skipped while hunting for a marker.
    Garbage(usize),
    /// A line grew past [`MAX_FRAME_LEN`] without a terminator.
    Overflow,
    /// A non-printable byte showed up inside a line.
    InvalidByte(u8),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Garbage(n) => write!(f, "skipped {} garbage bytes", n),
            Self::Overflow => write!(f, "line exceeds {} bytes", MAX_FRAME_LEN),
            Self::InvalidByte(b) => write!(f, "invalid byte 0x{:02X} in line", b),
        }
    }
}

/// Which marker a frame starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Marker {
    Ack,
    Event,
}

/// One protocol line without its terminator.
///
/// Inbound frames come out of [`FrameParser`] and always start with a
/// marker. Outbound frames are built by the command encoder and carry no
/// marker.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    bytes: Vec<u8, MAX_FRAME_LEN>,
}

impl Frame {
    /// Build a frame from a line, checking length and character set.
    ///
    /// A trailing `\r\n` (or either alone) is stripped first.
    pub fn new(line: &[u8]) -> Result<Self, FrameError> {
        let line = strip_line_ending(line);
        if line.len() > MAX_FRAME_LEN {
            return Err(FrameError::Overflow);
        }
        if let Some(&b) = line.iter().find(|&&b| !is_printable(b)) {
            return Err(FrameError::InvalidByte(b));
        }

        let mut bytes = Vec::new();
        bytes
            .extend_from_slice(line)
            .map_err(|_| FrameError::Overflow)?;
        Ok(Self { bytes })
    }

    pub(crate) const fn empty() -> Self {
        Self { bytes: Vec::new() }
    }

    pub(crate) fn extend_from_slice(&mut self, data: &[u8]) -> Result<(), FrameError> {
        self.bytes
            .extend_from_slice(data)
            .map_err(|_| FrameError::Overflow)
    }

    /// Raw line content.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The marker this frame starts with, if any.
    #[must_use]
    pub fn marker(&self) -> Option<Marker> {
        if self.bytes.starts_with(ACK_MARKER) {
            Some(Marker::Ack)
        } else if self.bytes.starts_with(EVENT_MARKER) {
            Some(Marker::Event)
        } else {
            None
        }
    }

    /// Display adapter that escapes control and non-ASCII bytes.
    #[must_use]
    pub fn escaped(&self) -> Escaped<'_> {
        Escaped(&self.bytes)
    }

    /// Write the frame followed by `\r\n`.
    #[cfg(feature = "embedded-io")]
    pub fn write_to<W: embedded_io::Write>(&self, writer: &mut W) -> Result<(), W::Error> {
        writer.write_all(&self.bytes)?;
        writer.write_all(b"\r\n")
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame(\"{}\")", self.escaped())
    }
}

/// Escaping display wrapper returned by [`Frame::escaped`].
pub struct Escaped<'a>(&'a [u8]);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in self.0 {
            for c in core::ascii::escape_default(b) {
                fmt::Write::write_char(f, c as char)?;
            }
        }
        Ok(())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Escaped<'_> {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "{=[u8]:a}", self.0)
    }
}

/// Streaming line parser.
///
/// Feed it arbitrary chunks; it keeps partial lines between calls, so any
/// split of the same byte stream yields the same frames.
///
/// # Example
///
/// ```
/// use gatepro_proto::{FrameParser, FrameError};
///
/// let mut parser = FrameParser::new();
/// assert_eq!(parser.feed(b"ACK RS:00,80,C4,").count(), 0);
///
/// let frames: Vec<_> = parser.feed(b"32,02,FF,FF,FF\r\n").collect();
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].as_ref().unwrap().as_bytes(), b"ACK RS:00,80,C4,32,02,FF,FF,FF");
///
/// let mut frames = parser.feed(b"\xFF\x00ACK STOP\r\n");
/// assert_eq!(frames.next(), Some(Err(FrameError::Garbage(2))));
/// assert!(frames.next().unwrap().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct FrameParser {
    buffer: Vec<u8, MAX_FRAME_LEN>,
    /// Buffer starts with a complete marker.
    synced: bool,
    /// Bytes skipped since the last reported garbage run.
    discarded: usize,
}

impl FrameParser {
    /// Create a new parser.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            synced: false,
            discarded: 0,
        }
    }

    /// Drop any partial line and go back to hunting for a marker.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.synced = false;
        self.discarded = 0;
    }

    /// Number of bytes held for an incomplete line.
    #[inline]
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Feed a chunk of bytes.
    ///
    /// The returned iterator parses lazily; drain it to consume the whole
    /// chunk. Partial lines stay buffered for the next call.
    pub fn feed<'p, 'b>(&'p mut self, bytes: &'b [u8]) -> Frames<'p, 'b> {
        Frames {
            parser: self,
            input: bytes,
        }
    }

    /// Feed a single byte.
    ///
    /// Returns `Some` when a frame completes or an error is reported.
    pub fn push_byte(&mut self, byte: u8) -> Option<Result<Frame, FrameError>> {
        if self.synced {
            self.push_synced(byte)
        } else {
            self.push_hunting(byte)
        }
    }

    fn push_synced(&mut self, byte: u8) -> Option<Result<Frame, FrameError>> {
        match byte {
            b'\r' | b'\n' => {
                let bytes = core::mem::take(&mut self.buffer);
                self.synced = false;
                Some(Ok(Frame { bytes }))
            }
            b if is_printable(b) => {
                if self.buffer.push(b).is_err() {
                    self.reset();
                    return Some(Err(FrameError::Overflow));
                }
                None
            }
            b => {
                self.reset();
                Some(Err(FrameError::InvalidByte(b)))
            }
        }
    }

    fn push_hunting(&mut self, byte: u8) -> Option<Result<Frame, FrameError>> {
        if byte == b'\r' || byte == b'\n' {
            // Whatever was collected cannot start a frame any more
            let skipped = self.discarded + self.buffer.len();
            self.buffer.clear();
            self.discarded = 0;
            return (skipped > 0).then_some(Err(FrameError::Garbage(skipped)));
        }

        // Never longer than the longest marker while hunting
        let _ = self.buffer.push(byte);

        let len = self.buffer.len();
        let skip = (0..len)
            .find(|&i| is_marker_prefix(&self.buffer[i..]))
            .unwrap_or(len);
        if skip > 0 {
            self.buffer.copy_within(skip.., 0);
            self.buffer.truncate(len - skip);
            self.discarded += skip;
        }

        if MARKERS.iter().any(|m| self.buffer.starts_with(m)) {
            self.synced = true;
            if self.discarded > 0 {
                let skipped = core::mem::take(&mut self.discarded);
                return Some(Err(FrameError::Garbage(skipped)));
            }
        }

        None
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`FrameParser::feed`].
pub struct Frames<'p, 'b> {
    parser: &'p mut FrameParser,
    input: &'b [u8],
}

impl Frames<'_, '_> {
    /// Input bytes not yet handed to the parser.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.input.len()
    }
}

impl Iterator for Frames<'_, '_> {
    type Item = Result<Frame, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((&byte, rest)) = self.input.split_first() {
            self.input = rest;
            if let Some(item) = self.parser.push_byte(byte) {
                return Some(item);
            }
        }
        None
    }
}

#[inline]
fn is_printable(b: u8) -> bool {
    (0x20..=0x7E).contains(&b)
}

#[inline]
fn is_marker_prefix(s: &[u8]) -> bool {
    MARKERS.iter().any(|m| m.starts_with(s) || s.starts_with(m))
}

/// Strip trailing CR and/or LF from a line.
#[inline]
fn strip_line_ending(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    if end > 0 && line[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && line[end - 1] == b'\r' {
        end -= 1;
    }
    &line[..end]
}
