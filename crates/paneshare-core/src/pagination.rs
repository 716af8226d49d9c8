//! Output pagination over a session's line buffer.
//!
//! The sign of the requested offset selects the mode:
//!
//! ```text
//! offset == 0  incremental  start at the read cursor, advance it afterwards
//! offset  > 0  absolute     start at line `offset`, cursor untouched
//! offset  < 0  tail         start |offset| lines before the end, cursor untouched
//! ```

use serde::Serialize;

use crate::control::ControlMode;
use crate::types::{SessionId, SessionRecord};

/// Line count returned when the caller does not ask for one.
pub const DEFAULT_READ_LENGTH: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    Incremental,
    Absolute(usize),
    Tail(usize),
}

impl ReadMode {
    pub fn from_offset(offset: i64) -> Self {
        match offset {
            0 => Self::Incremental,
            o if o > 0 => Self::Absolute(usize::try_from(o).unwrap_or(usize::MAX)),
            o => Self::Tail(usize::try_from(o.unsigned_abs()).unwrap_or(usize::MAX)),
        }
    }

    /// Only incremental reads move the cursor.
    pub fn advances_cursor(self) -> bool {
        matches!(self, Self::Incremental)
    }
}

/// One page of output plus the bookkeeping needed to ask for the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputPage {
    pub session_id: SessionId,
    pub lines: Vec<String>,
    pub total_lines: usize,
    pub read_from: usize,
    pub read_count: usize,
    /// Lines after this page: `total_lines - (read_from + read_count)`, floored at 0.
    pub remaining: usize,
    pub control_mode: ControlMode,
}

impl OutputPage {
    /// Lines joined the way a terminal shows them.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

impl SessionRecord {
    /// Replace the buffer wholesale (persistent capture is the source of truth).
    ///
    /// The cursor is clamped so it never points past a shorter capture.
    pub fn replace_output(&mut self, lines: Vec<String>) {
        self.output_buffer = lines;
        self.read_cursor = self.read_cursor.min(self.output_buffer.len());
    }

    /// Append lines to the local buffer of a direct-only session.
    pub fn append_output<I>(&mut self, lines: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.output_buffer.extend(lines.into_iter().map(Into::into));
    }

    /// Read a page of buffered output. Incremental reads advance the cursor.
    pub fn paginate(&mut self, offset: i64, length: usize) -> OutputPage {
        let mode = ReadMode::from_offset(offset);
        let total = self.output_buffer.len();

        let start = match mode {
            ReadMode::Incremental => self.read_cursor.min(total),
            ReadMode::Absolute(index) => index,
            ReadMode::Tail(back) => total.saturating_sub(back),
        };

        let lines: Vec<String> = if start >= total {
            Vec::new()
        } else {
            let end = start.saturating_add(length).min(total);
            self.output_buffer[start..end].to_vec()
        };
        let read_count = lines.len();

        if mode.advances_cursor() {
            self.read_cursor = start.saturating_add(read_count).min(total);
        }

        OutputPage {
            session_id: self.id,
            lines,
            total_lines: total,
            read_from: start,
            read_count,
            remaining: total.saturating_sub(start.saturating_add(read_count)),
            control_mode: self.control_mode,
        }
    }
}
