use super::boundary::BoundaryDetector;
use super::delivery::RecordSender;
use super::error::{ConvertError, Result};
use super::tokenizer::{Line, classify};
use super::types::GameRecord;
use std::borrow::Cow;
use std::io::{BufRead, BufReader, Read};
use std::mem;

const READ_BUFFER_SIZE: usize = 256 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseSummary {
    pub lines: u64,
    pub records: u64,
}

/// Streaming game reader over decoded PGN text.
///
/// Yields each game as soon as the boundary detector declares it complete.
/// The trailing game is yielded at end of input unless it is empty or was
/// already emitted.
pub struct GameReader<R> {
    input: R,
    line_buf: Vec<u8>,
    boundary: BoundaryDetector,
    current: GameRecord,
    emitted: bool,
    lines_read: u64,
    done: bool,
}

impl<R: BufRead> GameReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            line_buf: Vec::new(),
            boundary: BoundaryDetector::new(),
            current: GameRecord::new(),
            emitted: false,
            lines_read: 0,
            done: false,
        }
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    fn emit_current(&mut self) -> Option<GameRecord> {
        if self.emitted {
            return None;
        }
        if self.current.is_empty() {
            log::debug!(
                "Skipping empty record (line {})",
                self.lines_read
            );
            return None;
        }

        self.emitted = true;
        Some(mem::take(&mut self.current))
    }

    fn start_record(&mut self) {
        self.current = GameRecord::new();
        self.emitted = false;
    }

    fn apply(record: &mut GameRecord, line: Line<'_>) {
        match line {
            Line::Tag { name, value } => record.set_tag(name, &value),
            Line::AnnotatedMoves(moves) | Line::PlainMoves(moves) => record.extend_moves(moves),
            Line::Other => {}
        }
    }
}

impl<R: BufRead> Iterator for GameReader<R> {
    type Item = Result<GameRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            self.line_buf.clear();
            match self.input.read_until(b'\n', &mut self.line_buf) {
                Ok(0) => {
                    self.done = true;
                    return self.emit_current().map(Ok);
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(ConvertError::InputRead(e)));
                }
            }
            self.lines_read += 1;

            let completed = if self.boundary.check() {
                let completed = self.emit_current();
                self.start_record();
                completed
            } else {
                None
            };

            let text = String::from_utf8_lossy(&self.line_buf);
            if let Cow::Owned(_) = text {
                log::warn!(
                    "Replaced invalid UTF-8 on line {} of the input",
                    self.lines_read
                );
            }
            let line = classify(&text);
            let is_tag = line.is_tag();
            Self::apply(&mut self.current, line);
            self.boundary.observe(is_tag);

            if let Some(record) = completed {
                return Some(Ok(record));
            }
        }
    }
}

/// Parse every game from `input` (already decompressed) into `sink`, then
/// wait until the consumer has acknowledged all of them.
pub fn parse<R: Read>(input: R, sink: RecordSender) -> Result<ParseSummary> {
    let mut reader = GameReader::new(BufReader::with_capacity(READ_BUFFER_SIZE, input));
    let mut records = 0u64;

    for record in reader.by_ref() {
        sink.send(record?)?;
        records += 1;
    }
    sink.drain()?;

    let summary = ParseSummary {
        lines: reader.lines_read(),
        records,
    };
    log::info!(
        "Parsed {} records from {} lines",
        summary.records,
        summary.lines
    );
    Ok(summary)
}
