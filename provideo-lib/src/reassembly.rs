//! Reassembly of multi-record table responses.
//!
//! Some queries answer with an unknown number of value lines, one record
//! each, prefixed by a sync token (usually the name of the command that adds
//! such a record). The channel gives no framing, so records are split across
//! reads or batched together arbitrarily. [`TableAssembler`] consumes raw
//! bytes in whatever pieces they arrive and commits each record as soon as
//! its line is complete. [`read_table`] drives it from a live channel.
//!
//! ```text
//! SENDING -> ACCUMULATING <-> SCANNING -> RECORD_COMMITTED -> SCANNING
//!                                      \-> TERMINAL_OK | TERMINAL_FAIL
//!                                          | TIMEOUT_IMPLICIT_OK | BUFFER_OVERFLOW
//! ```

use crate::error::{Error, Result};
use crate::response::{Line, classify, parse_ints, strip_token};
use crate::transport::Transport;
use bytes::{Buf, BytesMut};
use std::time::Instant;
use tracing::{debug, trace, warn};

const READ_CHUNK: usize = 256;

/// A fixed-width table row parsed from the integers after the sync token.
pub trait Record: Sized {
    const FIELDS: usize;

    /// `None` when a value does not fit the record's field types.
    fn from_fields(fields: &[i64]) -> Option<Self>;
}

/// How a table stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The device sent its terminal `OK` line.
    Terminated,
    /// The device went silent for longer than the inactivity threshold.
    Inactivity,
}

/// A reassembled table. Read-only once returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table<R> {
    records: Vec<R>,
    capacity: usize,
    completion: Completion,
}

impl<R> Table<R> {
    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn completion(&self) -> Completion {
        self.completion
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }
}

/// Result of scanning the front of the accumulation buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan<R> {
    /// No complete line yet.
    NeedMore,
    /// A complete record line; `consumed` includes its newline.
    Record { record: R, consumed: usize },
    /// A complete line carrying the sync token but not a valid record.
    Malformed { consumed: usize },
    /// A terminal line.
    Terminal { ok: bool, reason: Option<String>, consumed: usize },
    /// A complete line that is neither a record nor terminal.
    Skip { consumed: usize },
}

/// Classify the first complete line of `buf`.
///
/// A record whose last field is still in flight has no newline yet and
/// therefore reports [`Scan::NeedMore`] instead of a truncated value.
pub fn scan_next<R: Record>(buf: &[u8], sync: &str) -> Scan<R> {
    let Some(newline) = buf.iter().position(|&b| b == b'\n') else {
        return Scan::NeedMore;
    };
    let consumed = newline + 1;
    let text = String::from_utf8_lossy(&buf[..newline]);
    let text = text.trim();

    match classify(text, None) {
        Line::Ok => {
            return Scan::Terminal {
                ok: true,
                reason: None,
                consumed,
            };
        }
        Line::Fail(reason) => {
            return Scan::Terminal {
                ok: false,
                reason,
                consumed,
            };
        }
        Line::Echo(_) | Line::Other(_) => {}
    }

    // the token may be preceded by line noise
    match text.find(sync).and_then(|at| strip_token(&text[at..], sync)) {
        Some(fields) => {
            let values = parse_ints(fields, R::FIELDS);
            match (values.len() == R::FIELDS).then(|| R::from_fields(&values)).flatten() {
                Some(record) => Scan::Record { record, consumed },
                None => Scan::Malformed { consumed },
            }
        }
        None => Scan::Skip { consumed },
    }
}

/// Outcome of feeding bytes to a [`TableAssembler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    NeedMore,
    Complete,
}

/// Incremental table parser, independent of any I/O source.
#[derive(Debug)]
pub struct TableAssembler<R> {
    sync: &'static str,
    buf: BytesMut,
    records: Vec<R>,
    capacity: usize,
    max_buffer: usize,
    done: bool,
}

impl<R: Record> TableAssembler<R> {
    pub fn new(sync: &'static str, capacity: usize, max_buffer: usize) -> Self {
        Self {
            sync,
            buf: BytesMut::new(),
            records: Vec::new(),
            capacity,
            max_buffer,
            done: false,
        }
    }

    /// Records committed so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bytes received but not consumed yet.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Consume `data`, committing every record it completes.
    ///
    /// The receive buffer cap bounds only the bytes not yet consumed, so
    /// the outcome does not depend on how the stream was split.
    pub fn feed(&mut self, mut data: &[u8]) -> Result<Progress> {
        loop {
            if self.done {
                return Ok(Progress::Complete);
            }
            let room = self.max_buffer.saturating_sub(self.buf.len());
            if room == 0 && !data.is_empty() {
                return Err(Error::OutOfMemory(format!(
                    "'{}' response exceeds the {} byte receive buffer",
                    self.sync, self.max_buffer
                )));
            }
            let (piece, rest) = data.split_at(room.min(data.len()));
            self.buf.extend_from_slice(piece);
            data = rest;

            let progress = self.scan()?;
            if progress == Progress::Complete || data.is_empty() {
                return Ok(progress);
            }
        }
    }

    fn scan(&mut self) -> Result<Progress> {
        loop {
            match scan_next::<R>(&self.buf, self.sync) {
                Scan::NeedMore => return Ok(Progress::NeedMore),
                Scan::Record { record, consumed } => {
                    if self.records.len() >= self.capacity {
                        return Err(Error::OutOfMemory(format!(
                            "'{}' table holds more than {} records",
                            self.sync, self.capacity
                        )));
                    }
                    self.records.push(record);
                    self.buf.advance(consumed);
                    trace!(count = self.records.len(), "record committed");
                }
                Scan::Malformed { consumed } => {
                    warn!(
                        line = %String::from_utf8_lossy(&self.buf[..consumed]).trim_end(),
                        "discarding malformed record"
                    );
                    self.buf.advance(consumed);
                }
                Scan::Skip { consumed } => {
                    debug!(line = %String::from_utf8_lossy(&self.buf[..consumed]).trim_end(), "rx");
                    self.buf.advance(consumed);
                }
                Scan::Terminal { ok, reason, consumed } => {
                    self.buf.advance(consumed);
                    self.done = true;
                    return if ok {
                        Ok(Progress::Complete)
                    } else {
                        Err(Error::from_device_reason(reason))
                    };
                }
            }
        }
    }

    /// Finish after an explicit terminal line.
    pub fn finish(self) -> Table<R> {
        self.into_table(Completion::Terminated)
    }

    /// Finish without a terminal line, keeping what was committed.
    pub fn finish_on_inactivity(self) -> Table<R> {
        self.into_table(Completion::Inactivity)
    }

    fn into_table(self, completion: Completion) -> Table<R> {
        Table {
            records: self.records,
            capacity: self.capacity,
            completion,
        }
    }
}

/// Send `request` and reassemble the streamed table.
///
/// Ends on the terminal line, on a failure line, or once the device has
/// been silent for the configured inactivity threshold. The latter is
/// accepted as a complete table because some firmware never sends the
/// terminal line after the last record.
pub fn read_table<R: Record>(
    transport: &mut Transport<'_>,
    request: &str,
    sync: &'static str,
    capacity: usize,
) -> Result<Table<R>> {
    let config = *transport.config();
    transport.send_line(request)?;

    let mut assembler = TableAssembler::<R>::new(sync, capacity, config.max_buffer);
    let mut chunk = [0u8; READ_CHUNK];
    let mut last_rx = Instant::now();
    loop {
        let n = transport.channel().receive(&mut chunk, config.poll_slice)?;
        if n > 0 {
            last_rx = Instant::now();
            if assembler.feed(&chunk[..n])? == Progress::Complete {
                debug!(sync, records = assembler.len(), "table complete");
                return Ok(assembler.finish());
            }
        } else if last_rx.elapsed() > config.inactivity_threshold {
            warn!(
                sync,
                records = assembler.len(),
                pending_bytes = assembler.buffered(),
                "device went silent without a terminal line, accepting table"
            );
            return Ok(assembler.finish_on_inactivity());
        }
    }
}
