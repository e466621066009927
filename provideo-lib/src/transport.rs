//! Single request / single response exchanges.
//!
//! A request is one command line. The response is read until a terminal
//! `OK` or failure line shows up, or the timeout expires. Queries pick the
//! value line prefixed with the command name out of the response and parse
//! its integer parameters.

use crate::channel::Channel;
use crate::command::Command;
use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::response::{Line, LineBuffer, classify, parse_ints};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

const READ_CHUNK: usize = 256;

/// Borrowed view of a channel for the duration of one operation.
pub struct Transport<'a> {
    channel: &'a mut dyn Channel,
    config: TransportConfig,
}

impl<'a> Transport<'a> {
    pub fn new(channel: &'a mut dyn Channel, config: TransportConfig) -> Self {
        Self { channel, config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub(crate) fn channel(&mut self) -> &mut dyn Channel {
        &mut *self.channel
    }

    /// Write one command line, discarding stale input first if configured.
    pub fn send_line(&mut self, line: &str) -> Result<()> {
        if self.config.flush_before_send {
            self.channel.flush()?;
        }
        debug!(line = line.trim_end(), "tx");
        self.channel.send(line.as_bytes())
    }

    /// Run a setter or action with the default timeout.
    pub fn execute(&mut self, cmd: &Command, args: &[i64], copy: bool) -> Result<()> {
        let timeout = self.config.default_timeout;
        self.execute_with_timeout(cmd, args, copy, timeout)
    }

    /// Run a setter or action that is known to take longer than usual.
    pub fn execute_with_timeout(&mut self, cmd: &Command, args: &[i64], copy: bool, timeout: Duration) -> Result<()> {
        let line = cmd.format(args, copy);
        self.transact(&line, None, timeout).map(|_| ())
    }

    /// Run a setter whose argument is free text.
    pub fn execute_text(&mut self, cmd: &Command, text: &str) -> Result<()> {
        if text.contains(['\n', '\r']) {
            return Err(Error::InvalidArgument(format!("{} argument must be a single line", cmd.name)));
        }
        let timeout = self.config.default_timeout;
        self.transact(&cmd.format_text(text), None, timeout).map(|_| ())
    }

    /// Query and return however many parameters the value line carried.
    ///
    /// The result may hold fewer than `cmd.params` values; [`Self::query`]
    /// is the checked variant.
    pub fn query_raw(&mut self, cmd: &Command, args: &[i64], timeout: Duration) -> Result<Vec<i64>> {
        let line = cmd.format(args, false);
        let echo = self.transact(&line, Some(cmd.name), timeout)?;
        Ok(echo.map(|text| parse_ints(&text, cmd.params)).unwrap_or_default())
    }

    /// Query exactly `N` parameters.
    ///
    /// A short value line is a protocol error and nothing is returned.
    pub fn query<const N: usize>(&mut self, cmd: &Command, args: &[i64]) -> Result<[i64; N]> {
        debug_assert_eq!(cmd.params, N, "descriptor of '{}' disagrees with caller", cmd.name);
        let timeout = self.config.default_timeout;
        let values = self.query_raw(cmd, args, timeout)?;
        let actual = values.len();
        <[i64; N]>::try_from(values).map_err(|_| Error::ParamCount {
            command: cmd.name,
            expected: N,
            actual,
        })
    }

    /// Query a command whose value line is free text.
    pub fn query_text(&mut self, cmd: &Command) -> Result<String> {
        let timeout = self.config.default_timeout;
        let line = cmd.format(&[], false);
        self.transact(&line, Some(cmd.name), timeout)?
            .ok_or(Error::ParamCount {
                command: cmd.name,
                expected: 1,
                actual: 0,
            })
    }

    /// Send `line` and read until a terminal line.
    ///
    /// Returns the text of the last value line matching `sync`, if any.
    fn transact(&mut self, line: &str, sync: Option<&str>, timeout: Duration) -> Result<Option<String>> {
        self.send_line(line)?;

        let deadline = Instant::now() + timeout;
        let mut lines = LineBuffer::default();
        let mut echo = None;
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(command = line.trim_end(), ?timeout, "response timed out");
                return Err(Error::Timeout(timeout));
            }
            let n = self.channel.receive(&mut chunk, remaining)?;
            if n == 0 {
                continue;
            }
            trace!(bytes = n, "rx chunk");
            lines.extend(&chunk[..n]);

            while let Some(text) = lines.next_line() {
                debug!(line = %text, "rx");
                match classify(&text, sync) {
                    Line::Echo(rest) => echo = Some(rest.to_string()),
                    Line::Ok => return Ok(echo),
                    Line::Fail(reason) => return Err(Error::from_device_reason(reason)),
                    Line::Other(_) => {}
                }
            }
        }
    }
}

/// Narrow a parsed parameter to the type the caller expects.
pub(crate) fn narrow<T: TryFrom<i64>>(cmd: &Command, value: i64) -> Result<T> {
    T::try_from(value).map_err(|_| Error::Protocol(format!("value {value} of '{}' is out of range", cmd.name)))
}

pub(crate) fn flag(cmd: &Command, value: i64) -> Result<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(Error::Protocol(format!("'{}' returned {other}, expected 0 or 1", cmd.name))),
    }
}
