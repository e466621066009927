//! Response line classification and parameter extraction.

use bytes::{Buf, BytesMut};

/// Terminal line of a successful command.
pub const OK_TOKEN: &str = "OK";
/// Terminal line of a failed command, optionally followed by a reason.
pub const FAIL_TOKEN: &str = "FAIL";

const ERROR_PREFIXES: [&str; 2] = ["ERROR:", "error "];

/// What a single complete response line means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    /// Value line of the command identified by the sync token; holds the
    /// text following the token.
    Echo(&'a str),
    Ok,
    Fail(Option<String>),
    /// Anything else: status chatter, echoes of other commands, noise.
    Other(&'a str),
}

impl Line<'_> {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Line::Ok | Line::Fail(_))
    }
}

pub fn classify<'a>(line: &'a str, sync: Option<&str>) -> Line<'a> {
    let line = line.trim();
    if line == OK_TOKEN {
        return Line::Ok;
    }
    if let Some(rest) = line.strip_prefix(FAIL_TOKEN) {
        return Line::Fail(reason(rest));
    }
    for prefix in ERROR_PREFIXES {
        if let Some(rest) = line.strip_prefix(prefix) {
            return Line::Fail(reason(rest));
        }
    }
    if let Some(rest) = sync.and_then(|token| strip_token(line, token)) {
        return Line::Echo(rest);
    }
    Line::Other(line)
}

fn reason(rest: &str) -> Option<String> {
    let rest = rest.trim_start_matches([':', ' ', '\t']).trim();
    (!rest.is_empty()).then(|| rest.to_string())
}

/// `line` without its leading `token`, if the token is a whole word.
pub(crate) fn strip_token<'a>(line: &'a str, token: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(token)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_ascii_whitespace() => Some(rest.trim_start()),
        Some(_) => None,
    }
}

/// Parse up to `max` whitespace separated integers, stopping at the first
/// token that is not one. Decimal with optional sign, or `0x` hexadecimal.
pub fn parse_ints(text: &str, max: usize) -> Vec<i64> {
    text.split_ascii_whitespace()
        .take(max)
        .map_while(parse_int)
        .collect()
}

fn parse_int(token: &str) -> Option<i64> {
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };
    let value = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -value } else { value })
}

/// Accumulates raw channel bytes and hands out complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
}

impl LineBuffer {
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Next complete line without its `\n` / `\r\n` ending.
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let raw = self.buf.split_to(pos + 1);
        let text = String::from_utf8_lossy(&raw[..pos]);
        Some(text.trim_end_matches('\r').to_string())
    }

    /// Bytes not yet returned as a line.
    pub fn len(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
