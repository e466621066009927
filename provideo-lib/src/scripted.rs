//! In-memory [`Channel`] driven by a responder closure.
//!
//! Every complete command line written to the channel is passed to the
//! responder, which returns the chunks the "device" answers with. Chunks are
//! handed out one per [`Channel::receive`] call, so tests control exactly how
//! a response is fragmented, and [`ScriptedChannel::delayed`] how long the
//! device takes to start answering.

use crate::channel::Channel;
use crate::error::Result;
use bytes::{Buf, Bytes};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

type Responder = Box<dyn FnMut(&str) -> Vec<Vec<u8>> + Send>;

/// Command lines written to a [`ScriptedChannel`], newest last.
#[derive(Debug, Clone, Default)]
pub struct SentLog(Arc<Mutex<Vec<String>>>);

impl SentLog {
    pub fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn push(&self, line: String) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(line);
    }
}

pub struct ScriptedChannel {
    responder: Responder,
    pending: VecDeque<Bytes>,
    fragment: Option<usize>,
    partial: Vec<u8>,
    sent: SentLog,
    delay: Duration,
    ready_at: Option<Instant>,
}

impl ScriptedChannel {
    pub fn new(responder: impl FnMut(&str) -> Vec<Vec<u8>> + Send + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            pending: VecDeque::new(),
            fragment: None,
            partial: Vec::new(),
            sent: SentLog::default(),
            delay: Duration::ZERO,
            ready_at: None,
        }
    }

    /// Answer the first command with `chunks` and stay silent afterwards.
    pub fn replying<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        let mut once = Some(chunks.into_iter().map(Into::into).collect::<Vec<_>>());
        Self::new(move |_| once.take().unwrap_or_default())
    }

    /// Never answer.
    pub fn silent() -> Self {
        Self::new(|_| Vec::new())
    }

    /// Re-split every response chunk into pieces of at most `size` bytes.
    pub fn fragmented(mut self, size: usize) -> Self {
        self.fragment = Some(size.max(1));
        self
    }

    /// Hold back every response until `delay` after its command was sent.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn sent_log(&self) -> SentLog {
        self.sent.clone()
    }

    fn enqueue(&mut self, chunk: Vec<u8>) {
        let mut chunk = Bytes::from(chunk);
        match self.fragment {
            Some(size) => {
                while chunk.has_remaining() {
                    let take = size.min(chunk.len());
                    self.pending.push_back(chunk.split_to(take));
                }
            }
            None if chunk.is_empty() => {}
            None => self.pending.push_back(chunk),
        }
    }
}

impl Channel for ScriptedChannel {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.partial.extend_from_slice(data);
        while let Some(pos) = self.partial.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.partial.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..pos]).trim_end_matches('\r').to_string();
            let chunks = (self.responder)(&line);
            self.sent.push(line);
            self.ready_at = Some(Instant::now() + self.delay);
            for chunk in chunks {
                self.enqueue(chunk);
            }
        }
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if let Some(ready_at) = self.ready_at {
            let wait = ready_at.saturating_duration_since(Instant::now());
            if wait > timeout {
                std::thread::sleep(timeout);
                return Ok(0);
            }
            std::thread::sleep(wait);
        }
        let Some(front) = self.pending.front_mut() else {
            std::thread::sleep(timeout);
            return Ok(0);
        };
        let n = buf.len().min(front.len());
        buf[..n].copy_from_slice(&front[..n]);
        front.advance(n);
        if front.is_empty() {
            self.pending.pop_front();
        }
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        self.pending.clear();
        Ok(())
    }
}
