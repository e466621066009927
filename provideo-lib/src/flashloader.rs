//! Wrapper around the external flashloader executable.
//!
//! Firmware images are written by a separate program that talks to the
//! device's boot loader itself. This module builds its command line and
//! scrapes its textual output for version, progress and error reports.

use crate::error::{Error, Result};
use regex::Regex;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::sync::mpsc;
use std::thread;
use thiserror::Error as ThisError;
use tracing::{debug, info, warn};

/// Command line options of one flashloader run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashloaderArgs {
    pub port: String,
    pub baud_rate: u32,
    pub start_sector: u32,
    pub sector_count: u32,
    pub file: PathBuf,
    /// Read back and compare after writing.
    pub verify: bool,
    /// Start the application once done.
    pub boot: bool,
    /// Read flash into `file` instead of writing it.
    pub reverse: bool,
}

impl FlashloaderArgs {
    pub fn new(port: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            port: port.into(),
            baud_rate: 115_200,
            start_sector: 0,
            sector_count: 0,
            file: file.into(),
            verify: false,
            boot: false,
            reverse: false,
        }
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--port".to_string(),
            self.port.clone(),
            "--baud".to_string(),
            self.baud_rate.to_string(),
            "--sector".to_string(),
            self.start_sector.to_string(),
            "--count".to_string(),
            self.sector_count.to_string(),
            "--file".to_string(),
            self.file.display().to_string(),
        ];
        if self.verify {
            args.push("--verify".to_string());
        }
        if self.boot {
            args.push("--boot".to_string());
        }
        if self.reverse {
            args.push("--reverse".to_string());
        }
        args
    }
}

/// Failure conditions the flashloader reports by name.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum FlashError {
    #[error("cannot open serial port")]
    PortOpen,
    #[error("cannot open image file")]
    FileOpen,
    #[error("no response from boot loader")]
    NoResponse,
    #[error("flash erase failed")]
    EraseFailed,
    #[error("verification failed")]
    VerifyFailed,
    #[error("boot loader timed out")]
    Timeout,
}

/// One interpreted line of flashloader output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlashEvent {
    Version(String),
    Progress(u8),
    Error(FlashError),
    Done,
    Other(String),
}

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^flashloader\s+v?(\d+\.\d+(?:\.\d+)?)").expect("valid regex"));
static PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{1,3})\s*%").expect("valid regex"));
static DONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(done|finished|success)\b").expect("valid regex"));
static ERROR_RES: LazyLock<Vec<(Regex, FlashError)>> = LazyLock::new(|| {
    [
        (r"(?i)(cannot|could not|unable to) open (serial )?port", FlashError::PortOpen),
        (r"(?i)((cannot|could not|unable to) open file|file not found)", FlashError::FileOpen),
        (r"(?i)no (response|answer) from (device|target|boot ?loader)", FlashError::NoResponse),
        (r"(?i)erase (failed|error)", FlashError::EraseFailed),
        (r"(?i)verif(y|ication) (failed|error|mismatch)", FlashError::VerifyFailed),
        (r"(?i)\btime(d)? ?out\b", FlashError::Timeout),
    ]
    .into_iter()
    .map(|(pattern, error)| (Regex::new(pattern).expect("valid regex"), error))
    .collect()
});

pub fn parse_line(line: &str) -> FlashEvent {
    let line = line.trim();
    if let Some(caps) = VERSION_RE.captures(line) {
        return FlashEvent::Version(caps[1].to_string());
    }
    if let Some((_, error)) = ERROR_RES.iter().find(|(re, _)| re.is_match(line)) {
        return FlashEvent::Error(error.clone());
    }
    if let Some(percent) = PROGRESS_RE
        .captures(line)
        .and_then(|caps| caps[1].parse::<u8>().ok())
        .filter(|p| *p <= 100)
    {
        return FlashEvent::Progress(percent);
    }
    if DONE_RE.is_match(line) {
        return FlashEvent::Done;
    }
    FlashEvent::Other(line.to_string())
}

/// Run the flashloader to completion, reporting every output line.
///
/// Fails on the first named error or on a non-zero exit status.
pub fn run_flashloader(program: &Path, args: &FlashloaderArgs, mut on_event: impl FnMut(&FlashEvent)) -> Result<()> {
    info!(program = %program.display(), "starting flashloader");
    let mut child = Command::new(program)
        .args(args.to_args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let (tx, rx) = mpsc::channel();
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(forward_lines(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(forward_lines(stderr, tx.clone()));
    }
    drop(tx);

    let mut first_error = None;
    for line in rx {
        let event = parse_line(&line);
        debug!(?event, "flashloader");
        if let FlashEvent::Error(error) = &event {
            first_error.get_or_insert_with(|| error.clone());
        }
        on_event(&event);
    }
    for reader in readers {
        if reader.join().is_err() {
            warn!("flashloader output reader panicked");
        }
    }

    let status = child.wait()?;
    if let Some(error) = first_error {
        return Err(Error::Device {
            reason: Some(error.to_string()),
        });
    }
    if !status.success() {
        return Err(Error::Device {
            reason: Some(format!("flashloader exited with {status}")),
        });
    }
    info!("flashloader finished");
    Ok(())
}

fn forward_lines(source: impl Read + Send + 'static, tx: mpsc::Sender<String>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for line in BufReader::new(source).lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    })
}
