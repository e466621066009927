//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#[allow(unused_imports)]
pub use provideo_lib::error::{Error, Result};
#[allow(unused_imports)]
pub use provideo_lib::scripted::{ScriptedChannel, SentLog};
#[allow(unused_imports)]
pub use provideo_lib::{Connection, Instance, TransportConfig};
#[allow(unused_imports)]
pub use std::time::{Duration, Instant};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Commands that take no value and just answer `OK`.
const ACTIONS: &[&str] = &[
    "dpc_clear",
    "dpc_save",
    "dpc_load",
    "dpc_auto_load",
    "save_settings",
    "load_settings",
    "reset_settings",
    "reboot",
    "play",
    "record",
    "pause",
    "stop",
];

/// Valid ranges of setters the simulated firmware checks.
const RANGES: &[(&str, i64, i64)] = &[
    ("dpc_level", 0, 100),
    ("dpc_mode", 0, 2),
    ("dpc_test_mode", 0, 2),
    ("ae_setpoint", 0, 255),
    ("play_fwd", 1, 16),
    ("play_rew", 1, 16),
];

/// Route library logs to the test harness; `RUST_LOG=debug` shows traffic.
#[allow(dead_code)]
pub fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Timing small enough to keep timeout and inactivity tests fast.
#[allow(dead_code)]
pub fn fast_config() -> TransportConfig {
    TransportConfig::default()
        .with_default_timeout(Duration::from_millis(100))
        .with_poll_slice(Duration::from_millis(5))
        .with_inactivity_threshold(Duration::from_millis(60))
}

/// Connection over a channel answering every command with `chunks` once.
#[allow(dead_code)]
pub fn replying<I, C>(chunks: I) -> (Connection, SentLog)
where
    I: IntoIterator<Item = C>,
    C: Into<Vec<u8>>,
{
    let channel = ScriptedChannel::replying(chunks);
    let sent = channel.sent_log();
    (Connection::new(channel, fast_config()), sent)
}

/// Byte stream of a DPCC table dump.
#[allow(dead_code)]
pub fn pixel_stream(pixels: &[(u16, u16)], terminated: bool) -> Vec<u8> {
    let mut stream: Vec<u8> = pixels
        .iter()
        .flat_map(|(x, y)| format!("dpc_add_px {x} {y}\n").into_bytes())
        .collect();
    if terminated {
        stream.extend_from_slice(b"OK\n");
    }
    stream
}

#[derive(Debug)]
pub struct DeviceState {
    pub values: HashMap<String, Vec<i64>>,
    pub pixels: Vec<(i64, i64)>,
    pub lut: HashMap<i64, Vec<(i64, i64)>>,
    /// Whether table dumps end with `OK`.
    pub terminate_tables: bool,
    pub version: String,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
            pixels: Vec::new(),
            lut: HashMap::new(),
            terminate_tables: true,
            version: "PV-SIM 1.2.3".to_string(),
        }
    }
}

/// In-memory provideo device answering like real firmware.
///
/// Setters store their arguments, getters echo them back, table dumps
/// stream the stored records.
#[derive(Debug, Clone, Default)]
pub struct SimulatedDevice(Arc<Mutex<DeviceState>>);

#[allow(dead_code)]
impl SimulatedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self) -> ScriptedChannel {
        let device = self.clone();
        ScriptedChannel::new(move |line| device.respond(line))
    }

    pub fn connection(&self) -> (Connection, SentLog) {
        let channel = self.channel();
        let sent = channel.sent_log();
        (Connection::new(channel, fast_config()), sent)
    }

    pub fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.0.lock().unwrap()
    }

    pub fn set(&self, name: &str, values: &[i64]) {
        self.state().values.insert(name.to_string(), values.to_vec());
    }

    pub fn respond(&self, line: &str) -> Vec<Vec<u8>> {
        let mut tokens = line.split_whitespace();
        let Some(name) = tokens.next() else {
            return Vec::new();
        };
        let Ok(args) = tokens.map(str::parse::<i64>).collect::<std::result::Result<Vec<_>, _>>() else {
            return vec![b"ERROR: invalid argument\n".to_vec()];
        };

        let mut state = self.state();
        let reply = match name {
            "version" => format!("version {}\nOK\n", state.version),
            "dpc_table" => {
                let mut reply: String = state.pixels.iter().map(|(x, y)| format!("dpc_add_px {x} {y}\n")).collect();
                if state.terminate_tables {
                    reply.push_str("OK\n");
                }
                reply
            }
            "dpc_add_px" => {
                state.pixels.push((args[0], args[1]));
                "OK\n".to_string()
            }
            "dpc_clear" => {
                state.pixels.clear();
                "OK\n".to_string()
            }
            "lut_read" => {
                let samples = state.lut.get(&args[0]).cloned().unwrap_or_default();
                let mut reply: String = samples.iter().map(|(x, y)| format!("lut_sample {x} {y}\n")).collect();
                reply.push_str("OK\n");
                reply
            }
            "lut_write" => {
                state.lut.entry(args[0]).or_default().push((args[1], args[2]));
                "OK\n".to_string()
            }
            "lut_reset" => {
                state.lut.remove(&args[0]);
                "OK\n".to_string()
            }
            "mcc_phase" if args.len() == 1 => match state.values.get(&format!("mcc_phase {}", args[0])) {
                Some(values) => format!("mcc_phase {} {} {}\nOK\n", args[0], values[0], values[1]),
                None => format!("mcc_phase {} 0 0\nOK\n", args[0]),
            },
            "mcc_phase" => {
                state
                    .values
                    .insert(format!("mcc_phase {}", args[0]), args[1..].to_vec());
                "OK\n".to_string()
            }
            _ if ACTIONS.contains(&name) => "OK\n".to_string(),
            _ if args.is_empty() => match state.values.get(name) {
                Some(values) => {
                    let values: Vec<String> = values.iter().map(i64::to_string).collect();
                    format!("{name} {}\nOK\n", values.join(" "))
                }
                None => "ERROR: unknown command\n".to_string(),
            },
            _ => match RANGES.iter().find(|(n, _, _)| *n == name) {
                Some((_, min, max)) if !(*min..=*max).contains(&args[0]) => "FAIL value out of range\n".to_string(),
                _ => {
                    state.values.insert(name.to_string(), args);
                    "OK\n".to_string()
                }
            },
        };
        vec![reply.into_bytes()]
    }
}
