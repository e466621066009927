use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use provideo_lib::channel::SerialChannel;
use provideo_lib::config::SerialConfig;
use provideo_lib::family::dpcc::{DpccMode, DpccPixel, DpccTestMode};
use provideo_lib::flashloader::{FlashEvent, FlashloaderArgs, run_flashloader};
use provideo_lib::reassembly::Completion;
use provideo_lib::{Connection, Instance, TransportConfig};
use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Control a provideo camera over its serial command interface.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Serial port the camera is attached to (e.g. /dev/ttyUSB0, COM3).
    #[arg(short, long, global = true)]
    port: Option<String>,
    #[arg(short, long, global = true, default_value_t = SerialConfig::DEFAULT_BAUD_RATE)]
    baud: u32,
    /// Response timeout of ordinary commands.
    #[arg(long, global = true, default_value_t = 200)]
    timeout_ms: u64,
    /// Silence after which a table dump without terminator is accepted.
    #[arg(long, global = true, default_value_t = 1000)]
    inactivity_ms: u64,
    /// Apply copyable settings to every user bank.
    #[arg(long, global = true)]
    copy: bool,
    /// Optional path to a file to write logs to, in addition to the console.
    #[arg(short, long, global = true)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports.
    Ports,
    /// Write a firmware image with the external flashloader.
    Flash {
        /// Flashloader executable.
        #[arg(long, default_value = "flashloader")]
        program: PathBuf,
        file: PathBuf,
        #[arg(long, default_value_t = 0)]
        sector: u32,
        #[arg(long, default_value_t = 0)]
        count: u32,
        #[arg(long)]
        verify: bool,
        /// Start the application afterwards.
        #[arg(long)]
        boot: bool,
    },
    #[command(flatten)]
    Device(DeviceCommand),
}

/// Commands that talk to the camera over the protocol.
#[derive(Subcommand, Debug)]
enum DeviceCommand {
    /// Show firmware version and runtime.
    Info,
    /// Persist, restore or reset the device settings.
    Settings {
        #[arg(value_enum)]
        action: SettingsAction,
    },
    Reboot,
    /// Defect pixel cluster correction.
    Dpcc {
        #[command(subcommand)]
        command: DpccCommand,
    },
    /// Recorder transport controls.
    Playback {
        #[command(subcommand)]
        command: PlaybackCommand,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SettingsAction {
    Save,
    Load,
    Reset,
}

#[derive(Subcommand, Debug)]
enum DpccCommand {
    /// Show every DPCC setting.
    Status,
    Enable {
        value: Option<bool>,
    },
    Mode {
        #[arg(value_enum)]
        value: Option<ModeArg>,
    },
    /// Detection level, 0 to 100.
    Level {
        value: Option<u8>,
    },
    TestMode {
        #[arg(value_enum)]
        value: Option<TestModeArg>,
    },
    /// Print the defect pixel table.
    Dump {
        #[arg(long)]
        json: bool,
    },
    /// Replace the defect pixel table with a JSON list of {"x", "y"} pixels.
    Write {
        file: PathBuf,
    },
    Add {
        x: u16,
        y: u16,
    },
    Clear,
    /// Persist the table in device flash.
    Save,
    /// Restore the table from device flash.
    Load,
    /// Let the device detect defect pixels itself.
    AutoLoad,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Fixed,
    Dynamic,
    Combined,
}

impl From<ModeArg> for DpccMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Fixed => DpccMode::Fixed,
            ModeArg::Dynamic => DpccMode::Dynamic,
            ModeArg::Combined => DpccMode::Combined,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TestModeArg {
    Off,
    MarkCorrected,
    MarkTable,
}

impl From<TestModeArg> for DpccTestMode {
    fn from(mode: TestModeArg) -> Self {
        match mode {
            TestModeArg::Off => DpccTestMode::Off,
            TestModeArg::MarkCorrected => DpccTestMode::MarkCorrected,
            TestModeArg::MarkTable => DpccTestMode::MarkTable,
        }
    }
}

#[derive(Subcommand, Debug)]
enum PlaybackCommand {
    Play,
    Pause,
    Stop,
    Record,
    /// Show the current position.
    Position,
    Seek { position: u32 },
    Forward { speed: u8 },
    Rewind { speed: u8 },
}

fn setup_logging(log_file_path: Option<&PathBuf>, verbosity: &Verbosity<InfoLevel>) -> Result<Option<WorkerGuard>> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let (file_layer, guard) = if let Some(path) = log_file_path {
        let log_file = File::create(path).with_context(|| format!("Failed to create log file at: {:?}", path))?;
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(log_file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false)
            .with_target(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    // INFO by default, DEBUG with -v, TRACE with -vv; RUST_LOG overrides
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_logging(cli.log_file.as_ref(), &cli.verbose)?;

    // the library blocks on the serial port, keep it off the runtime
    let work = tokio::task::spawn_blocking(move || run(cli));
    tokio::select! {
        result = work => {
            if let Err(e) = result.context("Command task failed")? {
                error!("{:#}", e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted");
            std::process::exit(130);
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Ports => {
            for port in SerialChannel::available_ports()? {
                println!("{port}");
            }
            Ok(())
        }
        Command::Flash {
            program,
            file,
            sector,
            count,
            verify,
            boot,
        } => {
            let port = cli.port.as_deref().context("--port is required")?;
            let mut args = FlashloaderArgs::new(port, file);
            args.baud_rate = cli.baud;
            args.start_sector = *sector;
            args.sector_count = *count;
            args.verify = *verify;
            args.boot = *boot;
            run_flashloader(program, &args, |event| match event {
                FlashEvent::Version(version) => info!("Flashloader {version}"),
                FlashEvent::Progress(percent) => info!("{percent}%"),
                FlashEvent::Error(e) => error!("{e}"),
                FlashEvent::Done => info!("Done"),
                FlashEvent::Other(line) => info!("{line}"),
            })?;
            Ok(())
        }
        Command::Device(command) => {
            let connection = connect(&cli)?;
            let instance = connection.open_instance("cli");
            instance.system().set_copy_flag(cli.copy)?;
            run_device(&instance, command)
        }
    }
}

fn connect(cli: &Cli) -> Result<Connection> {
    let port = cli.port.as_deref().context("--port is required")?;
    let serial = SerialConfig::new(port).with_baud_rate(cli.baud);
    let config = TransportConfig::default()
        .with_default_timeout(Duration::from_millis(cli.timeout_ms))
        .with_inactivity_threshold(Duration::from_millis(cli.inactivity_ms));
    Connection::open_serial(&serial, config).with_context(|| format!("Failed to open {port}"))
}

fn run_device(instance: &Instance, command: &DeviceCommand) -> Result<()> {
    match command {
        DeviceCommand::Info => {
            let system = instance.system();
            println!("Version: {}", system.get_version()?);
            println!("Runtime: {} s", system.get_runtime()?);
        }
        DeviceCommand::Settings { action } => match action {
            SettingsAction::Save => instance.system().save_settings()?,
            SettingsAction::Load => instance.system().load_settings()?,
            SettingsAction::Reset => instance.system().reset_settings()?,
        },
        DeviceCommand::Reboot => instance.system().reboot()?,
        DeviceCommand::Dpcc { command } => run_dpcc(instance, command)?,
        DeviceCommand::Playback { command } => run_playback(instance, command)?,
    }
    Ok(())
}

fn run_dpcc(instance: &Instance, command: &DpccCommand) -> Result<()> {
    let dpcc = instance.dpcc();
    match command {
        DpccCommand::Status => {
            println!("Enabled:   {}", dpcc.get_enable()?);
            println!("Mode:      {}", dpcc.get_mode()?);
            println!("Level:     {}", dpcc.get_level()?);
            println!("Test mode: {}", dpcc.get_test_mode()?);
        }
        DpccCommand::Enable { value: Some(value) } => dpcc.set_enable(*value)?,
        DpccCommand::Enable { value: None } => println!("{}", dpcc.get_enable()?),
        DpccCommand::Mode { value: Some(value) } => dpcc.set_mode((*value).into())?,
        DpccCommand::Mode { value: None } => println!("{}", dpcc.get_mode()?),
        DpccCommand::Level { value: Some(value) } => {
            if *value > 100 {
                bail!("Level must be between 0 and 100");
            }
            dpcc.set_level(*value)?
        }
        DpccCommand::Level { value: None } => println!("{}", dpcc.get_level()?),
        DpccCommand::TestMode { value: Some(value) } => dpcc.set_test_mode((*value).into())?,
        DpccCommand::TestMode { value: None } => println!("{}", dpcc.get_test_mode()?),
        DpccCommand::Dump { json } => {
            let table = dpcc.get_table()?;
            if table.completion() == Completion::Inactivity {
                warn!("Device did not terminate the table, it may be incomplete");
            }
            if *json {
                println!("{}", serde_json::to_string_pretty(table.records())?);
            } else {
                for pixel in table.records() {
                    println!("{:>5} {:>5}", pixel.x, pixel.y);
                }
                info!("{} of at most {} pixels", table.len(), table.capacity());
            }
        }
        DpccCommand::Write { file } => {
            let reader = File::open(file).with_context(|| format!("Failed to open {:?}", file))?;
            let pixels: Vec<DpccPixel> =
                serde_json::from_reader(reader).with_context(|| format!("Failed to parse {:?}", file))?;
            info!("Writing {} pixels", pixels.len());
            dpcc.set_pixels(&pixels)?;
        }
        DpccCommand::Add { x, y } => dpcc.add_pixel(*x, *y)?,
        DpccCommand::Clear => dpcc.clear_table()?,
        DpccCommand::Save => dpcc.save_table()?,
        DpccCommand::Load => dpcc.load_table()?,
        DpccCommand::AutoLoad => dpcc.auto_load_table()?,
    }
    Ok(())
}

fn run_playback(instance: &Instance, command: &PlaybackCommand) -> Result<()> {
    let playback = instance.playback();
    match command {
        PlaybackCommand::Play => playback.play()?,
        PlaybackCommand::Pause => playback.pause()?,
        PlaybackCommand::Stop => playback.stop()?,
        PlaybackCommand::Record => playback.record()?,
        PlaybackCommand::Position => println!("{}", playback.get_position()?),
        PlaybackCommand::Seek { position } => playback.seek(*position)?,
        PlaybackCommand::Forward { speed } => playback.forward(*speed)?,
        PlaybackCommand::Rewind { speed } => playback.rewind(*speed)?,
    }
    Ok(())
}
