use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};
use mpegaudio::process::properties::ReadStyle;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ")\nmpegaudio ",
    env!("MPEGAUDIO_VERSION"),
    "\nbuilt ",
    env!("BUILD_TIMESTAMP"),
);

#[derive(Debug, ClapParser)]
#[command(
    name         = env!("CARGO_PKG_NAME"),
    version      = env!("CARGO_PKG_VERSION"),
    long_version = LONG_VERSION,
    author       = env!("CARGO_PKG_AUTHORS"),
    about        = "Tools for inspecting MPEG audio streams",
    long_about   = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (fail on first warning).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print audio properties of MPEG audio files
    Info(InfoArgs),
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input MPEG audio files (use "-" for stdin).
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// How thoroughly the stream is checked.
    #[arg(long, value_enum, default_value_t = ReadStyleArg::Average)]
    pub read_style: ReadStyleArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum OutputFormat {
    /// Aligned human-readable text.
    Text,
    /// One YAML document per input.
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum ReadStyleArg {
    /// Header summaries only.
    Fast,
    /// Header summaries only (default).
    Average,
    /// Also verify the CRC of a protected first frame.
    Accurate,
}

impl From<ReadStyleArg> for ReadStyle {
    fn from(value: ReadStyleArg) -> Self {
        match value {
            ReadStyleArg::Fast => ReadStyle::Fast,
            ReadStyleArg::Average => ReadStyle::Average,
            ReadStyleArg::Accurate => ReadStyle::Accurate,
        }
    }
}
