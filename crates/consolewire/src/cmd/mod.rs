use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use consolewire_frame::{FrameConfig, Sentinel};
use consolewire_json::ExtractMode;
use consolewire_session::SessionConfig;
use consolewire_transport::{ConsoleAddr, DEFAULT_HOST, DEFAULT_PORT};

use crate::exit::{frame_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

mod driver;
pub mod feed;
pub mod run;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command script against a console.
    Run(RunArgs),
    /// Send payload files, each followed by a command script.
    Feed(FeedArgs),
    /// Start a stub console.
    Serve(ServeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Feed(args) => feed::run(args, format),
        Command::Serve(args) => serve::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where the console is and how to talk to it.
#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Console host.
    #[arg(long, env = "CONSOLEWIRE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,
    /// Console port.
    #[arg(long, env = "CONSOLEWIRE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Prompt that ends each reply. Default: "<port>: ".
    #[arg(long, env = "CONSOLEWIRE_SENTINEL")]
    pub sentinel: Option<String>,
    /// Give up on a reply after this long (e.g. 5s, 500ms). Default: wait forever.
    #[arg(long, env = "CONSOLEWIRE_READ_TIMEOUT")]
    pub read_timeout: Option<String>,
    /// Bound on establishing the connection (e.g. 5s, 500ms).
    #[arg(long)]
    pub connect_timeout: Option<String>,
    /// Warn when a reply takes longer than this (e.g. 2s).
    #[arg(long, value_name = "DURATION")]
    pub slow_reply: Option<String>,
    /// Locate JSON by bracket matching instead of first/last delimiter.
    #[arg(long)]
    pub balanced: bool,
}

impl ConnectArgs {
    pub fn addr(&self) -> ConsoleAddr {
        ConsoleAddr::new(self.host.clone(), self.port)
    }

    pub fn session_config(&self) -> CliResult<SessionConfig> {
        let sentinel = resolve_sentinel(self.sentinel.as_deref(), self.port)?;
        let read_timeout = self.read_timeout.as_deref().map(parse_duration).transpose()?;

        Ok(SessionConfig {
            sentinel,
            frame: FrameConfig {
                read_timeout,
                ..FrameConfig::default()
            },
            connect_timeout: self.connect_timeout.as_deref().map(parse_duration).transpose()?,
            slow_reply_threshold: self.slow_reply.as_deref().map(parse_duration).transpose()?,
            extract_mode: if self.balanced {
                ExtractMode::Balanced
            } else {
                ExtractMode::Heuristic
            },
            ..SessionConfig::default()
        })
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Command to send (repeatable). Replaces the built-in diagnostic script.
    #[arg(long = "command", short = 'c', value_name = "COMMAND", conflicts_with = "script")]
    pub commands: Vec<String>,
    /// Read commands from a file, one per line.
    #[arg(long, value_name = "FILE")]
    pub script: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct FeedArgs {
    /// Payload files, each sent flattened onto one line.
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Times to repeat the whole file list.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub rounds: u32,
    /// Command to send after each file (repeatable).
    #[arg(long = "command", short = 'c', value_name = "COMMAND")]
    pub commands: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind.
    #[arg(long, default_value = DEFAULT_HOST)]
    pub bind: String,
    /// Port to listen on. 0 picks a free port.
    #[arg(long, env = "CONSOLEWIRE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Prompt to print. Default: "<port>: ".
    #[arg(long, env = "CONSOLEWIRE_SENTINEL")]
    pub sentinel: Option<String>,
    /// Exit after the first client leaves.
    #[arg(long)]
    pub once: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn resolve_sentinel(explicit: Option<&str>, port: u16) -> CliResult<Sentinel> {
    match explicit {
        Some(text) => Sentinel::new(text.to_string()).map_err(|err| frame_error("--sentinel", err)),
        None => Ok(Sentinel::for_port(port)),
    }
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}
