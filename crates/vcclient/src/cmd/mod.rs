use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use vcclient_decode::OutputFormat as ReplyFormat;
use vcclient_session::{connect, ConnectionConfig, TransportConnection};
use vcclient_transport::ServerAddr;

use crate::exit::{client_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod events;
pub mod exec;
pub mod info;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one command and print the decoded reply.
    Exec(ExecArgs),
    /// Stream server events until interrupted.
    Events(EventsArgs),
    /// Decode a captured reply payload offline.
    Decode(DecodeArgs),
    /// Connect and print the negotiated session parameters.
    Info(InfoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Exec(args) => exec::run(args, format),
        Command::Events(args) => events::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Info(args) => info::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Server and credentials shared by every connecting subcommand.
#[derive(Args)]
pub struct ConnectArgs {
    /// Server address (ip:port).
    #[arg(long, short = 's', env = "VCCLIENT_SERVER")]
    pub server: String,
    /// Client version announced in the handshake.
    #[arg(long, env = "VCCLIENT_VERSION", default_value = "5.2.0.0.0.0")]
    pub client_version: String,
    /// Authentication token sent after the version is accepted. Required
    /// by every connecting subcommand.
    #[arg(long, env = "VCCLIENT_CREDENTIAL", hide_env_values = true, default_value = "")]
    pub credential: String,
    /// Connect timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "10s")]
    pub connect_timeout: String,
    /// Keep nested-brace replies even when the server supports JSON.
    #[arg(long)]
    pub legacy: bool,
}

impl std::fmt::Debug for ConnectArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectArgs")
            .field("server", &self.server)
            .field("client_version", &self.client_version)
            .field("credential", &format_args!("<redacted:{} bytes>", self.credential.len()))
            .field("connect_timeout", &self.connect_timeout)
            .field("legacy", &self.legacy)
            .finish()
    }
}

impl ConnectArgs {
    pub fn server_addr(&self) -> CliResult<ServerAddr> {
        self.server
            .parse()
            .map_err(|err| CliError::new(USAGE, format!("invalid --server: {err}")))
    }

    pub fn config(&self) -> CliResult<ConnectionConfig> {
        Ok(ConnectionConfig {
            connect_timeout: Some(parse_duration(&self.connect_timeout)?),
            negotiate_json: !self.legacy,
            ..ConnectionConfig::with_credential(self.credential.clone())
        })
    }

    pub fn open(&self) -> CliResult<Arc<TransportConnection>> {
        let addr = self.server_addr()?;
        let config = self.config()?;
        connect(&addr, &self.client_version, &config)
            .map_err(|err| client_error("connect failed", err))
    }
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Endpoint the command is addressed to. Default: the server itself.
    #[arg(long, short = 'e')]
    pub endpoint: Option<String>,
    /// Send as a generic command on a fresh socket, with retries.
    #[arg(long, conflicts_with = "endpoint")]
    pub generic: bool,
    /// Print the raw acknowledgement instead of decoding it.
    #[arg(long)]
    pub ack: bool,
    /// Command keyword and arguments.
    #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct EventsArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Only show events for this endpoint. Default: all endpoints.
    #[arg(long, short = 'e', default_value = vcclient_session::WILDCARD_ENDPOINT)]
    pub endpoint: String,
    /// Exit after receiving N events.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReplyFormatArg {
    Legacy,
    Json,
}

impl From<ReplyFormatArg> for ReplyFormat {
    fn from(arg: ReplyFormatArg) -> Self {
        match arg {
            ReplyFormatArg::Legacy => ReplyFormat::Legacy,
            ReplyFormatArg::Json => ReplyFormat::Json,
        }
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Command keyword the payload answers.
    pub command: String,
    /// Read the payload from a file. Default: stdin.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Reply format the payload was captured in.
    #[arg(long, value_enum, default_value = "legacy")]
    pub reply_format: ReplyFormatArg,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `5s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
