use clap::{Args, Parser, Subcommand, ValueEnum};

use gatekeep_model::QueueKind;

/// Gate station entry point
#[derive(Parser, Debug)]
#[command(name = "gatekeep-station")]
#[command(about = "Run a gate check-in / check-out station from the terminal")]
pub struct Cli {
    /// Roster API base url (overrides config)
    #[arg(long, global = true, env = "GATEKEEP_SERVER_URL")]
    pub server: Option<String>,

    /// Bearer token for the roster API (overrides config)
    #[arg(long, global = true, env = "GATEKEEP_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the gates of an event
    Gates { event: String },
    /// List the session areas of an event
    Areas { event: String },
    /// Create an event gate, or an area gate with --area
    CreateGate {
        event: String,
        #[arg(long)]
        area: Option<String>,
        #[arg(long)]
        agenda: Option<String>,
    },
    /// Delete a gate
    DeleteGate { gate: String },
    /// Run an interactive gate session (commands on stdin)
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    pub event: String,

    /// Session area for area gates; required for the check-out queue
    #[arg(long)]
    pub area: Option<String>,

    /// Queue to open on
    #[arg(long, value_enum, default_value_t = QueueArg::In)]
    pub queue: QueueArg,

    /// Use a synthetic in-memory roster instead of the server
    #[arg(long)]
    pub demo: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueueArg {
    In,
    Out,
}

impl From<QueueArg> for QueueKind {
    fn from(arg: QueueArg) -> Self {
        match arg {
            QueueArg::In => QueueKind::NeedsCheckIn,
            QueueArg::Out => QueueKind::NeedsCheckOut,
        }
    }
}
