//! Clap-derive CLI surface (§6, "stable"):
//!
//! ```text
//! main system start         [--cfg-path P] [--cfg STR]
//!                           [--makeready|--no-makeready]
//!                           [--distribute|--no-distribute]
//!                           [--cfg-addr-delim C]
//!                           [KEY VALUE]...
//! main system stop          [--cfg-path P]
//! main system pause         [--cfg-path P]
//! main system step          [--cfg-path P]
//! main host start-host CFG
//! main host stop-host CFG
//! main host pause-host CFG
//! main host step-host CFG
//! ```
//!
//! Every flag has an `XACT_`-prefixed environment-variable mirror (§6),
//! matching the teacher's own `clap` usage in `dozer-cli::cli::types`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::errors::CliError;

#[derive(Parser, Debug)]
#[command(name = "xact", author, version, about = "Xact distributed data-flow runtime", long_about = None)]
pub struct Cli {
    /// `None` when invoked with no subcommand (§6: `main` prints help,
    /// exits 0) — a required subcommand would instead make clap exit 2
    /// with a `MissingSubcommand` error on stderr.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Commands to control the system as a whole.
    System(SystemArgs),
    /// Commands to control a single process host.
    Host(HostArgs),
}

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct SystemArgs {
    #[command(subcommand)]
    pub command: SystemCommand,
}

#[derive(Subcommand, Debug)]
pub enum SystemCommand {
    /// Start the specified system.
    Start(SystemStartArgs),
    /// Stop the specified system.
    Stop(SystemPathArgs),
    /// Pause the specified system.
    Pause(SystemPathArgs),
    /// Single-step the specified system.
    Step(SystemPathArgs),
}

#[derive(Args, Debug)]
pub struct SystemPathArgs {
    #[arg(short = 'p', long = "cfg-path", env = "XACT_CFG_PATH")]
    pub cfg_path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SystemStartArgs {
    #[arg(short = 'p', long = "cfg-path", env = "XACT_CFG_PATH")]
    pub cfg_path: Option<PathBuf>,

    #[arg(short = 'c', long = "cfg", env = "XACT_CFG")]
    pub cfg: Option<String>,

    #[arg(long = "makeready", env = "XACT_MAKEREADY")]
    pub makeready: bool,
    #[arg(long = "no-makeready", conflicts_with = "makeready")]
    pub no_makeready: bool,

    #[arg(long = "distribute", env = "XACT_DISTRIBUTE")]
    pub distribute: bool,
    #[arg(long = "no-distribute", conflicts_with = "distribute")]
    pub no_distribute: bool,

    #[arg(short = 's', long = "cfg-addr-delim", env = "XACT_CFG_ADDR_DELIM", default_value = ".")]
    pub cfg_addr_delim: String,

    /// Alternating `KEY VALUE` override pairs.
    #[arg(env = "XACT_CFG_OVERRIDE")]
    pub cfg_override: Vec<String>,
}

impl SystemStartArgs {
    /// Default is `false` unless `--makeready` is given (original default).
    pub fn resolved_makeready(&self) -> bool {
        self.makeready && !self.no_makeready
    }

    /// Default is `true` unless `--no-distribute` is given (original default).
    pub fn resolved_distribute(&self) -> bool {
        !self.no_distribute
    }

    pub fn overrides(&self) -> Result<Vec<(String, String)>, CliError> {
        if self.cfg_override.len() % 2 != 0 {
            return Err(CliError::other(
                "cfg override arguments must be an even number of alternating KEY VALUE pairs",
            ));
        }
        Ok(self
            .cfg_override
            .chunks(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect())
    }
}

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct HostArgs {
    #[command(subcommand)]
    pub command: HostCommand,
}

#[derive(Subcommand, Debug)]
pub enum HostCommand {
    /// Start the specified process host.
    StartHost(HostCfgArgs),
    /// Stop the specified process host.
    StopHost(HostCfgArgs),
    /// Pause the specified process host.
    PauseHost(HostCfgArgs),
    /// Single-step the specified process host.
    StepHost(HostCfgArgs),
}

#[derive(Args, Debug)]
pub struct HostCfgArgs {
    /// The serialized, compressed, base64-encoded config mapping (§6).
    #[arg(env = "XACT_CFG")]
    pub cfg: String,
}
