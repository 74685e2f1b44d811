//! CLI surface and orchestrator (component G) for the xact runtime (§4.G,
//! §6). Everything below `xact-cli` — config validation, denormalisation,
//! transport, the node runtime, the scheduler, the host agent — lives in
//! `xact-core`; this crate is only responsible for turning command-line
//! input into calls against that engine and fanning work out across hosts.

pub mod cfg_token;
pub mod cli;
pub mod errors;
pub mod orchestrator;

pub use cli::{Cli, Command, HostCommand, SystemCommand};
pub use errors::CliError;
pub use orchestrator::Orchestrator;
