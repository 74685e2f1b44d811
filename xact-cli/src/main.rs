//! `main` (§6): parses the CLI surface and dispatches to the orchestrator.
//! Exit code `0` on clean halt, `1` on config error or non-recoverable
//! failure, mirroring `dozer-cli`'s `main.rs` shape (`set_panic_hook`,
//! parse, dispatch, `process::exit`).

use clap::{CommandFactory, Parser};
use xact_cli::cli::{Cli, Command, HostCommand, SystemCommand};
use xact_cli::orchestrator::Orchestrator;
use xact_core::ModuleRegistry;

fn main() {
    let cli = Cli::parse();

    // Real deployments register compiled node-plugin factories here; that
    // registration mechanism is out of scope (§1, "module reference plus a
    // frozen argument record" — the factory itself is an external
    // collaborator). Script-defined nodes (`functionality.script`) need no
    // registry entry at all.
    let registry = ModuleRegistry::new();

    let Some(command) = cli.command else {
        // `main` with no subcommand (§6): print help, exit 0.
        let _ = Cli::command().print_help();
        println!();
        std::process::exit(0);
    };

    let exit_code = match command {
        Command::System(system) => match system.command {
            SystemCommand::Start(args) => Orchestrator::system_start(&args, registry),
            SystemCommand::Stop(args) => Orchestrator::system_stop(&args),
            SystemCommand::Pause(args) => Orchestrator::system_pause(&args),
            SystemCommand::Step(args) => Orchestrator::system_step(&args),
        },
        Command::Host(host) => match host.command {
            HostCommand::StartHost(args) => Orchestrator::host_start(&args.cfg, registry),
            HostCommand::StopHost(args) => Orchestrator::host_stop(&args.cfg),
            HostCommand::PauseHost(args) => Orchestrator::host_pause(&args.cfg),
            HostCommand::StepHost(args) => Orchestrator::host_step(&args.cfg),
        },
    };

    std::process::exit(exit_code);
}
