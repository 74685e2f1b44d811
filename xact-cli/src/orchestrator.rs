//! Component G, the Orchestrator (§4.G; grounded on `xact.cli.command`'s
//! `start`/`stop`/`pause`/`step` commands and the host dispatch implied by
//! `xact.host.start`'s per-process `multiprocessing.Process` spawn, lifted
//! one level to per-host OS processes here).
//!
//! `start` stamps `id_run`/`ts_run`, then either runs the whole graph
//! in-process (`is_local`) or serializes one config per distinct host and
//! dispatches `host start-host <CFG>` to it, locally or over `ssh`.
//! `stop`/`pause`/`step` fan the matching `host *-host` command out to
//! every host the same way.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::SystemTime;

use xact_core::cfg::{self, load};
use xact_core::denormalize::denormalize;
use xact_core::{HostAgent, ModuleRegistry};
use xact_types::{Config, HostId, IpcType, Process};

use crate::cfg_token;
use crate::cli::{SystemPathArgs, SystemStartArgs};
use crate::errors::CliError;

pub struct Orchestrator;

impl Orchestrator {
    /// `main system start` (§4.G).
    pub fn system_start(args: &SystemStartArgs, registry: ModuleRegistry) -> i32 {
        match Self::prepare_for_start(args) {
            Ok(cfg) => Self::run_start(cfg, registry),
            Err(e) => {
                eprintln!("{e}");
                e.exit_code()
            }
        }
    }

    /// `main system stop` (§4.G: fan out `stop-host` to every host).
    pub fn system_stop(args: &SystemPathArgs) -> i32 {
        Self::fan_out(args, "stop-host")
    }

    /// `main system pause`.
    pub fn system_pause(args: &SystemPathArgs) -> i32 {
        Self::fan_out(args, "pause-host")
    }

    /// `main system step`.
    pub fn system_step(args: &SystemPathArgs) -> i32 {
        Self::fan_out(args, "step-host")
    }

    /// `main host start-host CFG`.
    pub fn host_start(token: &str, registry: ModuleRegistry) -> i32 {
        match Self::decode_for_host(token) {
            Ok((cfg, local_host)) => match HostAgent::start(cfg, local_host, registry) {
                Ok(code) => code,
                Err(e) => {
                    tracing::error!(error = %e, "host start failed");
                    eprintln!("{e}");
                    1
                }
            },
            Err(e) => {
                eprintln!("{e}");
                e.exit_code()
            }
        }
    }

    /// `main host stop-host CFG`.
    pub fn host_stop(token: &str) -> i32 {
        match cfg_token::decode(token) {
            Ok(cfg) => {
                HostAgent::stop(&cfg, Duration::from_secs(5));
                0
            }
            Err(e) => {
                eprintln!("{e}");
                e.exit_code()
            }
        }
    }

    /// `main host pause-host CFG`.
    pub fn host_pause(token: &str) -> i32 {
        match cfg_token::decode(token) {
            Ok(cfg) => {
                HostAgent::pause(&cfg);
                0
            }
            Err(e) => {
                eprintln!("{e}");
                e.exit_code()
            }
        }
    }

    /// `main host step-host CFG`.
    pub fn host_step(token: &str) -> i32 {
        match cfg_token::decode(token) {
            Ok(cfg) => {
                HostAgent::step(&cfg);
                0
            }
            Err(e) => {
                eprintln!("{e}");
                e.exit_code()
            }
        }
    }

    fn prepare_for_start(args: &SystemStartArgs) -> Result<Config, CliError> {
        let sources = load_sources(args.cfg_path.as_deref(), args.cfg.as_deref())?;
        let overrides = args.overrides()?;
        let mut cfg = cfg::prepare(sources, &overrides, &args.cfg_addr_delim)?;
        cfg.runtime.opt.do_make_ready = args.resolved_makeready();
        cfg.runtime.opt.is_distributed = args.resolved_distribute();
        Ok(cfg)
    }

    fn prepare_for_control(args: &SystemPathArgs) -> Result<Config, CliError> {
        let sources = load_sources(args.cfg_path.as_deref(), None)?;
        let cfg = cfg::prepare(sources, &[], ".")?;
        Ok(cfg)
    }

    /// `start(config)` (§4.G): stamp the per-run identity, then either run
    /// in-process (`is_local`) or fan out `start-host` to every host.
    fn run_start(mut cfg: Config, registry: ModuleRegistry) -> i32 {
        cfg.runtime.id.id_cfg = cfg.runtime.id.id_cfg.clone();
        stamp_run(&mut cfg);

        if cfg.runtime.opt.is_local {
            cfg = rewrite_as_local(cfg);
            let cfg = match denormalize(cfg) {
                Ok(cfg) => cfg,
                Err(e) => {
                    eprintln!("{e}");
                    return 1;
                }
            };
            return match HostAgent::start(cfg, HostId::new("localhost"), registry) {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("{e}");
                    1
                }
            };
        }

        let cfg = match denormalize(cfg) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                return 1;
            }
        };

        let mut exit_code = 0;
        for host_id in cfg.distinct_host_ids() {
            match dispatch_host(&cfg, &host_id, "start-host") {
                Ok(code) => {
                    if code != 0 && exit_code == 0 {
                        exit_code = code;
                    }
                }
                Err(e) => {
                    eprintln!("{e}");
                    exit_code = 1;
                }
            }
        }
        exit_code
    }

    fn fan_out(args: &SystemPathArgs, verb: &str) -> i32 {
        let cfg = match Self::prepare_for_control(args) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                return e.exit_code();
            }
        };
        let cfg = match denormalize(cfg) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                return 1;
            }
        };

        let mut exit_code = 0;
        for host_id in cfg.distinct_host_ids() {
            if let Err(e) = dispatch_host(&cfg, &host_id, verb) {
                eprintln!("{e}");
                exit_code = 1;
            }
        }
        exit_code
    }

    fn decode_for_host(token: &str) -> Result<(Config, HostId), CliError> {
        let cfg = cfg_token::decode(token)?;
        let local_host = cfg
            .runtime
            .id
            .id_host
            .clone()
            .ok_or_else(|| CliError::other("CFG token is missing runtime.id.id_host"))?;
        Ok((cfg, local_host))
    }
}

fn load_sources(cfg_path: Option<&Path>, cfg_str: Option<&str>) -> Result<Vec<Value>, CliError> {
    let mut sources = Vec::new();
    if let Some(path) = cfg_path {
        sources.push(load::load_dir(path)?);
    }
    if let Some(raw) = cfg_str {
        let parsed: Value =
            serde_yaml::from_str(raw).map_err(|e| CliError::other(format!("--cfg is not a valid config mapping: {e}")))?;
        sources.push(parsed);
    }
    Ok(sources)
}

/// Stamp `id_run` (8 hex chars) and `ts_run` (UTC, `YYYYMMDDhhmmss`) (§4.G).
/// `id_run` has no meaningful "random" source without pulling in a `rand`
/// dependency the rest of the workspace doesn't use; it is instead derived
/// from the wall-clock time and this process's pid, the same
/// content-hash-to-hex technique `xact_core::cfg::stable_id_cfg` already
/// uses for `id_cfg`.
fn stamp_run(cfg: &mut Config) {
    let now = Utc::now();
    cfg.runtime.id.ts_run = Some(now.format("%Y%m%d%H%M%S").to_string());

    let mut hasher = DefaultHasher::new();
    SystemTime::now().hash(&mut hasher);
    std::process::id().hash(&mut hasher);
    cfg.runtime.id.id_run = Some(format!("{:08x}", (hasher.finish() & 0xffff_ffff) as u32));
}

/// `is_local` rewrite (§4.G): collapse every node onto one synthetic
/// process on `localhost`. Denormalisation (run by the caller immediately
/// afterwards) then derives `ipc_type = intra_process` for every edge on
/// its own, since every node now shares one process.
fn rewrite_as_local(mut cfg: Config) -> Config {
    use indexmap::IndexMap;
    use xact_types::{Host, ProcessId};

    let host_id = HostId::new("localhost");
    let process_id = ProcessId::new("local");

    let mut hosts = IndexMap::new();
    hosts.insert(host_id.clone(), Host::localhost());
    cfg.host = hosts;

    let mut processes = IndexMap::new();
    processes.insert(process_id.clone(), Process { host: host_id });
    cfg.process = processes;

    for node in cfg.node.values_mut() {
        node.process = process_id.clone();
    }

    for edge in cfg.edge.iter_mut() {
        edge.ipc_type = IpcType::IntraProcess;
    }

    cfg
}

/// Dispatch `xact host <verb> <CFG>` for one host (§6, "Remote host
/// launch"): locally if the host's `hostname` is `localhost`/`127.0.0.1`,
/// otherwise over `ssh <run_account>@<hostname> "source <venv>/bin/activate
/// && xact host <verb> <cfg>"`. Any non-zero exit is a fatal orchestration
/// error.
fn dispatch_host(cfg: &Config, host_id: &HostId, verb: &str) -> Result<i32, CliError> {
    let host = cfg
        .host
        .get(host_id)
        .ok_or_else(|| CliError::other(format!("unknown host '{host_id}' in distinct_host_ids")))?;

    let mut host_cfg = cfg.clone();
    host_cfg.runtime.id.id_host = Some(host_id.clone());
    let token = cfg_token::encode(&host_cfg)?;

    let status = if host.hostname == "localhost" || host.hostname == "127.0.0.1" {
        let exe = std::env::current_exe().map_err(|e| CliError::DispatchFailed {
            host: host_id.clone(),
            reason: e.to_string(),
        })?;
        Command::new(exe).arg("host").arg(verb).arg(&token).status()
    } else {
        let venv = host.venv_path.as_deref().unwrap_or(".");
        let target = match &host.run_account {
            Some(acct) => format!("{acct}@{}", host.hostname),
            None => host.hostname.clone(),
        };
        let remote_cmd = format!("source {venv}/bin/activate && xact host {verb} {token}");
        Command::new("ssh").arg(target).arg(remote_cmd).status()
    };

    let status = status.map_err(|e| CliError::DispatchFailed {
        host: host_id.clone(),
        reason: e.to_string(),
    })?;

    if !status.success() {
        return Err(CliError::DispatchFailed {
            host: host_id.clone(),
            reason: format!("exited with {status}"),
        });
    }
    Ok(status.code().unwrap_or(0))
}
