use crate::ids::{DataTypeId, HostId, ProcessId, RequirementId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Root of configuration (§3). Just the system-wide identifier; everything
/// else hangs off `Config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct System {
    pub id_system: String,
}

/// `port_range` is `"LO-HI"` with `HI >= LO + max_edge_idx` (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub lo: u16,
    pub hi: u16,
}

impl FromStr for PortRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lo, hi) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid port_range '{s}': expected 'LO-HI'"))?;
        let lo: u16 = lo
            .trim()
            .parse()
            .map_err(|_| format!("invalid port_range '{s}': non-numeric lo"))?;
        let hi: u16 = hi
            .trim()
            .parse()
            .map_err(|_| format!("invalid port_range '{s}': non-numeric hi"))?;
        if hi < lo {
            return Err(format!("invalid port_range '{s}': hi < lo"));
        }
        Ok(PortRange { lo, hi })
    }
}

impl std::fmt::Display for PortRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.lo, self.hi)
    }
}

/// `{id, hostname, run_account, provision_account, port_range, venv_path,
/// log_dir, log_level}` plus the denormaliser-derived
/// `is_inter_host_edge_owner` flag (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub hostname: String,
    #[serde(default)]
    pub run_account: Option<String>,
    #[serde(default)]
    pub provision_account: Option<String>,
    #[serde(default)]
    pub port_range: Option<PortRange>,
    #[serde(default)]
    pub venv_path: Option<String>,
    #[serde(default)]
    pub log_dir: Option<String>,
    #[serde(default)]
    pub log_level: Option<String>,
    /// Denormaliser-derived (§4.B step 5). `false` until denormalisation runs.
    #[serde(default)]
    pub is_inter_host_edge_owner: bool,
}

impl Host {
    pub fn localhost() -> Self {
        Self {
            hostname: "localhost".to_string(),
            run_account: None,
            provision_account: None,
            port_range: None,
            venv_path: None,
            log_dir: None,
            log_level: None,
            is_inter_host_edge_owner: false,
        }
    }
}

/// `{id, host_id}` (§3). The unit of OS-level isolation and of scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    pub host: HostId,
}

/// Three equivalent encodings of a node's compute logic (§3, §4.D).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Functionality {
    /// A named importable module exporting `reset`+`step`, or a `coro`
    /// factory. In this Rust rendition, "module" names a compiled plugin
    /// registered by name (Design Notes: binary closure-pickles have no
    /// portable analogue; they map to "module reference plus a frozen
    /// argument record").
    Module { module: String },
    /// Source-text callables, evaluated by the embedded scripting
    /// sub-runtime (§9, "User-code transport").
    Script {
        #[serde(default)]
        reset_src: Option<String>,
        #[serde(default)]
        step_src: Option<String>,
        #[serde(default)]
        coro_src: Option<String>,
    },
}

impl Default for Functionality {
    fn default() -> Self {
        Functionality::Script {
            reset_src: None,
            step_src: None,
            coro_src: None,
        }
    }
}

/// `{id, process_id, state_type?, requirement_id?, functionality, config?}`
/// plus the denormaliser-derived `host_id` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub process: ProcessId,
    #[serde(default)]
    pub req_host_cfg: Option<RequirementId>,
    #[serde(default)]
    pub functionality: Functionality,
    #[serde(default)]
    pub state_type: Option<DataTypeId>,
    #[serde(default)]
    pub config: Option<serde_json::Value>,
    /// Denormaliser-derived (§4.B step 1): copied from the node's process
    /// for O(1) lookup.
    #[serde(default)]
    pub host: Option<HostId>,
}
