use crate::edge::Edge;
use crate::ids::{DataTypeId, HostId, NodeId, ProcessId};
use crate::model::{Host, Node, Process, System};
use crate::buffer::DataTypeSpec;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// `{do_make_ready, is_distributed}` (§6). Mirrors the CLI's
/// `--makeready`/`--distribute` flags into the config so the orchestrator
/// doesn't need a separate argument bag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeOpt {
    #[serde(default)]
    pub do_make_ready: bool,
    #[serde(default = "default_true")]
    pub is_distributed: bool,
    #[serde(default)]
    pub is_local: bool,
}

fn default_true() -> bool {
    true
}

/// The per-run runtime block (§3, "Lifecycle"): `id_run`, `ts_run`, and the
/// role tags stamped by the orchestrator at `start` and threaded down to
/// each host/process/node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeId {
    #[serde(default)]
    pub id_system: Option<String>,
    #[serde(default)]
    pub id_cfg: Option<String>,
    #[serde(default)]
    pub id_host: Option<HostId>,
    #[serde(default)]
    pub id_process: Option<ProcessId>,
    #[serde(default)]
    pub id_node: Option<NodeId>,
    #[serde(default)]
    pub id_run: Option<String>,
    #[serde(default)]
    pub ts_run: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Runtime {
    #[serde(default)]
    pub opt: RuntimeOpt,
    #[serde(default)]
    pub id: RuntimeId,
    #[serde(default)]
    pub state: Option<String>,
}

/// Transport implementation selector per IPC class (§4.B, second pass):
/// `intra_process`, `inter_process`, `inter_host_server`,
/// `inter_host_client` -> transport id. Defaults are supplied if absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSelectorTable {
    #[serde(default = "default_intra_process_transport")]
    pub intra_process: String,
    #[serde(default = "default_inter_process_transport")]
    pub inter_process: String,
    #[serde(default = "default_inter_host_server_transport")]
    pub inter_host_server: String,
    #[serde(default = "default_inter_host_client_transport")]
    pub inter_host_client: String,
}

fn default_intra_process_transport() -> String {
    "aliased_buffer".to_string()
}
fn default_inter_process_transport() -> String {
    "bounded_fifo".to_string()
}
fn default_inter_host_server_transport() -> String {
    "tcp_pub".to_string()
}
fn default_inter_host_client_transport() -> String {
    "tcp_sub".to_string()
}

impl Default for QueueSelectorTable {
    fn default() -> Self {
        Self {
            intra_process: default_intra_process_transport(),
            inter_process: default_inter_process_transport(),
            inter_host_server: default_inter_host_server_transport(),
            inter_host_client: default_inter_host_client_transport(),
        }
    }
}

/// A named requirement (provisioning hint); carried opaquely, consumed
/// only by the (out-of-scope) provisioning side-effect. We still validate
/// that every `role` it references exists (§3 invariants).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequirementSpec {
    #[serde(default)]
    pub role: Vec<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

/// The root config mapping (§6's normalized schema). `IndexMap` preserves
/// declaration order so that iteration over `node`/`edge`/`host` is
/// deterministic without an extra sort at every call site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub system: System,
    #[serde(default)]
    pub host: IndexMap<HostId, Host>,
    #[serde(default)]
    pub process: IndexMap<ProcessId, Process>,
    #[serde(default)]
    pub node: IndexMap<NodeId, Node>,
    #[serde(default)]
    pub edge: Vec<Edge>,
    #[serde(default)]
    pub data: IndexMap<DataTypeId, DataTypeSpec>,
    #[serde(default)]
    pub req_host_cfg: IndexMap<String, RequirementSpec>,
    #[serde(default)]
    pub role: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    pub queue: QueueSelectorTable,
    #[serde(default)]
    pub runtime: Runtime,
}

impl Config {
    pub fn skeleton(id_system: impl Into<String>) -> Self {
        Self {
            system: System {
                id_system: id_system.into(),
            },
            host: IndexMap::new(),
            process: IndexMap::new(),
            node: IndexMap::new(),
            edge: Vec::new(),
            data: IndexMap::new(),
            req_host_cfg: IndexMap::new(),
            role: IndexMap::new(),
            queue: QueueSelectorTable::default(),
            runtime: Runtime::default(),
        }
    }

    /// Every distinct host id referenced by `process` (§4.G: "for each
    /// distinct host id"), in sorted order for deterministic fan-out.
    pub fn distinct_host_ids(&self) -> Vec<HostId> {
        let mut ids: Vec<HostId> = self
            .process
            .values()
            .map(|p| p.host.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        ids.sort();
        ids
    }

    pub fn processes_on_host<'a>(&'a self, host: &'a HostId) -> impl Iterator<Item = &'a ProcessId> + 'a {
        self.process
            .iter()
            .filter(move |(_, p)| &p.host == host)
            .map(|(id, _)| id)
    }

    pub fn nodes_in_process<'a>(&'a self, process: &'a ProcessId) -> impl Iterator<Item = (&'a NodeId, &'a Node)> + 'a {
        self.node.iter().filter(move |(_, n)| &n.process == process)
    }
}
