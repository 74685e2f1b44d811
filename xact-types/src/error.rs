use crate::ids::{DataTypeId, EdgeId, HostId, NodeId, ProcessId, RequirementId};
use thiserror::Error;

/// Any violation of schema or referential consistency in a config.
///
/// `prepare` (§4.A) surfaces this to the CLI with its descriptive message
/// and no stack trace; the process exits 1.
#[derive(Error, Debug)]
pub enum CfgError {
    #[error("failed to parse config source: {0}")]
    Parse(String),

    #[error("failed to merge config override at '{address}': {reason}")]
    Override { address: String, reason: String },

    #[error("unknown host id in cfg: {0}")]
    UnknownHost(HostId),

    #[error("unknown process id in cfg: {0}")]
    UnknownProcess(ProcessId),

    #[error("unknown node id in cfg: {0}")]
    UnknownNode(NodeId),

    #[error("unknown data type id in cfg: {0}")]
    UnknownDataType(DataTypeId),

    #[error("unknown req_host_cfg id in cfg: {0}")]
    UnknownReqHostCfg(RequirementId),

    #[error("unknown role id in cfg: {0}")]
    UnknownRole(String),

    #[error("edge path '{0}' must reference a node.outputs.port or node.inputs.port triple")]
    MalformedEdgePath(String),

    #[error("edge source '{0}' must reference an 'outputs' port")]
    EdgeSourceNotOutput(String),

    #[error("edge destination '{0}' must reference an 'inputs' port")]
    EdgeDestNotInput(String),

    #[error("repeated edge source: {0}")]
    RepeatedEdgeSource(String),

    #[error("repeated edge destination: {0}")]
    RepeatedEdgeDest(String),

    #[error("process '{process}' is assigned to more than one host ('{first_host}' and '{second_host}')")]
    ProcessOnMultipleHosts {
        process: ProcessId,
        first_host: HostId,
        second_host: HostId,
    },

    #[error("cannot use one process id on two different hosts (node '{node}' via edge '{edge}')")]
    SplitProcessAcrossHosts { node: NodeId, edge: EdgeId },

    #[error("feedforward edges within process '{0}' form a cycle")]
    IntraProcessCycle(ProcessId),

    #[error("inter-host edge index {idx} for host '{host}' exceeds port_range.hi ({hi}); lo={lo}")]
    PortRangeExhausted {
        host: HostId,
        idx: u32,
        lo: u16,
        hi: u16,
    },

    #[error("invalid port_range '{0}': expected 'LO-HI' with HI >= LO")]
    InvalidPortRange(String),

    #[error("data type '{0}' has a gap that can never be resolved (cycle or undefined reference)")]
    UnresolvableDataType(DataTypeId),

    #[error("{0}")]
    Other(String),
}

impl CfgError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
