use thiserror::Error;
use xact_types::{CfgError, HostId, NodeId, PortRange};

/// Runtime failure taxonomy for everything downstream of a validated,
/// denormalised config (§7). `CfgError` (re-exported) covers everything
/// upstream of that point.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error(transparent)]
    Cfg(#[from] CfgError),

    #[error("node '{0}' not found in local process")]
    UnknownNode(NodeId),

    #[error("edge '{0}' has no registered transport endpoint")]
    MissingTransport(String),

    #[error("transport for edge '{0}' is bounded and full")]
    QueueFull(String),

    #[error("channel disconnected for edge '{0}'")]
    ChannelDisconnected(String),

    #[error("failed to bind inter-host server socket on {host}:{port}: {source}")]
    BindFailed {
        host: HostId,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect inter-host client socket to {host}:{port}: {source}")]
    ConnectFailed {
        host: HostId,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("inter-host transport disconnected for edge '{0}'")]
    TransportDisconnected(String),

    #[error("port_range exhausted for host '{host}': edge_idx {idx} exceeds {range}")]
    PortRangeExhausted {
        host: HostId,
        idx: u32,
        range: PortRange,
    },

    #[error("failed to load functionality for node '{node}': {reason}")]
    FunctionalityLoadFailed { node: NodeId, reason: String },

    #[error("step function for node '{node}' raised: {source}")]
    StepFailed {
        node: NodeId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to spawn child process for process '{0}': {1}")]
    CannotSpawnProcess(String, #[source] std::io::Error),

    #[error("child process '{0}' exited with non-zero status")]
    ChildProcessFailed(String),

    #[error("internal thread panicked in process '{0}'")]
    InternalThreadPanic(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

impl ExecutionError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

impl<T> From<crossbeam_channel::SendError<T>> for ExecutionError {
    fn from(_: crossbeam_channel::SendError<T>) -> Self {
        ExecutionError::Other("cannot send to channel".to_string())
    }
}

impl From<crossbeam_channel::RecvError> for ExecutionError {
    fn from(_: crossbeam_channel::RecvError) -> Self {
        ExecutionError::Other("cannot receive from channel".to_string())
    }
}
