//! Builds the per-host queue map (§4.C, §4.F): groups every edge
//! touching `local_host` into one of the four classes and constructs the
//! matching endpoint(s).

use super::{InterHostClient, InterHostServer, InterProcessQueue, IntraProcessSlot};
use crate::allocator::BufferAllocator;
use crate::errors::ExecutionError;
use std::collections::HashMap;
use xact_types::{Config, EdgeId, HostId, IpcType};

/// Both aliased handles of one intra-process edge: the producer writes
/// through `producer`, the consumer reads through `consumer` — they share
/// the same underlying buffer.
pub struct IntraEndpoints {
    pub producer: IntraProcessSlot,
    pub consumer: IntraProcessSlot,
}

/// Both channel halves of one inter-process edge.
pub struct InterProcessEndpoints {
    pub producer: InterProcessQueue,
    pub consumer: InterProcessQueue,
}

/// Enough to bind the owner-side socket for one inter-host edge, lazily —
/// accepting a connection blocks, so the host agent binds only once it is
/// ready to hand the resulting endpoint to its child process.
pub struct InterHostServerSpec {
    pub port: u16,
    pub src_host: HostId,
}

impl InterHostServerSpec {
    pub fn bind(&self, local_host: &HostId) -> Result<InterHostServer, ExecutionError> {
        InterHostServer::bind(("0.0.0.0", self.port), self.port, local_host, &self.src_host)
    }
}

/// Enough to connect the non-owner-side socket for one inter-host edge.
pub struct InterHostClientSpec {
    pub owner_hostname: String,
    pub port: u16,
    pub src_host: HostId,
}

impl InterHostClientSpec {
    pub fn connect(&self, local_host: &HostId) -> Result<InterHostClient, ExecutionError> {
        InterHostClient::connect((self.owner_hostname.as_str(), self.port), self.port, local_host, &self.src_host)
    }
}

/// The full set of transport endpoints a host agent needs to wire up
/// before spawning its local processes.
#[derive(Default)]
pub struct HostQueueMap {
    pub intra: HashMap<EdgeId, IntraEndpoints>,
    pub inter_process: HashMap<EdgeId, InterProcessEndpoints>,
    pub inter_host_server: HashMap<EdgeId, InterHostServerSpec>,
    pub inter_host_client: HashMap<EdgeId, InterHostClientSpec>,
}

pub struct TransportFactory;

impl TransportFactory {
    /// Build the queue map for every edge that touches `local_host`,
    /// classifying each edge per the §4.C table.
    pub fn build(cfg: &Config, local_host: &HostId, allocator: &BufferAllocator) -> Result<HostQueueMap, ExecutionError> {
        let mut map = HostQueueMap::default();

        for edge in &cfg.edge {
            match edge.ipc_type {
                IpcType::IntraProcess => {
                    if edge.src_host_id != *local_host {
                        continue;
                    }
                    let buffer = allocator.allocate(&edge.data)?;
                    let producer = IntraProcessSlot::new(buffer);
                    let consumer = producer.alias();
                    map.intra.insert(edge.id_edge.clone(), IntraEndpoints { producer, consumer });
                }
                IpcType::InterProcess => {
                    if edge.src_host_id != *local_host {
                        continue;
                    }
                    let (producer, consumer) = InterProcessQueue::pair(None);
                    map.inter_process
                        .insert(edge.id_edge.clone(), InterProcessEndpoints { producer, consumer });
                }
                IpcType::InterHost => {
                    let Some(edge_idx) = edge.edge_idx else {
                        return Err(ExecutionError::other(format!(
                            "inter-host edge '{}' is missing its edge_idx; did denormalize() run?",
                            edge.id_edge
                        )));
                    };
                    let owner_host = cfg
                        .host
                        .get(&edge.owner_host_id)
                        .ok_or_else(|| ExecutionError::Cfg(xact_types::CfgError::UnknownHost(edge.owner_host_id.clone())))?;
                    let port_lo = owner_host
                        .port_range
                        .ok_or_else(|| ExecutionError::other(format!("host '{}' has no port_range", edge.owner_host_id)))?
                        .lo;
                    let port = port_lo + edge_idx as u16;

                    if edge.owner_host_id == *local_host {
                        map.inter_host_server.insert(
                            edge.id_edge.clone(),
                            InterHostServerSpec {
                                port,
                                src_host: edge.src_host_id.clone(),
                            },
                        );
                    } else if edge.src_host_id == *local_host || edge.dst_host_id == *local_host {
                        map.inter_host_client.insert(
                            edge.id_edge.clone(),
                            InterHostClientSpec {
                                owner_hostname: owner_host.hostname.clone(),
                                port,
                                src_host: edge.src_host_id.clone(),
                            },
                        );
                    }
                }
            }
        }

        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::builder::ConfigBuilder;
    use crate::denormalize::denormalize;
    use xact_types::{DataTypeId, DataTypeSpec, Direction, EdgeDecl, Functionality, Node, NodeId, ProcessId};

    fn node(process: &str) -> Node {
        Node {
            process: ProcessId::new(process),
            req_host_cfg: None,
            functionality: Functionality::default(),
            state_type: None,
            config: None,
            host: None,
        }
    }

    #[test]
    fn classifies_an_intra_process_edge() {
        let cfg = ConfigBuilder::new("sys")
            .add_data(DataTypeId::new("counter"), DataTypeSpec::Alias("int64".into()))
            .unwrap()
            .add_pipeline(
                HostId::new("h1"),
                ProcessId::new("p1"),
                vec![(NodeId::new("a"), node("p1")), (NodeId::new("b"), node("p1"))],
                vec![EdgeDecl {
                    owner: NodeId::new("a"),
                    data: DataTypeId::new("counter"),
                    src: "a.outputs.x".to_string(),
                    dst: "b.inputs.x".to_string(),
                    direction: Direction::Feedforward,
                }],
            )
            .unwrap()
            .build();
        let cfg = denormalize(cfg).unwrap();
        let allocator = BufferAllocator::from_config(&cfg).unwrap();

        let map = TransportFactory::build(&cfg, &HostId::new("h1"), &allocator).unwrap();
        assert_eq!(map.intra.len(), 1);
        assert!(map.inter_process.is_empty());
    }
}
