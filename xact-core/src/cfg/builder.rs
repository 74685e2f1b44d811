//! Programmatic config construction (§12; grounded on `xact.cfg.builder`).
//!
//! A thin, mistake-resistant wrapper over [`Config`] for callers that want
//! to assemble a system in code rather than writing YAML by hand — tests in
//! this crate use it almost exclusively instead of hand-rolled JSON blobs.

use xact_types::{
    CfgError, Config, DataTypeId, DataTypeSpec, Direction, Edge, EdgeDecl, Functionality, Host,
    HostId, Node, Process, ProcessId, RequirementSpec,
};

pub struct ConfigBuilder {
    cfg: Config,
}

impl ConfigBuilder {
    pub fn new(id_system: impl Into<String>) -> Self {
        Self {
            cfg: Config::skeleton(id_system),
        }
    }

    pub fn add_host(mut self, id: impl Into<HostId>, host: Host) -> Result<Self, CfgError> {
        let id = id.into();
        if self.cfg.host.contains_key(&id) {
            return Err(CfgError::other(format!("host '{id}' already exists")));
        }
        self.cfg.host.insert(id, host);
        Ok(self)
    }

    pub fn remove_host(mut self, id: &HostId) -> Result<Self, CfgError> {
        self.cfg
            .host
            .shift_remove(id)
            .ok_or_else(|| CfgError::UnknownHost(id.clone()))?;
        Ok(self)
    }

    pub fn add_process(mut self, id: impl Into<ProcessId>, host: HostId) -> Result<Self, CfgError> {
        let id = id.into();
        if !self.cfg.host.contains_key(&host) {
            return Err(CfgError::UnknownHost(host));
        }
        if self.cfg.process.contains_key(&id) {
            return Err(CfgError::other(format!("process '{id}' already exists")));
        }
        self.cfg.process.insert(id, Process { host });
        Ok(self)
    }

    pub fn remove_process(mut self, id: &ProcessId) -> Result<Self, CfgError> {
        self.cfg
            .process
            .shift_remove(id)
            .ok_or_else(|| CfgError::UnknownProcess(id.clone()))?;
        Ok(self)
    }

    pub fn add_node(mut self, id: impl Into<xact_types::NodeId>, node: Node) -> Result<Self, CfgError> {
        let id = id.into();
        if !self.cfg.process.contains_key(&node.process) {
            return Err(CfgError::UnknownProcess(node.process.clone()));
        }
        if self.cfg.node.contains_key(&id) {
            return Err(CfgError::other(format!("node '{id}' already exists")));
        }
        self.cfg.node.insert(id, node);
        Ok(self)
    }

    pub fn remove_node(mut self, id: &xact_types::NodeId) -> Result<Self, CfgError> {
        self.cfg
            .node
            .shift_remove(id)
            .ok_or_else(|| CfgError::UnknownNode(id.clone()))?;
        Ok(self)
    }

    pub fn add_edge(mut self, decl: EdgeDecl) -> Result<Self, CfgError> {
        let partial = Edge::from_decl(decl).map_err(CfgError::MalformedEdgePath)?;
        // Full resolution (host ids, ipc_type, edge_idx) happens in the
        // denormaliser; the builder only needs the declared shape to exist.
        self.cfg.edge.push(Edge {
            owner: partial.owner,
            data: partial.data,
            src: partial.src,
            dst: partial.dst,
            direction: partial.direction,
            id_edge: partial.id_edge,
            src_node_id: partial.src_node_id,
            src_port: partial.src_port,
            dst_node_id: partial.dst_node_id,
            dst_port: partial.dst_port,
            src_host_id: HostId::new(""),
            dst_host_id: HostId::new(""),
            owner_host_id: HostId::new(""),
            ipc_type: xact_types::IpcType::IntraProcess,
            process_id_list: Vec::new(),
            host_id_list: Vec::new(),
            edge_idx: None,
        });
        Ok(self)
    }

    pub fn remove_edge(mut self, id_edge: &xact_types::EdgeId) -> Result<Self, CfgError> {
        let before = self.cfg.edge.len();
        self.cfg.edge.retain(|e| &e.id_edge != id_edge);
        if self.cfg.edge.len() == before {
            return Err(CfgError::other(format!("edge '{id_edge}' not found")));
        }
        Ok(self)
    }

    pub fn add_data(mut self, id: impl Into<DataTypeId>, spec: DataTypeSpec) -> Result<Self, CfgError> {
        let id = id.into();
        if self.cfg.data.contains_key(&id) {
            return Err(CfgError::other(format!("data type '{id}' already exists")));
        }
        self.cfg.data.insert(id, spec);
        Ok(self)
    }

    pub fn remove_data(mut self, id: &DataTypeId) -> Result<Self, CfgError> {
        self.cfg
            .data
            .shift_remove(id)
            .ok_or_else(|| CfgError::UnknownDataType(id.clone()))?;
        Ok(self)
    }

    pub fn add_req_host_cfg(mut self, id: impl Into<String>, spec: RequirementSpec) -> Self {
        self.cfg.req_host_cfg.insert(id.into(), spec);
        self
    }

    /// Convenience for the common "one process per host, N nodes wired in a
    /// straight line" case used across the integration tests (§8's single-
    /// and dual-process counter scenarios).
    pub fn add_pipeline(
        mut self,
        host: impl Into<HostId>,
        process: impl Into<ProcessId>,
        nodes: Vec<(xact_types::NodeId, Node)>,
        edges: Vec<EdgeDecl>,
    ) -> Result<Self, CfgError> {
        let host = host.into();
        if !self.cfg.host.contains_key(&host) {
            self.cfg.host.insert(host.clone(), Host::localhost());
        }
        let process = process.into();
        self = self.add_process(process, host)?;
        for (id, node) in nodes {
            self = self.add_node(id, node)?;
        }
        for decl in edges {
            self = self.add_edge(decl)?;
        }
        Ok(self)
    }

    pub fn build(self) -> Config {
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xact_types::{Functionality, NodeId};

    #[test]
    fn rejects_node_on_unknown_process() {
        let err = ConfigBuilder::new("sys")
            .add_node(
                NodeId::new("a"),
                Node {
                    process: ProcessId::new("p1"),
                    req_host_cfg: None,
                    functionality: Functionality::default(),
                    state_type: None,
                    config: None,
                    host: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, CfgError::UnknownProcess(_)));
    }

    #[test]
    fn add_pipeline_builds_a_two_node_single_process_system() {
        let cfg = ConfigBuilder::new("sys")
            .add_pipeline(
                HostId::new("h1"),
                ProcessId::new("p1"),
                vec![
                    (
                        NodeId::new("a"),
                        Node {
                            process: ProcessId::new("p1"),
                            req_host_cfg: None,
                            functionality: Functionality::default(),
                            state_type: None,
                            config: None,
                            host: None,
                        },
                    ),
                    (
                        NodeId::new("b"),
                        Node {
                            process: ProcessId::new("p1"),
                            req_host_cfg: None,
                            functionality: Functionality::default(),
                            state_type: None,
                            config: None,
                            host: None,
                        },
                    ),
                ],
                vec![EdgeDecl {
                    owner: NodeId::new("a"),
                    data: DataTypeId::new("counter"),
                    src: "a.outputs.count".to_string(),
                    dst: "b.inputs.count".to_string(),
                    direction: Direction::Feedforward,
                }],
            )
            .unwrap()
            .build();

        assert_eq!(cfg.node.len(), 2);
        assert_eq!(cfg.edge.len(), 1);
    }
}
