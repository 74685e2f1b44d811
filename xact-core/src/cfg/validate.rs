//! Referential consistency checks (§3 invariants; grounded on
//! `xact.cfg.validate._check_consistency`).
//!
//! Schema-level structural validation (types, required fields) is handled
//! for free by `serde` failing to deserialize into [`Config`] in the first
//! place (§6: "a normalized config source deserializes cleanly into the
//! config types"); what's left to check by hand here is everything that
//! spans more than one field — foreign keys between sections, and the
//! edge-uniqueness rules that only make sense once every edge is in view.

use std::collections::HashSet;
use xact_types::{CfgError, Config, PortKind};

/// Run every referential check against a normalized (not yet denormalised)
/// config. Returns the first violation found; callers that want every
/// violation at once should collect via [`all_violations`].
pub fn check_consistency(cfg: &Config) -> Result<(), CfgError> {
    all_violations(cfg).into_iter().next().map_or(Ok(()), Err)
}

/// Same checks as [`check_consistency`], but exhaustive — useful for a CLI
/// that wants to report every problem in one pass instead of one-at-a-time.
pub fn all_violations(cfg: &Config) -> Vec<CfgError> {
    let mut errors = Vec::new();

    for (process_id, process) in &cfg.process {
        if !cfg.host.contains_key(&process.host) {
            errors.push(CfgError::UnknownHost(process.host.clone()));
            let _ = process_id;
        }
    }

    for (node_id, node) in &cfg.node {
        if !cfg.process.contains_key(&node.process) {
            errors.push(CfgError::UnknownProcess(node.process.clone()));
        }
        if let Some(req) = &node.req_host_cfg {
            if !cfg.req_host_cfg.contains_key(req.as_str()) {
                errors.push(CfgError::UnknownReqHostCfg(req.clone()));
            }
        }
        if let Some(state_type) = &node.state_type {
            if !cfg.data.contains_key(state_type) {
                errors.push(CfgError::UnknownDataType(state_type.clone()));
            }
        }
        let _ = node_id;
    }

    for spec in cfg.req_host_cfg.values() {
        for role in &spec.role {
            if !cfg.role.contains_key(role) {
                errors.push(CfgError::UnknownRole(role.clone()));
            }
        }
    }

    let mut seen_src: HashSet<(&str, &str)> = HashSet::new();
    let mut seen_dst: HashSet<(&str, &str)> = HashSet::new();

    for edge in &cfg.edge {
        if !cfg.node.contains_key(&edge.owner) {
            errors.push(CfgError::UnknownNode(edge.owner.clone()));
        }
        if !cfg.node.contains_key(&edge.src_node_id) {
            errors.push(CfgError::UnknownNode(edge.src_node_id.clone()));
        }
        if !cfg.node.contains_key(&edge.dst_node_id) {
            errors.push(CfgError::UnknownNode(edge.dst_node_id.clone()));
        }
        if !cfg.data.contains_key(&edge.data) {
            errors.push(CfgError::UnknownDataType(edge.data.clone()));
        }

        if xact_types::edge::split_path(&edge.src, PortKind::Outputs).is_err() {
            errors.push(CfgError::EdgeSourceNotOutput(edge.src.clone()));
        }
        if xact_types::edge::split_path(&edge.dst, PortKind::Inputs).is_err() {
            errors.push(CfgError::EdgeDestNotInput(edge.dst.clone()));
        }

        let src_key = (edge.src_node_id.as_str(), edge.src_port.as_str());
        if !seen_src.insert(src_key) {
            errors.push(CfgError::RepeatedEdgeSource(edge.src.clone()));
        }
        let dst_key = (edge.dst_node_id.as_str(), edge.dst_port.as_str());
        if !seen_dst.insert(dst_key) {
            errors.push(CfgError::RepeatedEdgeDest(edge.dst.clone()));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::builder::ConfigBuilder;
    use xact_types::{DataTypeId, EdgeDecl, Direction, Functionality, HostId, Node, NodeId, ProcessId};

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
    fn accepts_a_well_formed_pipeline() {
        let cfg = ConfigBuilder::new("sys")
            .add_data(DataTypeId::new("counter"), xact_types::DataTypeSpec::Alias("int64".into()))
            .unwrap()
            .add_pipeline(
                HostId::new("h1"),
                ProcessId::new("p1"),
                vec![(NodeId::new("a"), node("p1")), (NodeId::new("b"), node("p1"))],
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

        assert!(check_consistency(&cfg).is_ok());
    }

    #[test]
    fn rejects_repeated_feedforward_source() {
        let cfg = ConfigBuilder::new("sys")
            .add_data(DataTypeId::new("counter"), xact_types::DataTypeSpec::Alias("int64".into()))
            .unwrap()
            .add_pipeline(
                HostId::new("h1"),
                ProcessId::new("p1"),
                vec![
                    (NodeId::new("a"), node("p1")),
                    (NodeId::new("b"), node("p1")),
                    (NodeId::new("c"), node("p1")),
                ],
                vec![
                    EdgeDecl {
                        owner: NodeId::new("a"),
                        data: DataTypeId::new("counter"),
                        src: "a.outputs.count".to_string(),
                        dst: "b.inputs.count".to_string(),
                        direction: Direction::Feedforward,
                    },
                    EdgeDecl {
                        owner: NodeId::new("a"),
                        data: DataTypeId::new("counter"),
                        src: "a.outputs.count".to_string(),
                        dst: "c.inputs.count".to_string(),
                        direction: Direction::Feedforward,
                    },
                ],
            )
            .unwrap()
            .build();

        let errs = all_violations(&cfg);
        assert!(errs.iter().any(|e| matches!(e, CfgError::RepeatedEdgeSource(_))));
    }

    #[test]
    fn rejects_dangling_host_reference() {
        let mut cfg = Config::skeleton("sys");
        cfg.process.insert(ProcessId::new("p1"), xact_types::Process { host: HostId::new("ghost") });
        let errs = all_violations(&cfg);
        assert!(errs.iter().any(|e| matches!(e, CfgError::UnknownHost(_))));
    }
}
