//! Denormaliser (§4.B; grounded on `xact.cfg.edge.denormalize`).
//!
//! Runs once, right after [`crate::cfg::prepare`] validates a normalized
//! config. Order matters — later steps read fields the earlier steps
//! write — so this is a single ordered function rather than five
//! independent passes callers could reorder by accident.

use std::collections::HashMap;
use xact_types::{CfgError, Config, HostId, IpcType};

/// Denormalise `cfg` in place, in the five-step order fixed by §4.B.
/// Idempotent: running it twice on an already-denormalised config leaves
/// every derived field unchanged, since each step recomputes from the
/// declared (non-derived) fields rather than accumulating onto prior
/// derived state.
pub fn denormalize(mut cfg: Config) -> Result<Config, CfgError> {
    step1_copy_node_hosts(&mut cfg)?;
    step2_resolve_edge_endpoints(&mut cfg)?;
    step3_assign_edge_idx(&mut cfg)?;
    step4_set_owner_host(&mut cfg)?;
    step5_mark_inter_host_owners(&mut cfg);
    Ok(cfg)
}

/// 1. For each node, copy its host id (looked up via its process).
fn step1_copy_node_hosts(cfg: &mut Config) -> Result<(), CfgError> {
    let mut hosts: HashMap<xact_types::NodeId, HostId> = HashMap::new();
    for (node_id, node) in &cfg.node {
        let process = cfg
            .process
            .get(&node.process)
            .ok_or_else(|| CfgError::UnknownProcess(node.process.clone()))?;
        hosts.insert(node_id.clone(), process.host.clone());
    }
    for (node_id, node) in cfg.node.iter_mut() {
        node.host = hosts.get(node_id).cloned();
    }
    Ok(())
}

/// 2. For each edge, fill in src/dst host/process ids and derive
/// `ipc_type`. A process id appearing under two different hosts across
/// the src/dst/owner triple is a fatal config error (§3 invariant).
fn step2_resolve_edge_endpoints(cfg: &mut Config) -> Result<(), CfgError> {
    let node_process: HashMap<xact_types::NodeId, xact_types::ProcessId> = cfg
        .node
        .iter()
        .map(|(id, n)| (id.clone(), n.process.clone()))
        .collect();
    let process_host: HashMap<xact_types::ProcessId, HostId> = cfg
        .process
        .iter()
        .map(|(id, p)| (id.clone(), p.host.clone()))
        .collect();

    for edge in cfg.edge.iter_mut() {
        let src_process = node_process
            .get(&edge.src_node_id)
            .ok_or_else(|| CfgError::UnknownNode(edge.src_node_id.clone()))?;
        let dst_process = node_process
            .get(&edge.dst_node_id)
            .ok_or_else(|| CfgError::UnknownNode(edge.dst_node_id.clone()))?;
        let src_host = process_host
            .get(src_process)
            .ok_or_else(|| CfgError::UnknownProcess(src_process.clone()))?;
        let dst_host = process_host
            .get(dst_process)
            .ok_or_else(|| CfgError::UnknownProcess(dst_process.clone()))?;

        if src_process == dst_process && src_host != dst_host {
            return Err(CfgError::SplitProcessAcrossHosts {
                node: edge.src_node_id.clone(),
                edge: edge.id_edge.clone(),
            });
        }

        edge.src_host_id = src_host.clone();
        edge.dst_host_id = dst_host.clone();
        edge.process_id_list = vec![src_process.clone(), dst_process.clone()];
        edge.host_id_list = vec![src_host.clone(), dst_host.clone()];

        edge.ipc_type = if src_process == dst_process {
            IpcType::IntraProcess
        } else if src_host == dst_host {
            IpcType::InterProcess
        } else {
            IpcType::InterHost
        };
    }
    Ok(())
}

/// 3. For each inter-host edge, assign `edge_idx` by incrementing a
/// per-`owner_host_id` counter in edge declaration order.
///
/// This step runs before step 4 sets `owner_host_id` on every edge, so it
/// derives the owner host directly from the owner node here too — step 4
/// repeats the same lookup and writes it onto the edge for everyone else
/// to read. Keeping both steps matches the original's ordering exactly
/// even though this rendition does not strictly need the duplication.
fn step3_assign_edge_idx(cfg: &mut Config) -> Result<(), CfgError> {
    let node_host: HashMap<xact_types::NodeId, HostId> = cfg
        .node
        .iter()
        .map(|(id, n)| (id.clone(), n.host.clone().unwrap_or_else(|| HostId::new(""))))
        .collect();

    let mut counters: HashMap<HostId, u32> = HashMap::new();
    for edge in cfg.edge.iter_mut() {
        if edge.ipc_type != IpcType::InterHost {
            continue;
        }
        let owner_host = node_host
            .get(&edge.owner)
            .ok_or_else(|| CfgError::UnknownNode(edge.owner.clone()))?;
        let counter = counters.entry(owner_host.clone()).or_insert(0);
        edge.edge_idx = Some(*counter);
        *counter += 1;
    }
    Ok(())
}

/// 4. Set `owner_host_id` on every edge to the host of its declared
/// `owner_node_id`.
fn step4_set_owner_host(cfg: &mut Config) -> Result<(), CfgError> {
    let node_host: HashMap<xact_types::NodeId, HostId> = cfg
        .node
        .iter()
        .map(|(id, n)| (id.clone(), n.host.clone()))
        .filter_map(|(id, h)| h.map(|h| (id, h)))
        .collect();

    for edge in cfg.edge.iter_mut() {
        edge.owner_host_id = node_host
            .get(&edge.owner)
            .cloned()
            .ok_or_else(|| CfgError::UnknownNode(edge.owner.clone()))?;
    }
    Ok(())
}

/// 5. Mark every host that owns at least one inter-host edge.
fn step5_mark_inter_host_owners(cfg: &mut Config) {
    let mut owners: std::collections::HashSet<HostId> = std::collections::HashSet::new();
    for edge in &cfg.edge {
        if edge.ipc_type == IpcType::InterHost {
            owners.insert(edge.owner_host_id.clone());
        }
    }
    for (host_id, host) in cfg.host.iter_mut() {
        host.is_inter_host_edge_owner = owners.contains(host_id);
    }
}

/// Validate every inter-host edge's derived port fits the owning host's
/// `port_range` (§3 invariant: `edge_idx + port_range.lo <= port_range.hi`).
pub fn check_port_ranges(cfg: &Config) -> Result<(), CfgError> {
    for edge in &cfg.edge {
        let Some(idx) = edge.edge_idx else { continue };
        let host = cfg
            .host
            .get(&edge.owner_host_id)
            .ok_or_else(|| CfgError::UnknownHost(edge.owner_host_id.clone()))?;
        let Some(range) = host.port_range else { continue };
        let port = range.lo as u32 + idx;
        if port > range.hi as u32 {
            return Err(CfgError::PortRangeExhausted {
                host: edge.owner_host_id.clone(),
                idx,
                lo: range.lo,
                hi: range.hi,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::builder::ConfigBuilder;
    use xact_types::{DataTypeId, DataTypeSpec, Direction, EdgeDecl, Functionality, Host, Node, NodeId, PortRange, ProcessId};

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
    fn intra_process_edge_is_classified_correctly() {
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
                    src: "a.outputs.count".to_string(),
                    dst: "b.inputs.count".to_string(),
                    direction: Direction::Feedforward,
                }],
            )
            .unwrap()
            .build();

        let cfg = denormalize(cfg).unwrap();
        assert_eq!(cfg.edge[0].ipc_type, IpcType::IntraProcess);
        assert_eq!(cfg.node["a"].host, Some(HostId::new("h1")));
    }

    #[test]
    fn inter_host_edges_get_sequential_edge_idx_per_owner() {
        let mut builder = ConfigBuilder::new("sys")
            .add_data(DataTypeId::new("counter"), DataTypeSpec::Alias("int64".into()))
            .unwrap()
            .add_host(HostId::new("h1"), Host::localhost())
            .unwrap()
            .add_host(HostId::new("h2"), Host::localhost())
            .unwrap()
            .add_process(ProcessId::new("p1"), HostId::new("h1"))
            .unwrap()
            .add_process(ProcessId::new("p2"), HostId::new("h2"))
            .unwrap();
        for name in ["a", "b", "c", "d"] {
            builder = builder
                .add_node(
                    NodeId::new(name),
                    node(if name == "a" || name == "c" { "p1" } else { "p2" }),
                )
                .unwrap();
        }
        let cfg = builder
            .add_edge(EdgeDecl {
                owner: NodeId::new("a"),
                data: DataTypeId::new("counter"),
                src: "a.outputs.x".to_string(),
                dst: "b.inputs.x".to_string(),
                direction: Direction::Feedforward,
            })
            .unwrap()
            .add_edge(EdgeDecl {
                owner: NodeId::new("c"),
                data: DataTypeId::new("counter"),
                src: "c.outputs.y".to_string(),
                dst: "d.inputs.y".to_string(),
                direction: Direction::Feedforward,
            })
            .unwrap()
            .build();

        let cfg = denormalize(cfg).unwrap();
        assert_eq!(cfg.edge[0].ipc_type, IpcType::InterHost);
        assert_eq!(cfg.edge[0].edge_idx, Some(0));
        assert_eq!(cfg.edge[1].edge_idx, Some(1));
        assert!(cfg.host["h1"].is_inter_host_edge_owner);
        assert!(!cfg.host["h2"].is_inter_host_edge_owner);
    }

    #[test]
    fn rejects_port_range_exhaustion() {
        let mut host = Host::localhost();
        host.port_range = Some(PortRange { lo: 9000, hi: 9000 });
        let mut builder = ConfigBuilder::new("sys")
            .add_data(DataTypeId::new("counter"), DataTypeSpec::Alias("int64".into()))
            .unwrap()
            .add_host(HostId::new("h1"), host)
            .unwrap()
            .add_host(HostId::new("h2"), Host::localhost())
            .unwrap()
            .add_process(ProcessId::new("p1"), HostId::new("h1"))
            .unwrap()
            .add_process(ProcessId::new("p2"), HostId::new("h2"))
            .unwrap();
        for name in ["a", "b", "c", "d"] {
            builder = builder
                .add_node(
                    NodeId::new(name),
                    node(if name == "a" || name == "c" { "p1" } else { "p2" }),
                )
                .unwrap();
        }
        let cfg = builder
            .add_edge(EdgeDecl {
                owner: NodeId::new("a"),
                data: DataTypeId::new("counter"),
                src: "a.outputs.x".to_string(),
                dst: "b.inputs.x".to_string(),
                direction: Direction::Feedforward,
            })
            .unwrap()
            .add_edge(EdgeDecl {
                owner: NodeId::new("c"),
                data: DataTypeId::new("counter"),
                src: "c.outputs.y".to_string(),
                dst: "d.inputs.y".to_string(),
                direction: Direction::Feedforward,
            })
            .unwrap()
            .build();

        let cfg = denormalize(cfg).unwrap();
        let err = check_port_ranges(&cfg).unwrap_err();
        assert!(matches!(err, CfgError::PortRangeExhausted { .. }));
    }
}
