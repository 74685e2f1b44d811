//! Process Scheduler (§4.E): Kahn-style tranche ordering over
//! intra-process feedforward edges, then a reset/step outer loop honouring
//! the documented signal priority.

use crate::node::NodeRuntime;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use xact_types::{Config, ControlSignal, Direction, IpcType, NodeId, ProcessId};

/// Nodes of this process, grouped into tranches: within a tranche, order
/// is lexicographic by id; across tranches, order follows the
/// topological dependency the intra-process feedforward edges impose.
fn compute_tranches(cfg: &Config, process: &ProcessId) -> Vec<Vec<NodeId>> {
    let node_ids: HashSet<NodeId> = cfg.nodes_in_process(process).map(|(id, _)| id.clone()).collect();

    let mut indegree: HashMap<NodeId, u32> = node_ids.iter().map(|id| (id.clone(), 0)).collect();
    let mut successors: HashMap<NodeId, Vec<NodeId>> = node_ids.iter().map(|id| (id.clone(), Vec::new())).collect();

    for edge in &cfg.edge {
        if edge.direction != Direction::Feedforward || edge.ipc_type != IpcType::IntraProcess {
            continue;
        }
        if !node_ids.contains(&edge.src_node_id) || !node_ids.contains(&edge.dst_node_id) {
            continue;
        }
        *indegree.get_mut(&edge.dst_node_id).expect("dst in process") += 1;
        successors
            .get_mut(&edge.src_node_id)
            .expect("src in process")
            .push(edge.dst_node_id.clone());
    }

    let mut tranches = Vec::new();
    let mut scheduled: HashSet<NodeId> = HashSet::new();
    let mut remaining = indegree;

    loop {
        let mut tranche: Vec<NodeId> = remaining
            .iter()
            .filter(|(id, &deg)| deg == 0 && !scheduled.contains(*id))
            .map(|(id, _)| id.clone())
            .collect();
        if tranche.is_empty() {
            break;
        }
        tranche.sort();
        for id in &tranche {
            scheduled.insert(id.clone());
            if let Some(succs) = successors.get(id) {
                for succ in succs {
                    if let Some(deg) = remaining.get_mut(succ) {
                        *deg = deg.saturating_sub(1);
                    }
                }
            }
        }
        tranches.push(tranche);
    }

    let mut leftover: Vec<NodeId> = node_ids.into_iter().filter(|id| !scheduled.contains(id)).collect();
    if !leftover.is_empty() {
        leftover.sort();
        tranches.push(leftover);
    }

    tranches
}

/// Exit codes mirroring §4.E / §6: `Halt(code)` carries its own code,
/// `NonRecoverableError` maps to `1`.
pub struct ProcessScheduler {
    process: ProcessId,
    tranches: Vec<Vec<NodeId>>,
    nodes: IndexMap<NodeId, NodeRuntime>,
}

impl ProcessScheduler {
    pub fn new(cfg: &Config, process: ProcessId, nodes: IndexMap<NodeId, NodeRuntime>) -> Self {
        let tranches = compute_tranches(cfg, &process);
        Self { process, tranches, nodes }
    }

    fn reset_all_nodes(&mut self) -> Option<ControlSignal> {
        let signals: Vec<ControlSignal> = self.nodes.values_mut().filter_map(NodeRuntime::reset).collect();
        xact_types::highest_priority(signals)
    }

    fn step_once(&mut self) -> Option<ControlSignal> {
        let mut signals = Vec::new();
        for tranche in &self.tranches {
            for node_id in tranche {
                if let Some(node) = self.nodes.get_mut(node_id) {
                    if let Some(signal) = node.step() {
                        signals.push(signal);
                    }
                }
            }
        }
        xact_types::highest_priority(signals)
    }

    /// Run this process's reset/step outer loop until a `Halt` or
    /// `NonRecoverableError` signal is honoured, returning the process
    /// exit code.
    pub fn run(&mut self) -> i32 {
        loop {
            if let Some(signal) = self.reset_all_nodes() {
                match signal {
                    ControlSignal::ResetAndRetry => {
                        tracing::warn!(process = %self.process, "reset-and-retry signalled during reset, retrying");
                        continue;
                    }
                    ControlSignal::Halt(code) => {
                        tracing::info!(process = %self.process, code, "process halted during reset");
                        return code;
                    }
                    ControlSignal::NonRecoverableError(cause) => {
                        tracing::error!(process = %self.process, %cause, "non-recoverable error during reset");
                        return 1;
                    }
                }
            }

            loop {
                match self.step_once() {
                    None => continue,
                    Some(ControlSignal::ResetAndRetry) => {
                        tracing::warn!(process = %self.process, "reset-and-retry signalled, re-entering reset");
                        break;
                    }
                    Some(ControlSignal::Halt(code)) => {
                        tracing::info!(process = %self.process, code, "process halted");
                        return code;
                    }
                    Some(ControlSignal::NonRecoverableError(cause)) => {
                        tracing::error!(process = %self.process, %cause, "non-recoverable error");
                        return 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::builder::ConfigBuilder;
    use crate::denormalize::denormalize;
    use crate::node::functionality::{LoadedFunctionality, ModuleRegistry};
    use xact_types::{Buffer, DataTypeId, DataTypeSpec, EdgeDecl, Functionality, HostId, Node};

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
    fn tranches_respect_intra_process_feedforward_order() {
        let cfg = ConfigBuilder::new("sys")
            .add_data(DataTypeId::new("counter"), DataTypeSpec::Alias("int64".into()))
            .unwrap()
            .add_pipeline(
                HostId::new("h1"),
                ProcessId::new("p1"),
                vec![(NodeId::new("b"), node("p1")), (NodeId::new("a"), node("p1")), (NodeId::new("c"), node("p1"))],
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

        let tranches = compute_tranches(&cfg, &ProcessId::new("p1"));
        assert_eq!(tranches[0], vec![NodeId::new("a"), NodeId::new("c")]);
        assert_eq!(tranches[1], vec![NodeId::new("b")]);
    }

    #[test]
    fn run_honours_a_halt_signal_from_step() {
        let mut registry = ModuleRegistry::new();
        registry.register("demo::halts", |_config| {
            Ok(LoadedFunctionality {
                reset_fn: Box::new(|_state, _outputs| Ok(None)),
                step_fn: Box::new(|_inputs, _state, _outputs| Ok(Some(ControlSignal::Halt(7)))),
            })
        });
        let functionality = Functionality::Module { module: "demo::halts".to_string() };

        let mut nodes = IndexMap::new();
        nodes.insert(
            NodeId::new("a"),
            NodeRuntime::new(NodeId::new("a"), &functionality, &None, Buffer::I64(0), vec![], vec![], &registry).unwrap(),
        );

        let cfg = ConfigBuilder::new("sys")
            .add_pipeline(HostId::new("h1"), ProcessId::new("p1"), vec![(NodeId::new("a"), node("p1"))], vec![])
            .unwrap()
            .build();
        let cfg = denormalize(cfg).unwrap();

        let mut scheduler = ProcessScheduler::new(&cfg, ProcessId::new("p1"), nodes);
        assert_eq!(scheduler.run(), 7);
    }
}
