use crate::ids::{DataTypeId, EdgeId, HostId, NodeId, ProcessId};
use serde::{Deserialize, Serialize};

/// `feedforward` (default) or `feedback` (§3). Feedback edges are excluded
/// from topological scheduling (§4.E) but otherwise behave like any other
/// edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Feedforward,
    Feedback,
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Feedforward
    }
}

/// `{owner_node_id, data_type, src_path, dst_path, direction}` as it
/// appears on disk, before denormalisation (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDecl {
    pub owner: NodeId,
    pub data: DataTypeId,
    pub src: String,
    pub dst: String,
    #[serde(default, rename = "dirn")]
    pub direction: Direction,
}

/// `intra_process` (aliased buffer), `inter_process` (on-host FIFO), or
/// `inter_host` (TCP pub/sub) (§3, glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpcType {
    IntraProcess,
    InterProcess,
    InterHost,
}

impl Default for IpcType {
    fn default() -> Self {
        IpcType::IntraProcess
    }
}

/// A port path split into its node id and leaf port name, with the
/// `outputs`/`inputs` segment validated and discarded (§3: "`src_path` has
/// second segment `outputs`; `dst_path` has `inputs`").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRef {
    pub node: NodeId,
    pub port: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    Outputs,
    Inputs,
}

/// Split a `node_id.outputs.port` / `node_id.inputs.port` path into its
/// three logical parts, validating the middle segment along the way.
pub fn split_path(path: &str, expected: PortKind) -> Result<PortRef, String> {
    let mut parts = path.splitn(3, '.');
    let node = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("malformed edge path '{path}'"))?;
    let kind = parts
        .next()
        .ok_or_else(|| format!("malformed edge path '{path}'"))?;
    let port = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("malformed edge path '{path}'"))?;

    let expected_segment = match expected {
        PortKind::Outputs => "outputs",
        PortKind::Inputs => "inputs",
    };
    if kind != expected_segment {
        return Err(format!(
            "edge path '{path}' must have second segment '{expected_segment}'"
        ));
    }

    Ok(PortRef {
        node: NodeId::new(node),
        port: port.to_string(),
    })
}

/// The denormalised form of an edge: everything `EdgeDecl` carries, plus
/// every field the denormaliser (§4.B) derives. On the wire only the
/// `EdgeDecl`-shaped fields are ever actually present — `prepare` fills in
/// the path-derived fields right after deserializing (§4.A), and
/// `denormalize` (§4.B) fills in the rest — so every derived field here
/// carries a placeholder default for serde's benefit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub owner: NodeId,
    pub data: DataTypeId,
    pub src: String,
    pub dst: String,
    #[serde(default, rename = "dirn")]
    pub direction: Direction,

    #[serde(default)]
    pub id_edge: EdgeId,
    #[serde(default)]
    pub src_node_id: NodeId,
    #[serde(default)]
    pub src_port: String,
    #[serde(default)]
    pub dst_node_id: NodeId,
    #[serde(default)]
    pub dst_port: String,
    #[serde(default)]
    pub src_host_id: HostId,
    #[serde(default)]
    pub dst_host_id: HostId,
    #[serde(default)]
    pub owner_host_id: HostId,
    #[serde(default)]
    pub ipc_type: IpcType,
    #[serde(default)]
    pub process_id_list: Vec<ProcessId>,
    #[serde(default)]
    pub host_id_list: Vec<HostId>,
    /// Only set for `inter_host` edges; used to derive the edge's TCP port
    /// as `port_range.lo + edge_idx` (§3, §4.B step 3).
    #[serde(default)]
    pub edge_idx: Option<u32>,
}

impl Edge {
    /// Fill in the path-derived fields (`id_edge`, `src_node_id`,
    /// `src_port`, `dst_node_id`, `dst_port`) from `src`/`dst`, the way
    /// [`Edge::from_decl`] does for builder-constructed edges. Called by
    /// `cfg::prepare` right after deserializing a wire config, where only
    /// the `EdgeDecl`-shaped fields are ever actually present.
    pub fn derive_paths(&mut self) -> Result<(), String> {
        let src = split_path(&self.src, PortKind::Outputs)?;
        let dst = split_path(&self.dst, PortKind::Inputs)?;
        self.id_edge = EdgeId::new(format!("{}-{}", self.src, self.dst));
        self.src_node_id = src.node;
        self.src_port = src.port;
        self.dst_node_id = dst.node;
        self.dst_port = dst.port;
        Ok(())
    }

    pub fn from_decl(decl: EdgeDecl) -> Result<PartialEdge, String> {
        let src = split_path(&decl.src, PortKind::Outputs)?;
        let dst = split_path(&decl.dst, PortKind::Inputs)?;
        let id_edge = EdgeId::new(format!("{}-{}", decl.src, decl.dst));
        Ok(PartialEdge {
            owner: decl.owner,
            data: decl.data,
            src: decl.src,
            dst: decl.dst,
            direction: decl.direction,
            id_edge,
            src_node_id: src.node,
            src_port: src.port,
            dst_node_id: dst.node,
            dst_port: dst.port,
        })
    }
}

/// An edge that has been path-split but not yet resolved against hosts and
/// processes; an intermediate value used by the denormaliser.
pub struct PartialEdge {
    pub owner: NodeId,
    pub data: DataTypeId,
    pub src: String,
    pub dst: String,
    pub direction: Direction,
    pub id_edge: EdgeId,
    pub src_node_id: NodeId,
    pub src_port: String,
    pub dst_node_id: NodeId,
    pub dst_port: String,
}
