//! Data model, config schema, error taxonomy and control-signal types
//! shared by every other `xact` crate.
//!
//! This crate is deliberately free of any execution logic — it is consumed
//! by `xact-core` (the engine) and `xact-cli` (the CLI/orchestrator) alike,
//! the way `dozer-types` sits underneath `dozer-core`/`dozer-cli`.

pub mod buffer;
pub mod config;
pub mod edge;
pub mod error;
pub mod ids;
pub mod model;
pub mod restricted;
pub mod signal;

pub use buffer::{AtomicType, Buffer, DataTypeSpec};
pub use config::{Config, QueueSelectorTable, RequirementSpec, Runtime, RuntimeId, RuntimeOpt};
pub use edge::{Direction, Edge, EdgeDecl, IpcType, PartialEdge, PortKind, PortRef};
pub use error::CfgError;
pub use ids::{DataTypeId, EdgeId, HostId, NodeId, ProcessId, RequirementId, RoleId};
pub use model::{Functionality, Host, Node, PortRange, Process, System};
pub use restricted::RestrictedSlot;
pub use signal::{highest_priority, ControlSignal};
