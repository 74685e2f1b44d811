//! Transport Factory (§4.C): per-edge queue endpoints, grouped by class.

mod factory;
mod inter_host;
mod inter_process;
mod intra;

pub use factory::{HostQueueMap, InterHostClientSpec, InterHostServerSpec, InterProcessEndpoints, IntraEndpoints, TransportFactory};
pub use inter_host::{InterHostClient, InterHostServer};
pub use inter_process::InterProcessQueue;
pub use intra::IntraProcessSlot;

use crate::errors::ExecutionError;
use xact_types::Buffer;

/// The two operations every endpoint exposes (§4.C), regardless of which
/// of the four queue classes backs it.
pub trait Transport: Send {
    /// Wait until an item is available and return it. FIFO.
    fn blocking_read(&mut self) -> Result<Buffer, ExecutionError>;

    /// Never blocks. Fails immediately with [`ExecutionError::QueueFull`]
    /// if the transport is bounded and full.
    fn non_blocking_write(&mut self, item: Buffer) -> Result<(), ExecutionError>;
}
