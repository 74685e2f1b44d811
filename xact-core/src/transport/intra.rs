//! The intra-process edge class (§4.C): not a queue at all. The producer
//! and consumer share one aliased buffer; writing replaces its content,
//! reading clones the current content. Safe without locking because both
//! ends run on the same thread and the producer always writes before the
//! consumer reads within a step (§5, "Shared-resource policy").

use crate::errors::ExecutionError;
use xact_types::{Buffer, RestrictedSlot};

#[derive(Clone)]
pub struct IntraProcessSlot {
    slot: RestrictedSlot<Buffer>,
}

impl IntraProcessSlot {
    pub fn new(initial: Buffer) -> Self {
        Self {
            slot: RestrictedSlot::new(initial),
        }
    }

    /// A second handle aliasing the same underlying buffer, handed to the
    /// other end of the edge.
    pub fn alias(&self) -> Self {
        Self { slot: self.slot.alias() }
    }
}

impl super::Transport for IntraProcessSlot {
    fn blocking_read(&mut self) -> Result<Buffer, ExecutionError> {
        Ok(self.slot.get_cloned())
    }

    fn non_blocking_write(&mut self, item: Buffer) -> Result<(), ExecutionError> {
        self.slot.rebind(item);
        Ok(())
    }
}
