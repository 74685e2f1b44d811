//! The inter-process edge class (§4.C): a bounded FIFO over
//! `crossbeam-channel`, safe for a single producer and single consumer on
//! the same host.

use crate::errors::ExecutionError;
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use xact_types::Buffer;

const DEFAULT_CAPACITY: usize = 64;

pub struct InterProcessQueue {
    sender: Option<Sender<Buffer>>,
    receiver: Option<Receiver<Buffer>>,
}

impl InterProcessQueue {
    /// Build the two halves of one bounded channel: the writer end for
    /// the producing node's process, the reader end for the consuming
    /// node's process. `capacity` defaults to [`DEFAULT_CAPACITY`] when
    /// `None` (the normalized config does not currently expose a per-edge
    /// override for this).
    pub fn pair(capacity: Option<usize>) -> (Self, Self) {
        let (tx, rx) = crossbeam_channel::bounded(capacity.unwrap_or(DEFAULT_CAPACITY));
        (
            Self {
                sender: Some(tx),
                receiver: None,
            },
            Self {
                sender: None,
                receiver: Some(rx),
            },
        )
    }
}

impl super::Transport for InterProcessQueue {
    fn blocking_read(&mut self) -> Result<Buffer, ExecutionError> {
        let rx = self
            .receiver
            .as_ref()
            .ok_or_else(|| ExecutionError::other("this queue endpoint has no reader half"))?;
        rx.recv().map_err(ExecutionError::from)
    }

    fn non_blocking_write(&mut self, item: Buffer) -> Result<(), ExecutionError> {
        let tx = self
            .sender
            .as_ref()
            .ok_or_else(|| ExecutionError::other("this queue endpoint has no writer half"))?;
        tx.try_send(item).map_err(|e| match e {
            TrySendError::Full(_) => ExecutionError::QueueFull("inter_process".to_string()),
            TrySendError::Disconnected(_) => ExecutionError::ChannelDisconnected("inter_process".to_string()),
        })
    }
}

/// Exposed for callers that want to poll rather than block (the scheduler
/// itself never does; this backs the host agent's drain-on-shutdown path).
pub fn try_read(rx: &Receiver<Buffer>) -> Result<Option<Buffer>, ExecutionError> {
    match rx.try_recv() {
        Ok(item) => Ok(Some(item)),
        Err(TryRecvError::Empty) => Ok(None),
        Err(TryRecvError::Disconnected) => Err(ExecutionError::ChannelDisconnected("inter_process".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Transport;

    #[test]
    fn writer_and_reader_see_fifo_order() {
        let (mut writer, mut reader) = InterProcessQueue::pair(Some(4));
        writer.non_blocking_write(Buffer::I64(1)).unwrap();
        writer.non_blocking_write(Buffer::I64(2)).unwrap();
        assert_eq!(reader.blocking_read().unwrap(), Buffer::I64(1));
        assert_eq!(reader.blocking_read().unwrap(), Buffer::I64(2));
    }

    #[test]
    fn write_fails_fast_when_bounded_queue_is_full() {
        let (mut writer, _reader) = InterProcessQueue::pair(Some(1));
        writer.non_blocking_write(Buffer::I64(1)).unwrap();
        let err = writer.non_blocking_write(Buffer::I64(2)).unwrap_err();
        assert!(matches!(err, ExecutionError::QueueFull(_)));
    }
}
