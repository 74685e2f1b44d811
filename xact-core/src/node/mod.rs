//! Node Runtime (§4.D): wraps a loaded `(reset_fn, step_fn)` pair with
//! uniform signal handling, input dequeue, and output enqueue.

pub mod functionality;
pub mod scripting;

use crate::errors::ExecutionError;
use crate::transport::Transport;
use functionality::{load, LoadedFunctionality, ModuleRegistry};
use indexmap::IndexMap;
use serde_json::Value;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use xact_types::{Buffer, ControlSignal, Functionality, NodeId, RestrictedSlot};

/// One instantiated node: its state, its input/output buffers, and the
/// queue table wiring each named port to a transport endpoint.
///
/// `inputs` is keyed the same way the config's edges name ports and holds
/// `RestrictedSlot<Buffer>` rather than plain `Buffer` so that the map
/// itself — and every alias an intra-process producer holds onto one of
/// its slots — survives unchanged across steps; only the slot's *content*
/// is rebound (§4.D step 1: "without breaking the existing input-mapping
/// identity").
pub struct NodeRuntime {
    pub id: NodeId,
    state: Buffer,
    inputs: IndexMap<String, RestrictedSlot<Buffer>>,
    outputs: IndexMap<String, Buffer>,
    input_queues: IndexMap<String, Box<dyn Transport>>,
    output_queues: IndexMap<String, Box<dyn Transport>>,
    reset_fn: functionality::ResetFn,
    step_fn: functionality::StepFn,
}

impl NodeRuntime {
    pub fn new(
        id: NodeId,
        functionality: &Functionality,
        config: &Option<Value>,
        initial_state: Buffer,
        input_ports: impl IntoIterator<Item = (String, Buffer)>,
        output_ports: impl IntoIterator<Item = (String, Buffer)>,
        registry: &ModuleRegistry,
    ) -> Result<Self, ExecutionError> {
        let LoadedFunctionality { reset_fn, step_fn } = load(&id, functionality, config, registry)?;

        let inputs = input_ports
            .into_iter()
            .map(|(path, zeroed)| (path, RestrictedSlot::new(zeroed)))
            .collect();
        let outputs = output_ports.into_iter().collect();

        Ok(Self {
            id,
            state: initial_state,
            inputs,
            outputs,
            input_queues: IndexMap::new(),
            output_queues: IndexMap::new(),
            reset_fn,
            step_fn,
        })
    }

    /// Wire an input port to its transport endpoint (built by the
    /// [`crate::transport::TransportFactory`] and handed down by the
    /// scheduler at process start).
    pub fn attach_input(&mut self, port: impl Into<String>, transport: Box<dyn Transport>) {
        self.input_queues.insert(port.into(), transport);
    }

    pub fn attach_output(&mut self, port: impl Into<String>, transport: Box<dyn Transport>) {
        self.output_queues.insert(port.into(), transport);
    }

    /// `reset()` contract (§4.D): initialise/zero `state`; any panic or
    /// `Err` from the loaded closure is converted into a
    /// `NonRecoverableError` signal rather than propagated.
    pub fn reset(&mut self) -> Option<ControlSignal> {
        let state = &mut self.state;
        let outputs = &mut self.outputs;
        let reset_fn = &mut self.reset_fn;

        match catch_unwind(AssertUnwindSafe(|| reset_fn(state, outputs))) {
            Ok(Ok(signal)) => signal,
            Ok(Err(err)) => Some(ControlSignal::from(err.to_string())),
            Err(panic) => Some(ControlSignal::from(describe_panic(panic))),
        }
    }

    /// `step()` contract (§4.D): drain every input queue into its slot,
    /// invoke `step_fn`, flush every output queue, and return whichever
    /// signal (if any) the step produced.
    pub fn step(&mut self) -> Option<ControlSignal> {
        for (path, queue) in self.input_queues.iter_mut() {
            match queue.blocking_read() {
                Ok(item) => {
                    if let Some(slot) = self.inputs.get(path) {
                        slot.rebind(item);
                    }
                }
                Err(e) => return Some(ControlSignal::from(e.to_string())),
            }
        }

        let snapshot: IndexMap<String, Buffer> = self.inputs.iter().map(|(k, v)| (k.clone(), v.get_cloned())).collect();

        let state = &mut self.state;
        let outputs = &mut self.outputs;
        let step_fn = &mut self.step_fn;

        let signal = match catch_unwind(AssertUnwindSafe(|| step_fn(&snapshot, state, outputs))) {
            Ok(Ok(signal)) => signal,
            Ok(Err(err)) => Some(ControlSignal::from(err.to_string())),
            Err(panic) => Some(ControlSignal::from(describe_panic(panic))),
        };

        for (path, queue) in self.output_queues.iter_mut() {
            if let Some(value) = self.outputs.get(path).cloned() {
                if let Err(e) = queue.non_blocking_write(value) {
                    return Some(ControlSignal::from(e.to_string()));
                }
            }
        }

        signal
    }

    pub fn state(&self) -> &Buffer {
        &self.state
    }

    pub fn outputs(&self) -> &IndexMap<String, Buffer> {
        &self.outputs
    }
}

fn describe_panic(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "node panicked with a non-string payload".to_string()
    }
}
