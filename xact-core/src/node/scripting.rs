//! The embedded scripting sub-runtime for source-text node callables
//! (§4.D, §9 "User-code transport"). Backed by `rhai`, chosen over `mlua`
//! for being pure-Rust (DESIGN.md).
//!
//! Buffers cross the Rust/script boundary through a small, lossy
//! `Buffer <-> rhai::Dynamic` conversion: atomics map onto rhai's native
//! bool/int/float/string, `Bytes` becomes an array of small ints (rhai has
//! no first-class byte-string type we rely on), and `Map` becomes a rhai
//! object map keyed the same way.

use crate::errors::ExecutionError;
use indexmap::IndexMap;
use rhai::{Array, Dynamic, Engine, Map as RhaiMap, Scope};
use std::fmt;
use std::sync::{Arc, Mutex};
use xact_types::{Buffer, ControlSignal};

#[derive(Debug)]
struct ScriptRaised(String);

impl fmt::Display for ScriptRaised {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ScriptRaised {}

/// One `rhai::Engine` per node, since `signal_*` functions are
/// re-registered per evaluation against a fresh signal slot and we'd
/// rather not share an engine (and its registrations) across nodes that
/// may run on different threads.
pub struct ScriptRuntime {
    engine: Engine,
}

impl Default for ScriptRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptRuntime {
    pub fn new() -> Self {
        Self { engine: Engine::new() }
    }

    fn register_signal_fns(&mut self, slot: &Arc<Mutex<Option<ControlSignal>>>) {
        let halt_slot = slot.clone();
        self.engine
            .register_fn("signal_halt", move |code: i64| {
                *halt_slot.lock().expect("signal slot poisoned") = Some(ControlSignal::Halt(code as i32));
            });

        let retry_slot = slot.clone();
        self.engine
            .register_fn("signal_reset_and_retry", move || {
                *retry_slot.lock().expect("signal slot poisoned") = Some(ControlSignal::ResetAndRetry);
            });

        let error_slot = slot.clone();
        self.engine
            .register_fn("signal_error", move |msg: &str| {
                *error_slot.lock().expect("signal slot poisoned") = Some(ControlSignal::from(msg));
            });
    }

    /// Evaluate a reset script. `state` and `outputs` are bound as mutable
    /// scope variables and written back after the script runs.
    pub fn eval_reset_with_outputs(
        &mut self,
        src: &str,
        state: &mut Buffer,
        outputs: &mut IndexMap<String, Buffer>,
    ) -> Result<Option<ControlSignal>, ExecutionError> {
        let signal_slot: Arc<Mutex<Option<ControlSignal>>> = Arc::new(Mutex::new(None));
        self.register_signal_fns(&signal_slot);

        let mut scope = Scope::new();
        scope.push_dynamic("state", buffer_to_dynamic(state));
        scope.push_dynamic("outputs", map_to_dynamic(outputs));

        self.engine
            .eval_with_scope::<Dynamic>(&mut scope, src)
            .map_err(|e| ExecutionError::FunctionalityLoadFailed {
                node: xact_types::NodeId::new("<reset script>"),
                reason: e.to_string(),
            })?;

        if let Some(updated) = scope.get_value::<Dynamic>("state") {
            *state = dynamic_to_buffer(updated)?;
        }
        if let Some(updated) = scope.get_value::<Dynamic>("outputs") {
            *outputs = dynamic_to_output_map(updated)?;
        }

        Ok(take_signal(&signal_slot))
    }

    /// Evaluate a step script. `inputs`/`state`/`outputs` are bound as
    /// scope variables; `state` and `outputs` are written back afterward.
    pub fn eval_step(
        &mut self,
        src: &str,
        inputs: &IndexMap<String, Buffer>,
        state: &mut Buffer,
        outputs: &mut IndexMap<String, Buffer>,
    ) -> Result<Option<ControlSignal>, ExecutionError> {
        let signal_slot: Arc<Mutex<Option<ControlSignal>>> = Arc::new(Mutex::new(None));
        self.register_signal_fns(&signal_slot);

        let mut scope = Scope::new();
        scope.push_dynamic("inputs", map_to_dynamic(inputs));
        scope.push_dynamic("state", buffer_to_dynamic(state));
        scope.push_dynamic("outputs", map_to_dynamic(outputs));

        self.engine
            .eval_with_scope::<Dynamic>(&mut scope, src)
            .map_err(|e| ExecutionError::StepFailed {
                node: xact_types::NodeId::new("<step script>"),
                source: Box::new(ScriptRaised(e.to_string())),
            })?;

        if let Some(updated) = scope.get_value::<Dynamic>("state") {
            *state = dynamic_to_buffer(updated)?;
        }
        if let Some(updated) = scope.get_value::<Dynamic>("outputs") {
            *outputs = dynamic_to_output_map(updated)?;
        }

        Ok(take_signal(&signal_slot))
    }
}

fn take_signal(slot: &Arc<Mutex<Option<ControlSignal>>>) -> Option<ControlSignal> {
    slot.lock().expect("signal slot poisoned").take()
}

fn buffer_to_dynamic(buf: &Buffer) -> Dynamic {
    match buf {
        Buffer::Bool(b) => Dynamic::from(*b),
        Buffer::I32(v) => Dynamic::from(*v as i64),
        Buffer::I64(v) => Dynamic::from(*v),
        Buffer::F32(v) => Dynamic::from(*v as f64),
        Buffer::F64(v) => Dynamic::from(*v),
        Buffer::Str(s) => Dynamic::from(s.clone()),
        Buffer::Bytes(bytes) => {
            let arr: Array = bytes.iter().map(|b| Dynamic::from(*b as i64)).collect();
            Dynamic::from(arr)
        }
        Buffer::Map(map) => {
            let mut out = RhaiMap::new();
            for (key, value) in map {
                out.insert(key.clone().into(), buffer_to_dynamic(value));
            }
            Dynamic::from(out)
        }
    }
}

fn map_to_dynamic(map: &IndexMap<String, Buffer>) -> Dynamic {
    let mut out = RhaiMap::new();
    for (key, value) in map {
        out.insert(key.clone().into(), buffer_to_dynamic(value));
    }
    Dynamic::from(out)
}

fn dynamic_to_buffer(value: Dynamic) -> Result<Buffer, ExecutionError> {
    if value.is::<bool>() {
        return Ok(Buffer::Bool(value.as_bool().unwrap_or_default()));
    }
    if value.is::<i64>() {
        return Ok(Buffer::I64(value.as_int().unwrap_or_default()));
    }
    if value.is::<f64>() {
        return Ok(Buffer::F64(value.as_float().unwrap_or_default()));
    }
    if value.is_string() {
        return Ok(Buffer::Str(value.into_string().unwrap_or_default()));
    }
    if value.is_array() {
        let arr = value.cast::<Array>();
        let bytes: Vec<u8> = arr
            .into_iter()
            .map(|d| d.as_int().unwrap_or_default() as u8)
            .collect();
        return Ok(Buffer::Bytes(bytes));
    }
    if value.is_map() {
        let map = value.cast::<RhaiMap>();
        let mut out = IndexMap::new();
        for (key, value) in map {
            out.insert(key.to_string(), dynamic_to_buffer(value)?);
        }
        return Ok(Buffer::Map(out));
    }
    Err(ExecutionError::Serialization(format!(
        "script produced a value with no Buffer equivalent: {value:?}"
    )))
}

fn dynamic_to_output_map(value: Dynamic) -> Result<IndexMap<String, Buffer>, ExecutionError> {
    match dynamic_to_buffer(value)? {
        Buffer::Map(map) => Ok(map),
        other => Err(ExecutionError::Serialization(format!(
            "expected 'outputs' to remain an object map, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_script_zeroes_state() {
        let mut runtime = ScriptRuntime::new();
        let mut state = Buffer::I64(99);
        let mut outputs = IndexMap::new();
        runtime.eval_reset_with_outputs("state = 0;", &mut state, &mut outputs).unwrap();
        assert_eq!(state, Buffer::I64(0));
    }

    #[test]
    fn step_script_increments_state_and_writes_output() {
        let mut runtime = ScriptRuntime::new();
        let mut state = Buffer::I64(0);
        let mut outputs = IndexMap::new();
        outputs.insert("count".to_string(), Buffer::I64(0));
        let inputs = IndexMap::new();

        runtime
            .eval_step("state = state + 1; outputs.count = state;", &inputs, &mut state, &mut outputs)
            .unwrap();

        assert_eq!(state, Buffer::I64(1));
        assert_eq!(outputs["count"], Buffer::I64(1));
    }

    #[test]
    fn signal_halt_is_surfaced_to_caller() {
        let mut runtime = ScriptRuntime::new();
        let mut state = Buffer::I64(0);
        let mut outputs = IndexMap::new();
        let inputs = IndexMap::new();

        let signal = runtime
            .eval_step("signal_halt(0);", &inputs, &mut state, &mut outputs)
            .unwrap();

        assert!(matches!(signal, Some(ControlSignal::Halt(0))));
    }
}
