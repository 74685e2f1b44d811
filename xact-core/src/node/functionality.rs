//! Loading user code into the uniform `(reset_fn, step_fn)` shape (§4.D).
//!
//! A [`Functionality::Module`] resolves against a process-wide
//! [`ModuleRegistry`] of compiled closures (Design Notes: a binary
//! closure-pickle has no portable Rust analogue; "module reference plus a
//! frozen argument record" is the closest idiomatic equivalent — the
//! config passed to the factory *is* that frozen argument record). A
//! [`Functionality::Script`] is evaluated by [`super::scripting::ScriptRuntime`].
//!
//! If neither `reset` nor `step` resolves to anything (an empty `Script`
//! with both source fields absent), both default to no-ops, matching
//! §4.D's fallback rule.

use super::scripting::ScriptRuntime;
use crate::errors::ExecutionError;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use xact_types::{Buffer, ControlSignal, Functionality, NodeId};

pub type ResetFn = Box<dyn FnMut(&mut Buffer, &mut IndexMap<String, Buffer>) -> Result<Option<ControlSignal>, ExecutionError> + Send>;
pub type StepFn = Box<
    dyn FnMut(&IndexMap<String, Buffer>, &mut Buffer, &mut IndexMap<String, Buffer>) -> Result<Option<ControlSignal>, ExecutionError>
        + Send,
>;

/// A node's fully loaded functionality: one closure per lifecycle method.
pub struct LoadedFunctionality {
    pub reset_fn: ResetFn,
    pub step_fn: StepFn,
}

/// A compiled-plugin factory: given the node's frozen `config`, produce
/// its `(reset_fn, step_fn)` pair. Registered under the name a config's
/// `functionality.module` references.
pub type NodeFactory = dyn Fn(&Option<Value>) -> Result<LoadedFunctionality, ExecutionError> + Send + Sync;

#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<NodeFactory>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(&Option<Value>) -> Result<LoadedFunctionality, ExecutionError> + Send + Sync + 'static,
    ) {
        self.modules.insert(name.into(), Arc::new(factory));
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<NodeFactory>> {
        self.modules.get(name).cloned()
    }
}

fn noop_reset() -> ResetFn {
    Box::new(|_state, _outputs| Ok(None))
}

fn noop_step() -> StepFn {
    Box::new(|_inputs, _state, _outputs| Ok(None))
}

/// Load `functionality` for `node_id`, given its frozen `config` and the
/// process-wide module registry.
pub fn load(
    node_id: &NodeId,
    functionality: &Functionality,
    config: &Option<Value>,
    registry: &ModuleRegistry,
) -> Result<LoadedFunctionality, ExecutionError> {
    match functionality {
        Functionality::Module { module } => {
            let factory = registry.resolve(module).ok_or_else(|| ExecutionError::FunctionalityLoadFailed {
                node: node_id.clone(),
                reason: format!("no module registered under the name '{module}'"),
            })?;
            factory(config)
        }
        Functionality::Script { reset_src, step_src, coro_src } => {
            if let Some(coro_src) = coro_src {
                load_coroutine(coro_src.clone())
            } else {
                load_reset_step(reset_src.clone(), step_src.clone())
            }
        }
    }
}

fn load_reset_step(reset_src: Option<String>, step_src: Option<String>) -> Result<LoadedFunctionality, ExecutionError> {
    let reset_fn: ResetFn = match reset_src {
        Some(src) => {
            let mut runtime = ScriptRuntime::new();
            Box::new(move |state, outputs| runtime.eval_reset_with_outputs(&src, state, outputs))
        }
        None => noop_reset(),
    };
    let step_fn: StepFn = match step_src {
        Some(src) => {
            let mut runtime = ScriptRuntime::new();
            Box::new(move |inputs, state, outputs| runtime.eval_step(&src, inputs, state, outputs))
        }
        None => noop_step(),
    };
    Ok(LoadedFunctionality { reset_fn, step_fn })
}

/// A `coro` factory has no direct Rust analogue (Rhai has no generator
/// support) — the original coroutine is synthesised here as one script
/// body invoked twice with a different `phase` binding: `"reset"` once at
/// startup, `"step"` on every subsequent tick, letting the script
/// maintain its own position in `state` the way a generator would
/// maintain it in locals. Recorded as an Open Question resolution in
/// DESIGN.md.
fn load_coroutine(src: String) -> Result<LoadedFunctionality, ExecutionError> {
    let reset_src = src.clone();
    let mut reset_runtime = ScriptRuntime::new();
    let reset_fn: ResetFn = Box::new(move |state, outputs| {
        reset_runtime.eval_reset_with_outputs(&format!("let phase = \"reset\";\n{reset_src}"), state, outputs)
    });

    let step_src = src;
    let mut step_runtime = ScriptRuntime::new();
    let step_fn: StepFn = Box::new(move |inputs, state, outputs| {
        step_runtime.eval_step(&format!("let phase = \"step\";\n{step_src}"), inputs, state, outputs)
    });

    Ok(LoadedFunctionality { reset_fn, step_fn })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_script_functionality_defaults_to_noop() {
        let functionality = Functionality::Script {
            reset_src: None,
            step_src: None,
            coro_src: None,
        };
        let registry = ModuleRegistry::new();
        let mut loaded = load(&NodeId::new("n"), &functionality, &None, &registry).unwrap();

        let mut state = Buffer::I64(5);
        let mut outputs = IndexMap::new();
        let inputs = IndexMap::new();

        assert!((loaded.reset_fn)(&mut state, &mut outputs).unwrap().is_none());
        assert!((loaded.step_fn)(&inputs, &mut state, &mut outputs).unwrap().is_none());
        assert_eq!(state, Buffer::I64(5));
    }

    #[test]
    fn unregistered_module_is_a_functionality_load_error() {
        let functionality = Functionality::Module { module: "missing::mod".to_string() };
        let registry = ModuleRegistry::new();
        let err = load(&NodeId::new("n"), &functionality, &None, &registry).unwrap_err();
        assert!(matches!(err, ExecutionError::FunctionalityLoadFailed { .. }));
    }

    #[test]
    fn registered_module_factory_is_invoked() {
        let mut registry = ModuleRegistry::new();
        registry.register("demo::counter", |_config| {
            Ok(LoadedFunctionality {
                reset_fn: Box::new(|state, _outputs| {
                    *state = Buffer::I64(0);
                    Ok(None)
                }),
                step_fn: Box::new(|_inputs, state, _outputs| {
                    if let Buffer::I64(v) = state {
                        *v += 1;
                    }
                    Ok(None)
                }),
            })
        });

        let functionality = Functionality::Module { module: "demo::counter".to_string() };
        let mut loaded = load(&NodeId::new("n"), &functionality, &None, &registry).unwrap();
        let mut state = Buffer::I64(99);
        let mut outputs = IndexMap::new();
        let inputs = IndexMap::new();

        (loaded.reset_fn)(&mut state, &mut outputs).unwrap();
        (loaded.step_fn)(&inputs, &mut state, &mut outputs).unwrap();
        assert_eq!(state, Buffer::I64(1));
    }
}
