//! End-to-end scenarios from spec §8, driven through the same public
//! surface a real caller uses (`SystemStartArgs` + `Orchestrator::system_start`),
//! with `is_local` forced so everything runs in this test process.

use serde_json::json;
use xact_cli::cli::SystemStartArgs;
use xact_cli::orchestrator::Orchestrator;
use xact_core::cfg;
use xact_core::denormalize::denormalize;
use xact_core::{HostAgent, ModuleRegistry};
use xact_types::HostId;

fn start_args(cfg: serde_json::Value) -> SystemStartArgs {
    SystemStartArgs {
        cfg_path: None,
        cfg: Some(serde_json::to_string(&cfg).unwrap()),
        makeready: false,
        no_makeready: false,
        distribute: false,
        no_distribute: false,
        cfg_addr_delim: ".".to_string(),
        cfg_override: Vec::new(),
    }
}

fn base_system(nodes: serde_json::Value, edges: serde_json::Value) -> serde_json::Value {
    json!({
        "system": {"id_system": "e2e"},
        "host": {"h1": {"hostname": "localhost"}},
        "process": {"p1": {"host": "h1"}},
        "node": nodes,
        "data": {
            "counter": {"alias": "int64"},
            "flag": {"alias": "bool"},
        },
        "edge": edges,
        "runtime": {"opt": {"is_local": true}},
    })
}

/// Scenario 1: single-process counter. `a` increments `state.count` each
/// step and writes `outputs.count`; `b` halts with code 0 once it observes
/// `inputs.count >= 10`.
#[test]
fn single_process_counter_halts_clean() {
    let cfg = base_system(
        json!({
            "a": {
                "process": "p1",
                "state_type": "counter",
                "functionality": {"script": {
                    "reset_src": "state = 0;",
                    "step_src": "state = state + 1; outputs.count = state;",
                }},
            },
            "b": {
                "process": "p1",
                "functionality": {"script": {
                    "step_src": "if inputs.count >= 10 { signal_halt(0); }",
                }},
            },
        }),
        json!([
            {"owner": "a", "data": "counter", "src": "a.outputs.count", "dst": "b.inputs.count", "dirn": "feedforward"},
        ]),
    );

    let exit_code = Orchestrator::system_start(&start_args(cfg), ModuleRegistry::new());
    assert_eq!(exit_code, 0);
}

/// Scenario 2: dual-process counter. Same nodes as scenario 1 but `a` is
/// on process `p1` and `b` is on process `p2`, both on host `h1`, so the
/// edge between them is `inter_process` (a bounded `crossbeam-channel`
/// FIFO) rather than an aliased intra-process buffer. Driven directly
/// through `cfg::prepare` + `HostAgent::start` (bypassing the `is_local`
/// orchestrator path, which collapses every node onto one process) so the
/// two processes genuinely run as two threads wired by a real queue.
#[test]
fn dual_process_counter_halts_clean_on_both_processes() {
    let raw = json!({
        "system": {"id_system": "e2e-dual"},
        "host": {"h1": {"hostname": "localhost"}},
        "process": {"p1": {"host": "h1"}, "p2": {"host": "h1"}},
        "node": {
            "a": {
                "process": "p1",
                "state_type": "counter",
                "functionality": {"script": {
                    "reset_src": "state = 0;",
                    "step_src": "state = state + 1; outputs.count = state; if state >= 10 { signal_halt(0); }",
                }},
            },
            "b": {
                "process": "p2",
                "functionality": {"script": {
                    "step_src": "if inputs.count >= 10 { signal_halt(0); }",
                }},
            },
        },
        "data": {"counter": {"alias": "int64"}},
        "edge": [
            {"owner": "a", "data": "counter", "src": "a.outputs.count", "dst": "b.inputs.count", "dirn": "feedforward"},
        ],
    });

    let cfg = cfg::prepare(vec![raw], &[], ".").unwrap();
    let cfg = denormalize(cfg).unwrap();
    let exit_code = HostAgent::start(cfg, HostId::new("h1"), ModuleRegistry::new()).unwrap();
    assert_eq!(exit_code, 0);
}

/// Scenario 3: the same behaviour expressed as a coroutine — one script
/// body, dispatched on `phase` instead of split `reset_src`/`step_src`.
#[test]
fn coroutine_form_matches_step_form_outcome() {
    let cfg = base_system(
        json!({
            "a": {
                "process": "p1",
                "state_type": "counter",
                "functionality": {"script": {
                    "coro_src": "if phase == \"reset\" { state = 0; } else { state = state + 1; outputs.count = state; }",
                }},
            },
            "b": {
                "process": "p1",
                "functionality": {"script": {
                    "step_src": "if inputs.count >= 10 { signal_halt(0); }",
                }},
            },
        }),
        json!([
            {"owner": "a", "data": "counter", "src": "a.outputs.count", "dst": "b.inputs.count", "dirn": "feedforward"},
        ]),
    );

    let exit_code = Orchestrator::system_start(&start_args(cfg), ModuleRegistry::new());
    assert_eq!(exit_code, 0);
}

/// Scenario 4: feedback loop. `b` emits `do_halt = (count >= 10)` back to
/// `a` over a feedback edge; `a` halts once it observes `do_halt`. The
/// feedback edge is excluded from the scheduler's tranche order, so `a`
/// always runs before `b` within a step and sees `b`'s *previous* output.
#[test]
fn feedback_loop_halts_after_eleven_a_steps() {
    let cfg = base_system(
        json!({
            "a": {
                "process": "p1",
                "state_type": "counter",
                "functionality": {"script": {
                    "reset_src": "state = 0;",
                    "step_src": "if inputs.do_halt { signal_halt(0); } else { state = state + 1; outputs.count = state; }",
                }},
            },
            "b": {
                "process": "p1",
                "functionality": {"script": {
                    "step_src": "outputs.do_halt = inputs.count >= 10;",
                }},
            },
        }),
        json!([
            {"owner": "a", "data": "counter", "src": "a.outputs.count", "dst": "b.inputs.count", "dirn": "feedforward"},
            {"owner": "b", "data": "flag", "src": "b.outputs.do_halt", "dst": "a.inputs.do_halt", "dirn": "feedback"},
        ]),
    );

    let exit_code = Orchestrator::system_start(&start_args(cfg), ModuleRegistry::new());
    assert_eq!(exit_code, 0);
}

/// Scenario 5: invalid module reference. Expected: non-zero exit.
#[test]
fn invalid_module_reference_is_a_non_zero_exit() {
    let cfg = base_system(
        json!({
            "a": {
                "process": "p1",
                "functionality": {"module": {"module": "no_such::module"}},
            },
        }),
        json!([]),
    );

    let exit_code = Orchestrator::system_start(&start_args(cfg), ModuleRegistry::new());
    assert_ne!(exit_code, 0);
}

/// Scenario 6: repeated edge source. Expected: `CfgError` from validation,
/// exit 1, caught before the host agent ever starts.
#[test]
fn repeated_edge_source_is_rejected_at_prepare_time() {
    let cfg = base_system(
        json!({
            "a": {"process": "p1", "functionality": {"script": {}}},
            "b": {"process": "p1", "functionality": {"script": {}}},
            "c": {"process": "p1", "functionality": {"script": {}}},
        }),
        json!([
            {"owner": "a", "data": "counter", "src": "a.outputs.x", "dst": "b.inputs.x", "dirn": "feedforward"},
            {"owner": "a", "data": "counter", "src": "a.outputs.x", "dst": "c.inputs.x", "dirn": "feedforward"},
        ]),
    );

    let exit_code = Orchestrator::system_start(&start_args(cfg), ModuleRegistry::new());
    assert_eq!(exit_code, 1);
}
