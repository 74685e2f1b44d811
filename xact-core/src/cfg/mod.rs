//! Config pipeline: merge raw sources, apply overrides, interpolate
//! format strings, deserialize into [`Config`], then validate (§4.A).
//!
//! This module only produces a *normalized* config — denormalisation
//! (§4.B) is [`crate::denormalize::denormalize`], run separately so that
//! `prepare` stays testable without also exercising host/edge resolution.

pub mod builder;
pub mod format_strings;
pub mod load;
pub mod merge;
pub mod r#override;
pub mod validate;

use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use xact_types::{CfgError, Config};

/// One raw config source plus the precedence it merges at; later entries
/// in the caller's `Vec` win over earlier ones, matching `load_dir`'s
/// shortest-prefix-first convention one level up.
pub fn prepare(
    sources: Vec<Value>,
    overrides: &[(String, String)],
    override_delim: &str,
) -> Result<Config, CfgError> {
    let merged = sources
        .into_iter()
        .fold(Value::Object(Default::default()), merge::merge_json);

    let overridden = r#override::apply_all(merged, overrides, override_delim)?;
    let formatted = format_strings::format_all_strings(overridden)?;

    let mut cfg: Config = serde_json::from_value(formatted)
        .map_err(|e| CfgError::Parse(format!("config does not match expected schema: {e}")))?;

    for edge in cfg.edge.iter_mut() {
        edge.derive_paths().map_err(CfgError::MalformedEdgePath)?;
    }

    validate::check_consistency(&cfg)?;

    cfg.runtime.id.id_cfg = Some(stable_id_cfg(&cfg));
    Ok(cfg)
}

/// A deterministic, content-derived identifier for a normalized config
/// (§3, "Lifecycle": `id_cfg` "identifies this particular configuration").
/// Stamped once at `prepare` time and carried unchanged through
/// denormalisation and every run stamped from it.
fn stable_id_cfg(cfg: &Config) -> String {
    let canonical = serde_json::to_string(cfg).unwrap_or_default();
    let mut hasher = DefaultHasher::new();
    canonical.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_cfg() -> Value {
        json!({
            "system": {"id_system": "sys"},
            "host": {"h1": {"hostname": "localhost"}},
            "process": {"p1": {"host": "h1"}},
            "node": {
                "a": {"process": "p1", "functionality": {"module": {"module": "demo::a"}}},
                "b": {"process": "p1", "functionality": {"module": {"module": "demo::b"}}},
            },
            "data": {"counter": {"alias": "int64"}},
            "edge": [
                {"owner": "a", "data": "counter", "src": "a.outputs.count", "dst": "b.inputs.count", "dirn": "feedforward"}
            ],
        })
    }

    #[test]
    fn prepares_a_well_formed_config() {
        let cfg = prepare(vec![base_cfg()], &[], ".").unwrap();
        assert_eq!(cfg.node.len(), 2);
        assert!(cfg.runtime.id.id_cfg.is_some());
    }

    #[test]
    fn id_cfg_is_stable_for_identical_input() {
        let a = prepare(vec![base_cfg()], &[], ".").unwrap();
        let b = prepare(vec![base_cfg()], &[], ".").unwrap();
        assert_eq!(a.runtime.id.id_cfg, b.runtime.id.id_cfg);
    }

    #[test]
    fn id_cfg_changes_when_content_changes() {
        let a = prepare(vec![base_cfg()], &[], ".").unwrap();
        let b = prepare(
            vec![base_cfg()],
            &[("host.h1.hostname".to_string(), "elsewhere".to_string())],
            ".",
        )
        .unwrap();
        assert_ne!(a.runtime.id.id_cfg, b.runtime.id.id_cfg);
    }

    #[test]
    fn rejects_dangling_process_reference() {
        let mut cfg = base_cfg();
        cfg["node"]["a"]["process"] = json!("ghost");
        let err = prepare(vec![cfg], &[], ".").unwrap_err();
        assert!(matches!(err, CfgError::UnknownProcess(_)));
    }

    #[test]
    fn later_sources_override_earlier_ones() {
        let base = base_cfg();
        let override_source = json!({"host": {"h1": {"hostname": "second.example.com"}}});
        let cfg = prepare(vec![base, override_source], &[], ".").unwrap();
        assert_eq!(cfg.host["h1"].hostname, "second.example.com");
    }
}
