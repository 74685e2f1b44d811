//! Address/value config override application (§4.A, §12; grounded on
//! `xact.cfg.override`/`xact.cfg.util`).
//!
//! `CFG_OVERRIDE` on the CLI is a flat sequence of alternating address and
//! value tokens:
//!
//! ```text
//! xact system start host.h1.hostname foo.example.com node.a.config.rate 10
//! ```
//!
//! Each address is a delimiter-separated path into the merged config
//! mapping (the delimiter defaults to `.` but is itself configurable via
//! `--cfg-addr-delim`, since `.` also appears inside `id_edge`-style keys).

use serde_json::Value;
use xact_types::CfgError;

/// Apply a sequence of `(address, value)` pairs to `cfg` in order.
/// Associative under the documented delimiter (§8): applying overrides one
/// at a time, or folding them into the initial merge set, yields the same
/// result, because each override only ever touches one address and later
/// overrides take precedence the same way later merge sources do.
pub fn apply_all(mut cfg: Value, overrides: &[(String, String)], delim: &str) -> Result<Value, CfgError> {
    for (address, value) in overrides {
        cfg = apply_one(cfg, address, value, delim)?;
    }
    Ok(cfg)
}

fn apply_one(mut cfg: Value, address: &str, value: &str, delim: &str) -> Result<Value, CfgError> {
    let parts: Vec<&str> = if delim.is_empty() {
        vec![address]
    } else {
        address.split(delim).collect()
    };
    if parts.is_empty() || parts.iter().any(|p| p.is_empty()) {
        return Err(CfgError::Override {
            address: address.to_string(),
            reason: "address must be a non-empty, delimiter-separated path".to_string(),
        });
    }

    let leaf_value = parse_scalar(value);
    set_path(&mut cfg, &parts, leaf_value).map_err(|reason| CfgError::Override {
        address: address.to_string(),
        reason,
    })?;
    Ok(cfg)
}

fn parse_scalar(raw: &str) -> Value {
    if let Ok(b) = raw.parse::<bool>() {
        return Value::Bool(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::from(f);
    }
    Value::String(raw.to_string())
}

fn set_path(root: &mut Value, parts: &[&str], value: Value) -> Result<(), String> {
    let mut cursor = root;
    for (idx, part) in parts.iter().enumerate() {
        let is_last = idx == parts.len() - 1;
        if !cursor.is_object() {
            *cursor = Value::Object(Default::default());
        }
        let map = cursor.as_object_mut().expect("just coerced to object");

        if is_last {
            map.insert((*part).to_string(), value);
            return Ok(());
        }

        cursor = map
            .entry((*part).to_string())
            .or_insert_with(|| Value::Object(Default::default()));
    }
    Err("empty address".to_string())
}
