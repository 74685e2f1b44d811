//! Load mapping files with suffix `.cfg.{yaml,json,toml}` from a directory
//! (§12, grounded on `xact.cfg.load` in the original Python source).
//!
//! Files are loaded in ascending order of prefix length — the shortest,
//! widest-scope prefix (e.g. `root.cfg.yaml`) loads before a more specific
//! one (e.g. `root.host.cfg.yaml`) — so later, narrower files override
//! earlier, broader ones during the merge.

use super::merge::merge_json;
use serde_json::Value;
use std::path::{Path, PathBuf};
use xact_types::CfgError;

const SUFFIXES: &[&str] = &["cfg.yaml", "cfg.json", "cfg.toml"];

fn matching_prefix_len(filename: &str) -> Option<usize> {
    for suffix in SUFFIXES {
        if let Some(stripped) = filename.strip_suffix(suffix) {
            if stripped.ends_with('.') || stripped.is_empty() {
                return Some(stripped.len());
            }
        }
    }
    None
}

/// Discover and load every `*.cfg.{yaml,json,toml}` file directly under
/// `dir`, merging them in shortest-prefix-first order. Returns an empty
/// JSON object if the directory contains no matching files.
pub fn load_dir(dir: &Path) -> Result<Value, CfgError> {
    let mut candidates: Vec<(usize, PathBuf)> = Vec::new();
    let entries = std::fs::read_dir(dir)
        .map_err(|e| CfgError::Parse(format!("cannot read cfg dir {}: {e}", dir.display())))?;

    for entry in entries {
        let entry = entry.map_err(|e| CfgError::Parse(e.to_string()))?;
        let path = entry.path();
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(prefix_len) = matching_prefix_len(filename) {
            candidates.push((prefix_len, path));
        }
    }

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let mut merged = Value::Object(Default::default());
    for (_, path) in candidates {
        let loaded = load_file(&path)?;
        merged = merge_json(merged, loaded);
    }
    Ok(merged)
}

pub fn load_file(path: &Path) -> Result<Value, CfgError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CfgError::Parse(format!("cannot read {}: {e}", path.display())))?;
    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if filename.ends_with("yaml") || filename.ends_with("yml") {
        serde_yaml::from_str::<Value>(&text)
            .map_err(|e| CfgError::Parse(format!("{}: {e}", path.display())))
    } else if filename.ends_with("json") {
        serde_json::from_str::<Value>(&text)
            .map_err(|e| CfgError::Parse(format!("{}: {e}", path.display())))
    } else if filename.ends_with("toml") {
        let toml_value: toml::Value = toml::from_str(&text)
            .map_err(|e| CfgError::Parse(format!("{}: {e}", path.display())))?;
        Ok(toml_to_json(toml_value))
    } else {
        Err(CfgError::Parse(format!(
            "unsupported config file suffix: {}",
            path.display()
        )))
    }
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}
