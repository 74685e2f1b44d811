//! Topological `{placeholder}`-style string interpolation over the raw
//! config tree (§12; grounded on `xact.util.format_all_strings` /
//! `walkobj` / `is_format_string` / `topological_sort`).
//!
//! Config values may reference other addresses in the same tree, e.g.
//! `"log_dir": "{host.h1.venv_path}/logs"`. Every such string is resolved
//! before the tree is deserialized into [`Config`], so that by the time
//! typed values exist, nothing downstream has to know interpolation ever
//! happened. References are sequenced in dependency order so that a
//! two-hop chain (`a` references `b` which references `c`) resolves in one
//! pass; a reference cycle is reported rather than silently truncated.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use xact_types::CfgError;

/// `true` if `s` contains at least one `{...}` placeholder.
fn is_format_string(s: &str) -> bool {
    s.contains('{') && s.contains('}')
}

/// Walk every string leaf in `root`, recording its address (a `.`-joined
/// path) and, for format strings, the set of addresses it references.
fn walk_strings(root: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    walk_strings_inner(root, &mut String::new(), &mut out);
    out
}

fn walk_strings_inner(value: &Value, prefix: &mut String, out: &mut Vec<(String, String)>) {
    match value {
        Value::String(s) => out.push((prefix.clone(), s.clone())),
        Value::Object(map) => {
            for (key, child) in map {
                let len = prefix.len();
                if !prefix.is_empty() {
                    prefix.push('.');
                }
                prefix.push_str(key);
                walk_strings_inner(child, prefix, out);
                prefix.truncate(len);
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                let len = prefix.len();
                if !prefix.is_empty() {
                    prefix.push('.');
                }
                prefix.push_str(&idx.to_string());
                walk_strings_inner(child, prefix, out);
                prefix.truncate(len);
            }
        }
        _ => {}
    }
}

fn referenced_addresses(s: &str) -> Vec<String> {
    let mut refs = Vec::new();
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '{' {
            if let Some(end) = s[i + 1..].find('}') {
                refs.push(s[i + 1..i + 1 + end].to_string());
            }
        }
    }
    refs
}

fn get_by_address<'a>(root: &'a Value, address: &str) -> Option<&'a Value> {
    let mut cursor = root;
    for part in address.split('.') {
        cursor = match cursor {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cursor)
}

fn set_by_address(root: &mut Value, address: &str, value: Value) {
    let parts: Vec<&str> = address.split('.').collect();
    let mut cursor = root;
    for part in &parts[..parts.len() - 1] {
        cursor = match cursor {
            Value::Object(map) => map.get_mut(*part).expect("path segment must exist from walk"),
            Value::Array(items) => {
                let idx: usize = part.parse().expect("numeric index from walk");
                items.get_mut(idx).expect("index in range from walk")
            }
            _ => unreachable!("non-container at intermediate path segment"),
        };
    }
    let last = parts[parts.len() - 1];
    match cursor {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
        }
        Value::Array(items) => {
            let idx: usize = last.parse().expect("numeric index from walk");
            items[idx] = value;
        }
        _ => unreachable!("non-container at leaf path segment"),
    }
}

fn render(template: &str, root: &Value) -> Result<String, CfgError> {
    let mut out = String::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            CfgError::other(format!("unterminated format placeholder in '{template}'"))
        })?;
        let address = &after[..end];
        let value = get_by_address(root, address)
            .ok_or_else(|| CfgError::other(format!("format string references unknown address '{address}'")))?;
        match value {
            Value::String(s) => out.push_str(s),
            other => out.push_str(&other.to_string()),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Resolve every `{address}` placeholder in `cfg` in dependency order
/// (leaves first), mutating string values in place. Returns
/// [`CfgError::Other`] if two format strings reference each other in a
/// cycle.
pub fn format_all_strings(mut cfg: Value) -> Result<Value, CfgError> {
    let format_strings: Vec<(String, String)> = walk_strings(&cfg)
        .into_iter()
        .filter(|(_, s)| is_format_string(s))
        .collect();

    if format_strings.is_empty() {
        return Ok(cfg);
    }

    let mut deps: HashMap<String, HashSet<String>> = HashMap::new();
    for (address, template) in &format_strings {
        deps.insert(address.clone(), referenced_addresses(template).into_iter().collect());
    }

    let order = topo_order(&deps)?;

    for address in order {
        let Some(template) = format_strings
            .iter()
            .find(|(a, _)| a == &address)
            .map(|(_, t)| t.clone())
        else {
            continue;
        };
        let rendered = render(&template, &cfg)?;
        set_by_address(&mut cfg, &address, Value::String(rendered));
    }

    Ok(cfg)
}

/// Kahn-style topological sort (mirrors `xact.util.topological_sort`, here
/// flattened to a total order since within-tranche order doesn't matter
/// for string rendering).
fn topo_order(deps: &HashMap<String, HashSet<String>>) -> Result<Vec<String>, CfgError> {
    let mut remaining = deps.clone();
    let mut order = Vec::new();

    while !remaining.is_empty() {
        let ready: Vec<String> = remaining
            .iter()
            .filter(|(_, refs)| refs.iter().all(|r| !remaining.contains_key(r)))
            .map(|(k, _)| k.clone())
            .collect();

        if ready.is_empty() {
            return Err(CfgError::other("cyclic format-string references in config"));
        }

        let mut ready = ready;
        ready.sort();
        for key in ready {
            remaining.remove(&key);
            order.push(key);
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_simple_reference() {
        let cfg = json!({"host": {"h1": {"venv_path": "/opt/xact", "log_dir": "{host.h1.venv_path}/logs"}}});
        let out = format_all_strings(cfg).unwrap();
        assert_eq!(out["host"]["h1"]["log_dir"], "/opt/xact/logs");
    }

    #[test]
    fn resolves_multi_hop_chain() {
        let cfg = json!({
            "a": "base",
            "b": "{a}/mid",
            "c": "{b}/leaf",
        });
        let out = format_all_strings(cfg).unwrap();
        assert_eq!(out["c"], "base/mid/leaf");
    }

    #[test]
    fn detects_reference_cycles() {
        let cfg = json!({"a": "{b}", "b": "{a}"});
        let err = format_all_strings(cfg).unwrap_err();
        assert!(matches!(err, CfgError::Other(_)));
    }

    #[test]
    fn leaves_plain_strings_untouched() {
        let cfg = json!({"hostname": "plain.example.com"});
        let out = format_all_strings(cfg.clone()).unwrap();
        assert_eq!(out, cfg);
    }
}
