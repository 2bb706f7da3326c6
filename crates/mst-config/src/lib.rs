//! Layered YAML configuration loading, canonical hashing, and typed
//! accessors over the merged JSON document. Secret resolution lives in
//! [`secrets`].

pub mod secrets;

use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_json: Value,
    pub canonical_json: String,
    pub config_hash: String,
}

/// Load and deep-merge YAML files in order (later files win on scalar
/// conflict; objects merge key-by-key; arrays are replaced wholesale), then
/// canonicalize (recursively sort object keys) and hash the result.
pub fn load_layered_yaml(paths: &[impl AsRef<Path>]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());

    for p in paths {
        let p = p.as_ref();
        let s = fs::read_to_string(p)
            .with_context(|| format!("read config: {}", p.display()))?;
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(&s).with_context(|| format!("parse yaml: {}", p.display()))?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }

    let canonical = canonicalize_json(&merged);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let hash = hex::encode(hasher.finalize());

    Ok(LoadedConfig {
        config_json: serde_json::from_str(&canonical).context("canonical json parse failed")?,
        canonical_json: canonical,
        config_hash: hash,
    })
}

fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

fn canonicalize_json(v: &Value) -> String {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).expect("json serialization must not fail")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// Typed accessors over a JSON-pointer path into the merged config. Each
/// takes an explicit default because nearly every config key in this
/// workspace is optional with a documented fallback (see SPEC_FULL §4.0).
pub fn cfg_bool(v: &Value, ptr: &str, default: bool) -> bool {
    v.pointer(ptr).and_then(|x| x.as_bool()).unwrap_or(default)
}

pub fn cfg_f64(v: &Value, ptr: &str, default: f64) -> f64 {
    v.pointer(ptr).and_then(|x| x.as_f64()).unwrap_or(default)
}

pub fn cfg_i64(v: &Value, ptr: &str, default: i64) -> i64 {
    v.pointer(ptr).and_then(|x| x.as_i64()).unwrap_or(default)
}

pub fn cfg_str<'a>(v: &'a Value, ptr: &str, default: &'a str) -> &'a str {
    v.pointer(ptr).and_then(|x| x.as_str()).unwrap_or(default)
}

pub fn cfg_str_opt<'a>(v: &'a Value, ptr: &str) -> Option<&'a str> {
    v.pointer(ptr).and_then(|x| x.as_str())
}

pub fn cfg_str_list(v: &Value, ptr: &str) -> Vec<String> {
    v.pointer(ptr)
        .and_then(|x| x.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|e| e.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_merge_objects_merge_key_by_key() {
        let mut a = serde_json::json!({"risk": {"max": 1, "min": 0}});
        let b = serde_json::json!({"risk": {"max": 2}});
        deep_merge(&mut a, b);
        assert_eq!(a, serde_json::json!({"risk": {"max": 2, "min": 0}}));
    }

    #[test]
    fn canonicalize_is_stable_under_key_reordering() {
        let a = serde_json::json!({"b": 1, "a": 2});
        let b = serde_json::json!({"a": 2, "b": 1});
        assert_eq!(canonicalize_json(&a), canonicalize_json(&b));
    }
}
