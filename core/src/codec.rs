//! Text form of the parameter tree.
//!
//! Trees are stored as YAML. A mapping holding `:value` is a leaf with
//! metadata, any other mapping is a group, and plain scalars are bare leaves:
//!
//! ```yaml
//! global:
//!   grpc_timeout:
//!     :value: 15.0
//!     :min: 0
//!     :default: 15.0
//!     :hint: timeout for connection to remote gRPC-server
//!   reset: false
//! ```
//!
//! Loading never fails outright: a missing or malformed file yields the
//! caller's fallback tree.
//!
//! Update payloads are not decoded into a tree. [`decode_payload`] only checks
//! that the text is YAML; the merge judges each field on its own.

use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::error::StoreError;
use crate::tree::node::{
    is_marker, Group, LeafMeta, Node, ParameterTree, Scalar, DEFAULT, HINT, MAX, MIN, READONLY,
    VALUE,
};


// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Parse YAML text into a tree. The document root must be a mapping.
pub fn decode(text: &str) -> Result<ParameterTree, StoreError> {
    let value: Value = serde_yaml::from_str(text)?;
    match value {
        Value::Mapping(ref map) => Ok(ParameterTree::from_root(decode_group(map, "")?)),
        other => Err(StoreError::Parse(format!(
            "document root must be a mapping, found {}",
            type_name(&other)
        ))),
    }
}

/// Parse an update payload. Blank text is an empty (null) document; only
/// text that is not YAML at all is an error.
pub fn decode_payload(text: &str) -> Result<Value, StoreError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_yaml::from_str(text)?)
}

/// Parse a single YAML scalar literal such as `20.0`, `true` or `eth0`.
///
/// Empty input is the empty string.
pub fn parse_scalar(text: &str) -> Result<Scalar, StoreError> {
    if text.trim().is_empty() {
        return Ok(Scalar::Str(String::new()));
    }
    let value: Value = serde_yaml::from_str(text)?;
    decode_scalar(&value, "<literal>")
}

fn decode_node(value: &Value, path: &str) -> Result<Node, StoreError> {
    match value {
        Value::Mapping(map) if map.contains_key(VALUE) => Ok(Node::Leaf(decode_leaf(map, path)?)),
        Value::Mapping(map) => Ok(Node::Group(decode_group(map, path)?)),
        other => Ok(Node::Bare(decode_scalar(other, path)?)),
    }
}

fn decode_group(map: &Mapping, path: &str) -> Result<Group, StoreError> {
    let mut group = Group::new();
    for (k, v) in map {
        let key = decode_key(k, path)?;
        if key == READONLY {
            group.readonly = decode_bool(v, &join(path, &key))?;
        } else if is_marker(&key) {
            return Err(StoreError::Parse(format!(
                "{}: marker '{}' is only valid next to '{}'",
                display_path(path),
                key,
                VALUE
            )));
        } else {
            let child_path = join(path, &key);
            let child = decode_node(v, &child_path)?;
            group.children.insert(key, child);
        }
    }
    Ok(group)
}

fn decode_leaf(map: &Mapping, path: &str) -> Result<LeafMeta, StoreError> {
    let mut value = None;
    let mut meta = LeafMeta::new(false);
    for (k, v) in map {
        let key = decode_key(k, path)?;
        let field_path = join(path, &key);
        match key.as_str() {
            VALUE => value = Some(decode_scalar(v, &field_path)?),
            MIN => meta.min = Some(decode_scalar(v, &field_path)?),
            MAX => meta.max = Some(decode_scalar(v, &field_path)?),
            DEFAULT => meta.default = Some(decode_scalar(v, &field_path)?),
            HINT => match v {
                Value::String(s) => meta.hint = Some(s.clone()),
                other => {
                    return Err(StoreError::Parse(format!(
                        "{}: expected string, found {}",
                        field_path,
                        type_name(other)
                    )))
                }
            },
            READONLY => meta.readonly = decode_bool(v, &field_path)?,
            _ => {
                return Err(StoreError::Parse(format!(
                    "{}: unexpected key '{}' in parameter",
                    display_path(path),
                    key
                )))
            }
        }
    }
    // decode_node only routes mappings holding VALUE here
    meta.value = value.ok_or_else(|| {
        StoreError::Parse(format!("{}: missing '{}'", display_path(path), VALUE))
    })?;
    Ok(meta)
}

pub(crate) fn decode_scalar(value: &Value, path: &str) -> Result<Scalar, StoreError> {
    match value {
        Value::Bool(b) => Ok(Scalar::Bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Scalar::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Scalar::Float(f))
            } else {
                Err(StoreError::Parse(format!("{}: unsupported number {}", path, n)))
            }
        }
        Value::String(s) => Ok(Scalar::Str(s.clone())),
        other => Err(StoreError::Parse(format!(
            "{}: expected a scalar, found {}",
            display_path(path),
            type_name(other)
        ))),
    }
}

fn decode_bool(value: &Value, path: &str) -> Result<bool, StoreError> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(StoreError::Parse(format!(
            "{}: expected bool, found {}",
            path,
            type_name(other)
        ))),
    }
}

/// Mapping keys must be scalars; numbers and bools are stringified.
pub(crate) fn decode_key(key: &Value, path: &str) -> Result<String, StoreError> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(StoreError::Parse(format!(
            "{}: unsupported key type {}",
            display_path(path),
            type_name(other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", parent, key)
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}


// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Serialize a tree to YAML with sorted group keys.
pub fn encode(tree: &ParameterTree) -> Result<String, StoreError> {
    Ok(serde_yaml::to_string(tree)?)
}

/// The tree as a YAML value, in the same shape [`encode`] writes.
pub fn to_value(tree: &ParameterTree) -> Value {
    group_value(tree.root())
}

pub(crate) fn node_value(node: &Node) -> Value {
    match node {
        Node::Group(g) => group_value(g),
        Node::Leaf(meta) => {
            let mut map = Mapping::new();
            map.insert(VALUE.into(), scalar_value(&meta.value));
            let optional = [(MIN, &meta.min), (MAX, &meta.max), (DEFAULT, &meta.default)];
            for (marker, field) in optional {
                if let Some(v) = field {
                    map.insert(marker.into(), scalar_value(v));
                }
            }
            if let Some(ref hint) = meta.hint {
                map.insert(HINT.into(), Value::String(hint.clone()));
            }
            if meta.readonly {
                map.insert(READONLY.into(), Value::Bool(true));
            }
            Value::Mapping(map)
        }
        Node::Bare(s) => scalar_value(s),
    }
}

fn group_value(group: &Group) -> Value {
    let mut map = Mapping::new();
    if group.readonly {
        map.insert(READONLY.into(), Value::Bool(true));
    }
    for (key, child) in &group.children {
        map.insert(Value::String(key.clone()), node_value(child));
    }
    Value::Mapping(map)
}

fn scalar_value(scalar: &Scalar) -> Value {
    match scalar {
        Scalar::Bool(b) => Value::Bool(*b),
        Scalar::Int(i) => Value::Number((*i).into()),
        Scalar::Float(f) => Value::Number((*f).into()),
        Scalar::Str(s) => Value::String(s.clone()),
    }
}

/// Pretty JSON rendering of a tree, for tooling that prefers JSON.
pub fn to_json(tree: &ParameterTree) -> Result<String, StoreError> {
    serde_json::to_string_pretty(tree).map_err(|e| StoreError::Parse(e.to_string()))
}


// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Read and decode a tree file.
pub fn read_file(path: &Path) -> Result<ParameterTree, StoreError> {
    let content = std::fs::read_to_string(path)?;
    decode(&content)
}

/// Read a tree file, substituting `fallback()` if it is missing or malformed.
pub fn load_or_default<F>(path: &Path, fallback: F) -> ParameterTree
where
    F: FnOnce() -> ParameterTree,
{
    match read_file(path) {
        Ok(tree) => {
            log::info!(target: "settings", "loaded configuration from {}", path.display());
            tree
        }
        Err(e) => {
            log::info!(
                target: "settings",
                "{}: {}: use default configuration",
                path.display(),
                e
            );
            fallback()
        }
    }
}

/// Encode and write a tree file.
pub fn save(tree: &ParameterTree, path: &Path) -> Result<(), StoreError> {
    let text = encode(tree)?;
    std::fs::write(path, text)?;
    log::debug!(target: "settings", "configuration saved to '{}'", path.display());
    Ok(())
}
