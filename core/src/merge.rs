//! Read-only aware merge of an incoming tree into the live tree.
//!
//! The walk follows the *current* tree. Keys that only exist in the incoming
//! data are ignored, so a merge can change values but never add or remove
//! parameters. Metadata (bounds, default, hint, read-only flag) always comes
//! from the current tree. A field that cannot be used keeps its old value and
//! the walk carries on with the next one.

use std::fmt;

use serde::Serialize;
use serde_yaml::Value;

use crate::codec;
use crate::tree::node::VALUE;
use crate::tree::{Group, LeafMeta, Node, ParameterTree, Scalar};


/// Why a field kept its current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetainReason {
    /// The incoming tree has nothing at this path.
    Missing,
    /// Incoming group where a leaf lives (or vice versa), or a scalar of a
    /// different kind.
    TypeMismatch,
    /// The current node is marked read-only.
    ReadOnly,
}

impl fmt::Display for RetainReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RetainReason::Missing => "missing",
            RetainReason::TypeMismatch => "type mismatch",
            RetainReason::ReadOnly => "read only",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Retained {
    pub path: String,
    pub reason: RetainReason,
}

/// Outcome of a merge: which values changed and which were kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub updated: Vec<String>,
    pub retained: Vec<Retained>,
}

impl MergeReport {
    /// True if no value changed.
    pub fn is_unchanged(&self) -> bool {
        self.updated.is_empty()
    }

    /// Paths retained for the given reason.
    pub fn retained_for(&self, reason: RetainReason) -> Vec<&str> {
        self.retained
            .iter()
            .filter(|r| r.reason == reason)
            .map(|r| r.path.as_str())
            .collect()
    }

    fn retain(&mut self, path: &str, reason: RetainReason) {
        log::debug!(target: "settings", "merge keeps old value of {} ({})", path, reason);
        self.retained.push(Retained { path: path.to_string(), reason });
    }
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} updated, {} retained", self.updated.len(), self.retained.len())?;
        for path in &self.updated {
            write!(f, "\n  updated  {}", path)?;
        }
        for r in self.retained.iter().filter(|r| r.reason != RetainReason::Missing) {
            write!(f, "\n  retained {} ({})", r.path, r.reason)?;
        }
        Ok(())
    }
}


/// Merge `incoming` into `current`, returning the merged tree and a report.
///
/// `current` is not modified; the caller decides whether to adopt the
/// result.
pub fn merge_trees(incoming: &ParameterTree, current: &ParameterTree) -> (ParameterTree, MergeReport) {
    merge_value(&codec::to_value(incoming), current)
}

/// Merge a raw YAML update payload into `current`.
///
/// Each field is judged on its own: a null, a sequence or a scalar of the
/// wrong kind keeps the old value of that field only. A scalar arriving where
/// `current` has a group is offered to every leaf below that group.
pub fn merge_value(incoming: &Value, current: &ParameterTree) -> (ParameterTree, MergeReport) {
    let mut report = MergeReport::default();
    let root = merge_group(current.root(), incoming, "", &mut report);
    (ParameterTree::from_root(root), report)
}

fn merge_group(current: &Group, incoming: &Value, path: &str, report: &mut MergeReport) -> Group {
    let mut merged = Group {
        children: Default::default(),
        readonly: current.readonly,
    };
    for (key, child) in &current.children {
        let child_path = join(path, key);
        let node = merge_node(child, incoming_child(incoming, key), &child_path, report);
        merged.children.insert(key.clone(), node);
    }
    merged
}

/// What the payload offers for `key` below `incoming`. A scalar stands for
/// every child; null means nothing was supplied.
fn incoming_child<'a>(incoming: &'a Value, key: &str) -> Option<&'a Value> {
    let found = match incoming {
        Value::Mapping(map) => map
            .iter()
            .find(|(k, _)| codec::decode_key(k, "").map_or(false, |k| k == key))
            .map(|(_, v)| v),
        Value::Null => None,
        other => Some(other),
    };
    found.filter(|v| !v.is_null())
}

fn merge_node(current: &Node, incoming: Option<&Value>, path: &str, report: &mut MergeReport) -> Node {
    let Some(incoming) = incoming else {
        report.retain(path, RetainReason::Missing);
        return current.clone();
    };

    match current {
        Node::Group(group) => {
            if group.readonly {
                if *incoming != codec::node_value(current) {
                    report.retain(path, RetainReason::ReadOnly);
                }
                return current.clone();
            }
            match incoming {
                Value::Mapping(_) | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                    Node::Group(merge_group(group, incoming, path, report))
                }
                _ => {
                    report.retain(path, RetainReason::TypeMismatch);
                    current.clone()
                }
            }
        }
        Node::Leaf(meta) => {
            if meta.readonly {
                if incoming_scalar(incoming).as_ref() != Some(&meta.value) {
                    report.retain(path, RetainReason::ReadOnly);
                }
                return current.clone();
            }
            match accept_value(&meta.value, incoming, path, report) {
                Some(value) => Node::Leaf(LeafMeta { value, ..meta.clone() }),
                None => current.clone(),
            }
        }
        Node::Bare(value) => match accept_value(value, incoming, path, report) {
            Some(value) => Node::Bare(value),
            None => current.clone(),
        },
    }
}

/// The scalar a payload node offers for a leaf: a plain scalar, or the
/// `:value` of a mapping. Other metadata in the payload is ignored.
fn incoming_scalar(incoming: &Value) -> Option<Scalar> {
    match incoming {
        Value::Mapping(map) => map.get(VALUE).and_then(|v| codec::decode_scalar(v, "").ok()),
        other => codec::decode_scalar(other, "").ok(),
    }
}

/// The incoming value for a leaf, if it is a scalar of a compatible kind.
fn accept_value(current: &Scalar, incoming: &Value, path: &str, report: &mut MergeReport) -> Option<Scalar> {
    let Some(new) = incoming_scalar(incoming) else {
        report.retain(path, RetainReason::TypeMismatch);
        return None;
    };
    if new.kind() != current.kind() {
        report.retain(path, RetainReason::TypeMismatch);
        return None;
    }
    if new != *current {
        report.updated.push(path.to_string());
    }
    Some(new)
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", parent, key)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::DefaultSchema;
    use std::path::PathBuf;

    fn current() -> ParameterTree {
        DefaultSchema {
            version: "1.0".into(),
            file: PathBuf::from("/tmp/settings.yaml"),
            log_dir: PathBuf::from("/tmp/log/"),
        }
        .build()
    }

    fn tree(root: Group) -> ParameterTree {
        ParameterTree::from_root(root)
    }

    #[test]
    fn bare_scalar_updates_meta_leaf_value() {
        let inc = tree(Group::new().with("global", Group::new().with("grpc_timeout", 99.0)));
        let (merged, report) = merge_trees(&inc, &current());
        match merged.resolve("global/grpc_timeout").unwrap() {
            Node::Leaf(meta) => {
                assert_eq!(meta.value, Scalar::Float(99.0));
                assert_eq!(meta.default, Some(Scalar::Float(15.0)));
                assert_eq!(meta.min, Some(Scalar::Int(0)));
            }
            other => panic!("expected leaf, got {:?}", other),
        }
        assert_eq!(report.updated, vec!["global/grpc_timeout"]);
    }

    #[test]
    fn other_parameters_keep_their_values() {
        let inc = tree(Group::new().with("global", Group::new().with("grpc_timeout", 99.0)));
        let cur = current();
        let (merged, _) = merge_trees(&inc, &cur);
        assert_eq!(
            merged.value("sysmon/CPU/load_warn_level"),
            cur.value("sysmon/CPU/load_warn_level")
        );
        assert_eq!(merged.resolve("sysmon").unwrap(), cur.resolve("sysmon").unwrap());
    }

    #[test]
    fn incoming_metadata_is_ignored() {
        let inc = tree(Group::new().with(
            "global",
            Group::new().with(
                "grpc_timeout",
                LeafMeta::new(5.0).with_min(10).with_hint("changed").read_only(),
            ),
        ));
        let (merged, _) = merge_trees(&inc, &current());
        match merged.resolve("global/grpc_timeout").unwrap() {
            Node::Leaf(meta) => {
                assert_eq!(meta.value, Scalar::Float(5.0));
                assert_eq!(meta.min, Some(Scalar::Int(0)));
                assert_eq!(meta.hint.as_deref(), Some("timeout for connection to remote gRPC-server"));
                assert!(!meta.readonly);
            }
            other => panic!("expected leaf, got {:?}", other),
        }
    }

    #[test]
    fn unknown_incoming_keys_are_ignored() {
        let inc = tree(
            Group::new()
                .with("global", Group::new().with("brand_new", 1))
                .with("extra", Group::new().with("x", 1)),
        );
        let cur = current();
        let (merged, report) = merge_trees(&inc, &cur);
        assert_eq!(merged, cur);
        assert!(report.is_unchanged());
    }

    #[test]
    fn read_only_leaf_is_never_changed() {
        let inc = tree(Group::new().with("global", Group::new().with("version", "hacked")));
        let (merged, report) = merge_trees(&inc, &current());
        assert_eq!(merged.value("global/version"), Some(&Scalar::from("1.0")));
        assert_eq!(report.retained_for(RetainReason::ReadOnly), vec!["global/version"]);
    }

    #[test]
    fn read_only_group_is_kept_whole() {
        let cur = tree(Group::new().with("locked", Group::new().with("x", 1).read_only()));
        let inc = tree(Group::new().with("locked", Group::new().with("x", 2)));
        let (merged, report) = merge_trees(&inc, &cur);
        assert_eq!(merged, cur);
        assert_eq!(report.retained_for(RetainReason::ReadOnly), vec!["locked"]);
    }

    #[test]
    fn writable_group_may_hold_read_only_leaf() {
        let cur = tree(Group::new().with(
            "g",
            Group::new().with("ro", LeafMeta::new(1).read_only()).with("rw", 1),
        ));
        let inc = tree(Group::new().with("g", Group::new().with("ro", 2).with("rw", 2)));
        let (merged, _) = merge_trees(&inc, &cur);
        assert_eq!(merged.value("g/ro"), Some(&Scalar::Int(1)));
        assert_eq!(merged.value("g/rw"), Some(&Scalar::Int(2)));
    }

    #[test]
    fn type_mismatch_keeps_old_value_and_continues() {
        let inc = tree(Group::new().with(
            "global",
            Group::new()
                .with("grpc_timeout", "soon")
                .with("reset", Group::new().with("x", 1))
                .with("only_diagnostics_agg", true),
        ));
        let (merged, report) = merge_trees(&inc, &current());
        assert_eq!(merged.value("global/grpc_timeout"), Some(&Scalar::Float(15.0)));
        assert_eq!(merged.value("global/reset"), Some(&Scalar::Bool(false)));
        assert_eq!(merged.value("global/only_diagnostics_agg"), Some(&Scalar::Bool(true)));
        assert_eq!(
            report.retained_for(RetainReason::TypeMismatch),
            vec!["global/grpc_timeout", "global/reset"]
        );
    }

    #[test]
    fn scalar_in_place_of_group_reaches_its_leaves() {
        let cur = current();
        let inc = tree(Group::new().with("sysmon", Group::new().with("Network", 5)));
        let (merged, report) = merge_trees(&inc, &cur);
        assert_eq!(merged.value("sysmon/Network/load_warn_level"), Some(&Scalar::Int(5)));
        assert_eq!(merged.value("sysmon/Network/speed"), Some(&Scalar::Int(5)));
        assert_eq!(merged.value("sysmon/Network/interface"), Some(&Scalar::from("")));
        assert_eq!(
            report.updated,
            vec!["sysmon/Network/load_warn_level", "sysmon/Network/speed"]
        );
        assert_eq!(
            report.retained_for(RetainReason::TypeMismatch),
            vec!["sysmon/Network/interface"]
        );
        assert_eq!(merged.resolve("sysmon/CPU").unwrap(), cur.resolve("sysmon/CPU").unwrap());
    }

    #[test]
    fn scalar_broadcast_respects_kind_and_read_only() {
        let cur = tree(Group::new().with(
            "g",
            Group::new()
                .with("n", 1)
                .with("flag", false)
                .with("locked", LeafMeta::new(3).read_only()),
        ));
        let inc = tree(Group::new().with("g", 7));
        let (merged, report) = merge_trees(&inc, &cur);
        assert_eq!(merged.value("g/n"), Some(&Scalar::Int(7)));
        assert_eq!(merged.value("g/flag"), Some(&Scalar::Bool(false)));
        assert_eq!(merged.value("g/locked"), Some(&Scalar::Int(3)));
        assert_eq!(report.retained_for(RetainReason::TypeMismatch), vec!["g/flag"]);
        assert_eq!(report.retained_for(RetainReason::ReadOnly), vec!["g/locked"]);
    }

    #[test]
    fn bad_fields_in_raw_payload_are_skipped() {
        let payload: Value = serde_yaml::from_str(
            "global:\n  grpc_timeout: 42.0\n  reset: ~\n  only_diagnostics_agg: [1]\nextra:\n  list: [1, 2]\n",
        )
        .unwrap();
        let (merged, report) = merge_value(&payload, &current());
        assert_eq!(merged.value("global/grpc_timeout"), Some(&Scalar::Float(42.0)));
        assert_eq!(merged.value("global/reset"), Some(&Scalar::Bool(false)));
        assert_eq!(merged.value("global/only_diagnostics_agg"), Some(&Scalar::Bool(false)));
        assert_eq!(report.updated, vec!["global/grpc_timeout"]);
        assert_eq!(
            report.retained_for(RetainReason::TypeMismatch),
            vec!["global/only_diagnostics_agg"]
        );
        assert!(report.retained_for(RetainReason::Missing).contains(&"global/reset"));
    }

    #[test]
    fn null_payload_changes_nothing() {
        let cur = current();
        let (merged, report) = merge_value(&Value::Null, &cur);
        assert_eq!(merged, cur);
        assert!(report.is_unchanged());
    }

    #[test]
    fn sequence_in_place_of_group_is_a_mismatch() {
        let payload: Value = serde_yaml::from_str("sysmon: [1, 2]\n").unwrap();
        let cur = current();
        let (merged, report) = merge_value(&payload, &cur);
        assert_eq!(merged, cur);
        assert_eq!(report.retained_for(RetainReason::TypeMismatch), vec!["sysmon"]);
    }

    #[test]
    fn int_and_float_are_interchangeable() {
        let inc = tree(Group::new().with(
            "sysmon",
            Group::new().with("Memory", Group::new().with("usage_warn_level", 250.5)),
        ));
        let (merged, _) = merge_trees(&inc, &current());
        assert_eq!(merged.value("sysmon/Memory/usage_warn_level"), Some(&Scalar::Float(250.5)));
    }

    #[test]
    fn merging_own_tree_is_identity() {
        let cur = current();
        let (merged, report) = merge_trees(&cur, &cur);
        assert_eq!(merged, cur);
        assert!(report.is_unchanged());
        assert!(report.retained.is_empty());
    }

    #[test]
    fn missing_subtrees_are_reported_once() {
        let inc = tree(Group::new().with("global", Group::new().with("grpc_timeout", 1.0)));
        let (_, report) = merge_trees(&inc, &current());
        let missing = report.retained_for(RetainReason::Missing);
        assert!(missing.contains(&"sysmon"));
        assert!(!missing.iter().any(|p| p.starts_with("sysmon/")));
    }

    #[test]
    fn report_display_lists_changes() {
        let inc = tree(Group::new().with("global", Group::new().with("grpc_timeout", 1.0)));
        let (_, report) = merge_trees(&inc, &current());
        let text = report.to_string();
        assert!(text.contains("updated  global/grpc_timeout"));
        assert!(!text.contains("sysmon"));
    }
}
