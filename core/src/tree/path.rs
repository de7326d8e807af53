//! Slash-delimited parameter paths and tree lookup/mutation.
//!
//! Paths look like `global/grpc_timeout` or `sysmon/Disk/path`. Empty
//! segments are dropped, so `/global//reset/` and `global/reset` name the
//! same parameter and the empty path names the root group.

use std::fmt;

use super::node::{is_marker, Group, LeafMeta, Node, ParameterTree, Scalar};
use crate::error::StoreError;


/// A parsed parameter path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamPath {
    segments: Vec<String>,
}

impl ParamPath {
    pub fn parse(input: &str) -> Self {
        let segments = input
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        ParamPath { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// All segments but the last, plus the last. `None` for the root.
    pub fn split_last(&self) -> Option<(&[String], &str)> {
        self.segments
            .split_last()
            .map(|(last, parent)| (parent, last.as_str()))
    }

    /// Path string of the first `n` segments.
    fn prefix(&self, n: usize) -> String {
        self.segments[..n].join("/")
    }
}

impl fmt::Display for ParamPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}


/// Why a lookup did not reach a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// No child with this name; `path` is the first missing prefix.
    Missing { path: String },
    /// `path` resolved to a leaf but more segments followed.
    NotAGroup { path: String },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Missing { path } => write!(f, "no parameter at {}", path),
            PathError::NotAGroup { path } => write!(f, "{} is not a group", path),
        }
    }
}

impl std::error::Error for PathError {}


impl ParameterTree {
    /// Walk the tree to the node named by `path`.
    ///
    /// The root is a bare group rather than a node, so the empty path does
    /// not resolve; [`ParameterTree::get`] special-cases it.
    pub fn resolve(&self, path: &str) -> Result<&Node, PathError> {
        let parsed = ParamPath::parse(path);
        let Some((parent, last)) = parsed.split_last() else {
            return Err(PathError::Missing { path: String::new() });
        };
        let mut group = self.root();
        for (i, seg) in parent.iter().enumerate() {
            match group.children.get(seg) {
                Some(Node::Group(g)) => group = g,
                Some(_) => return Err(PathError::NotAGroup { path: parsed.prefix(i + 1) }),
                None => return Err(PathError::Missing { path: parsed.prefix(i + 1) }),
            }
        }
        group
            .children
            .get(last)
            .ok_or_else(|| PathError::Missing { path: parsed.to_string() })
    }

    /// Look up `path`, falling back to `default` when it does not resolve.
    ///
    /// With `extract_value` a leaf with metadata yields just its value as a
    /// bare scalar; otherwise the full leaf is returned. Bare scalars and
    /// groups are returned as they are.
    pub fn get(&self, path: &str, default: Node, extract_value: bool) -> Node {
        if ParamPath::parse(path).is_root() {
            return Node::Group(self.root().clone());
        }
        match self.resolve(path) {
            Ok(Node::Leaf(meta)) if extract_value => Node::Bare(meta.value.clone()),
            Ok(node) => node.clone(),
            Err(_) => default,
        }
    }

    /// Live value of the leaf at `path`, if any.
    pub fn value(&self, path: &str) -> Option<&Scalar> {
        self.resolve(path).ok().and_then(Node::scalar)
    }

    /// Write `value` to the leaf at `path`, creating missing groups on the
    /// way and a fresh value-only leaf if the key does not exist yet.
    ///
    /// Fails without touching the tree when the target leaf is read-only,
    /// when an intermediate segment is a leaf, or when the target is a group.
    pub fn set(&mut self, path: &str, value: impl Into<Scalar>) -> Result<(), StoreError> {
        let parsed = ParamPath::parse(path);
        let Some((parent, last)) = parsed.split_last() else {
            return Err(StoreError::InvalidPath(path.to_string()));
        };
        if is_marker(last) || parent.iter().any(|s| is_marker(s)) {
            return Err(StoreError::InvalidPath(path.to_string()));
        }

        // Check before creating anything so a failed write leaves no
        // half-built groups behind.
        match self.resolve(&parsed.to_string()) {
            Ok(Node::Leaf(meta)) if meta.readonly => {
                return Err(StoreError::ReadOnly { path: parsed.to_string() })
            }
            Ok(Node::Group(_)) => return Err(StoreError::NotALeaf { path: parsed.to_string() }),
            Err(PathError::NotAGroup { path }) => return Err(StoreError::NotAGroup { path }),
            _ => {}
        }

        let mut group: &mut Group = self.root_mut();
        for seg in parent {
            let child = group
                .children
                .entry(seg.clone())
                .or_insert_with(|| Node::Group(Group::new()));
            group = match child {
                Node::Group(g) => g,
                // resolve() above already rejected leaves on the parent path
                _ => return Err(StoreError::NotAGroup { path: seg.clone() }),
            };
        }

        let value = value.into();
        match group.children.get_mut(last) {
            Some(node) => match node {
                Node::Leaf(meta) => meta.value = value,
                Node::Bare(s) => *s = value,
                Node::Group(_) => return Err(StoreError::NotALeaf { path: parsed.to_string() }),
            },
            None => {
                group
                    .children
                    .insert(last.to_string(), Node::Leaf(LeafMeta::new(value)));
            }
        }
        Ok(())
    }
}
