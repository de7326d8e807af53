//! Parameter tree data model.
//!
//! A tree is a root [`Group`] whose children are either nested groups or
//! leaves. Leaves come in two shapes: a [`LeafMeta`] carrying a live value
//! plus optional bounds, default, hint and read-only flag, or a bare
//! [`Scalar`] with no metadata at all.
//!
//! In the textual form metadata lives next to child keys, under the reserved
//! colon-prefixed marker keys listed in [`MARKERS`].

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};


pub const VALUE: &str = ":value";
pub const MIN: &str = ":min";
pub const MAX: &str = ":max";
pub const DEFAULT: &str = ":default";
pub const HINT: &str = ":hint";
pub const READONLY: &str = ":ro";

/// Every reserved metadata key. None of these may name a child parameter.
pub const MARKERS: [&str; 6] = [VALUE, MIN, MAX, DEFAULT, HINT, READONLY];

/// True if `key` looks like a metadata marker rather than a child name.
///
/// Any colon-prefixed key is reserved, known or not.
pub fn is_marker(key: &str) -> bool {
    key.starts_with(':')
}


// ---------------------------------------------------------------------------
// Scalar
// ---------------------------------------------------------------------------

/// A leaf value. Integers and floats are kept apart so `100` and `100.0`
/// survive a save/load cycle unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// Coarse kind of a scalar, used for merge type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Number,
    Str,
}

/// Float bounds of `i64`: `-2^63` inclusive, `2^63` exclusive.
const I64_LOW: f64 = i64::MIN as f64;
const I64_HIGH: f64 = -(i64::MIN as f64);

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Bool(_) => ScalarKind::Bool,
            Scalar::Int(_) | Scalar::Float(_) => ScalarKind::Number,
            Scalar::Str(_) => ScalarKind::Str,
        }
    }

    /// Numeric value; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer value; floats convert only when they are whole and within the
    /// `i64` range.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            Scalar::Float(f) if f.fract() == 0.0 && (I64_LOW..I64_HIGH).contains(f) => {
                Some(*f as i64)
            }
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(v) => write!(f, "{:?}", v),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Scalar::Int(i64::from(i))
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Scalar::Float(f)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Int(i) => serializer.serialize_i64(*i),
            Scalar::Float(f) => serializer.serialize_f64(*f),
            Scalar::Str(s) => serializer.serialize_str(s),
        }
    }
}


// ---------------------------------------------------------------------------
// LeafMeta
// ---------------------------------------------------------------------------

/// A leaf carrying its live value alongside descriptive metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafMeta {
    pub value: Scalar,
    pub min: Option<Scalar>,
    pub max: Option<Scalar>,
    pub default: Option<Scalar>,
    pub hint: Option<String>,
    pub readonly: bool,
}

impl LeafMeta {
    /// A writable leaf with only a value set.
    pub fn new(value: impl Into<Scalar>) -> Self {
        LeafMeta {
            value: value.into(),
            min: None,
            max: None,
            default: None,
            hint: None,
            readonly: false,
        }
    }

    pub fn with_min(mut self, min: impl Into<Scalar>) -> Self {
        self.min = Some(min.into());
        self
    }

    pub fn with_max(mut self, max: impl Into<Scalar>) -> Self {
        self.max = Some(max.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<Scalar>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.readonly = true;
        self
    }
}

impl Serialize for LeafMeta {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(VALUE, &self.value)?;
        if let Some(ref min) = self.min {
            map.serialize_entry(MIN, min)?;
        }
        if let Some(ref max) = self.max {
            map.serialize_entry(MAX, max)?;
        }
        if let Some(ref default) = self.default {
            map.serialize_entry(DEFAULT, default)?;
        }
        if let Some(ref hint) = self.hint {
            map.serialize_entry(HINT, hint)?;
        }
        if self.readonly {
            map.serialize_entry(READONLY, &true)?;
        }
        map.end()
    }
}


// ---------------------------------------------------------------------------
// Group / Node
// ---------------------------------------------------------------------------

/// Named child nodes. A read-only group is skipped as a whole by merge;
/// single-path writes ignore the flag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Group {
    pub children: BTreeMap<String, Node>,
    pub readonly: bool,
}

impl Group {
    pub fn new() -> Self {
        Group::default()
    }

    /// Builder-style insert used when assembling trees by hand.
    pub fn with(mut self, key: impl Into<String>, node: impl Into<Node>) -> Self {
        self.children.insert(key.into(), node.into());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Serialize for Group {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if self.readonly {
            map.serialize_entry(READONLY, &true)?;
        }
        for (key, child) in &self.children {
            map.serialize_entry(key, child)?;
        }
        map.end()
    }
}

/// One node of the parameter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Group(Group),
    Leaf(LeafMeta),
    Bare(Scalar),
}

impl Node {
    pub fn is_group(&self) -> bool {
        matches!(self, Node::Group(_))
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Node::Group(g) => Some(g),
            _ => None,
        }
    }

    /// The live value of a leaf (either shape); `None` for groups.
    pub fn scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Leaf(meta) => Some(&meta.value),
            Node::Bare(s) => Some(s),
            Node::Group(_) => None,
        }
    }

    /// Per-node writability. Bare scalars are always writable.
    pub fn is_writable(&self) -> bool {
        match self {
            Node::Group(g) => !g.readonly,
            Node::Leaf(meta) => !meta.readonly,
            Node::Bare(_) => true,
        }
    }
}

impl From<Group> for Node {
    fn from(g: Group) -> Self {
        Node::Group(g)
    }
}

impl From<LeafMeta> for Node {
    fn from(meta: LeafMeta) -> Self {
        Node::Leaf(meta)
    }
}

impl From<Scalar> for Node {
    fn from(s: Scalar) -> Self {
        Node::Bare(s)
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Bare(b.into())
    }
}

impl From<i64> for Node {
    fn from(i: i64) -> Self {
        Node::Bare(i.into())
    }
}

impl From<i32> for Node {
    fn from(i: i32) -> Self {
        Node::Bare(i.into())
    }
}

impl From<f64> for Node {
    fn from(f: f64) -> Self {
        Node::Bare(f.into())
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Bare(s.into())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Bare(s.into())
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Group(g) => g.serialize(serializer),
            Node::Leaf(meta) => meta.serialize(serializer),
            Node::Bare(s) => s.serialize(serializer),
        }
    }
}


// ---------------------------------------------------------------------------
// ParameterTree
// ---------------------------------------------------------------------------

/// The whole parameter tree. The root is always a group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterTree {
    root: Group,
}

impl ParameterTree {
    pub fn new() -> Self {
        ParameterTree::default()
    }

    pub fn from_root(root: Group) -> Self {
        ParameterTree { root }
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Group {
        &mut self.root
    }
}

impl Serialize for ParameterTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}
