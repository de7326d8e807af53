//! Parameter tree: data model, path resolution and the built-in defaults.
//!
//! The tree is a root group of named nodes. Nodes are groups, leaves with
//! metadata (`:value`, `:min`, `:max`, `:default`, `:hint`, `:ro`) or bare
//! scalars. Paths are slash-delimited (`global/grpc_timeout`).

pub mod node;
pub mod path;
pub mod defaults;

pub use node::{Group, LeafMeta, Node, ParameterTree, Scalar, ScalarKind};
pub use path::{ParamPath, PathError};
pub use defaults::{DefaultSchema, DEFAULT_GRPC_TIMEOUT, GRPC_TIMEOUT_PATH, RESET_PATH};
