//! The settings store: a parameter tree backed by a YAML file.
//!
//! Every operation takes one reentrant lock, so a reload listener may call
//! back into the store from inside a notification. Mutations write through
//! to the backing file immediately; write failures are logged, never
//! returned, so a flaky filesystem cannot take the owning process down.
//!
//! Listeners run after whole-tree changes (construction, [`reload`],
//! [`apply`]) but not after a single-path [`set`].
//!
//! [`reload`]: SettingsStore::reload
//! [`apply`]: SettingsStore::apply
//! [`set`]: SettingsStore::set

use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use serde::Serialize;
use serde_yaml::Value;

use crate::codec;
use crate::error::StoreError;
use crate::merge::{merge_value, MergeReport};
use crate::notify::{Listener, NotificationHub};
use crate::tree::{
    DefaultSchema, Node, ParameterTree, PathError, Scalar, DEFAULT_GRPC_TIMEOUT,
    GRPC_TIMEOUT_PATH, RESET_PATH,
};


/// Where the store lives and what the built-in defaults embed.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub version: String,
    /// Directory written into `sysmon/Disk/path` of the default tree.
    /// `None` uses [`DefaultSchema::default_log_dir`].
    pub log_dir: Option<PathBuf>,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            path: path.into(),
            version: String::new(),
            log_dir: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }

    fn schema(&self) -> DefaultSchema {
        let mut schema = DefaultSchema::new(self.version.clone(), &self.path);
        if let Some(ref dir) = self.log_dir {
            schema.log_dir = dir.clone();
        }
        schema
    }
}


/// Values other components read from the tree, refreshed after every
/// mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RuntimeConfig {
    /// Timeout for connections to a remote gRPC server, in seconds.
    pub grpc_timeout: f64,
}

impl RuntimeConfig {
    fn from_tree(tree: &ParameterTree) -> Self {
        RuntimeConfig {
            grpc_timeout: tree
                .value(GRPC_TIMEOUT_PATH)
                .and_then(Scalar::as_f64)
                .unwrap_or(DEFAULT_GRPC_TIMEOUT),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig { grpc_timeout: DEFAULT_GRPC_TIMEOUT }
    }
}


struct State {
    tree: ParameterTree,
    runtime: RuntimeConfig,
    hub: NotificationHub<SettingsStore>,
}


pub struct SettingsStore {
    path: PathBuf,
    version: String,
    schema: DefaultSchema,
    state: ReentrantMutex<RefCell<State>>,
}

impl SettingsStore {
    /// Open the store, loading the backing file or falling back to the
    /// built-in defaults. The file's directory is created if missing.
    pub fn open(config: StoreConfig) -> Self {
        if let Some(dir) = config.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                if let Err(e) = std::fs::create_dir_all(dir) {
                    log::warn!(
                        target: "settings",
                        "cannot create config directory {}: {}",
                        dir.display(),
                        e
                    );
                }
            }
        }
        let schema = config.schema();
        let tree = schema.build();
        let store = SettingsStore {
            path: config.path,
            version: config.version,
            schema,
            state: ReentrantMutex::new(RefCell::new(State {
                runtime: RuntimeConfig::from_tree(&tree),
                tree,
                hub: NotificationHub::new(),
            })),
        };
        store.reload();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// A fresh copy of the built-in default tree.
    pub fn default_tree(&self) -> ParameterTree {
        self.schema.build()
    }

    // -------------------------------------------------------------------
    // Whole-tree operations
    // -------------------------------------------------------------------

    /// Reload from the backing file (defaults if missing or malformed) and
    /// notify all listeners.
    pub fn reload(&self) {
        let guard = self.state.lock();
        {
            let mut state = guard.borrow_mut();
            state.tree = codec::load_or_default(&self.path, || self.schema.build());
            state.runtime = RuntimeConfig::from_tree(&state.tree);
        }
        self.notify_all();
    }

    /// Merge a YAML payload into the live tree.
    ///
    /// Fields that cannot be used (nulls, sequences, scalars of the wrong
    /// kind, keys unknown to the live tree) keep their old values; the rest
    /// of the payload still applies. An empty payload changes nothing but is
    /// still saved and notified. Only text that is not YAML at all is
    /// rejected, leaving the tree untouched and notifying nobody.
    pub fn apply(&self, data: &str) -> Result<MergeReport, StoreError> {
        let incoming = codec::decode_payload(data).map_err(|e| {
            log::warn!(target: "settings", "ignoring update payload: {}", e);
            e
        })?;
        Ok(self.commit_merge(&incoming))
    }

    /// Merge `incoming` into the live tree, honoring read-only nodes.
    ///
    /// If the merged tree has `global/reset` set, the whole tree is replaced
    /// by the defaults instead. The result is saved and listeners notified.
    pub fn apply_tree(&self, incoming: &ParameterTree) -> MergeReport {
        self.commit_merge(&codec::to_value(incoming))
    }

    fn commit_merge(&self, incoming: &Value) -> MergeReport {
        let guard = self.state.lock();
        let report = {
            let mut state = guard.borrow_mut();
            let (merged, report) = merge_value(incoming, &state.tree);
            if merged.value(RESET_PATH).and_then(Scalar::as_bool) == Some(true) {
                log::info!(target: "settings", "reset configuration requested");
                state.tree = self.schema.build();
            } else {
                log::debug!(target: "settings", "new configuration applied ({}), save now", report);
                state.tree = merged;
            }
            state.runtime = RuntimeConfig::from_tree(&state.tree);
            self.write_through(&state.tree);
            report
        };
        self.notify_all();
        report
    }

    // -------------------------------------------------------------------
    // Single-path access
    // -------------------------------------------------------------------

    /// Value at `path`, or `default` if it does not resolve.
    ///
    /// With `extract_value` a leaf with metadata yields only its value;
    /// otherwise the full leaf is returned.
    pub fn get(&self, path: &str, default: impl Into<Node>, extract_value: bool) -> Node {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.tree.get(path, default.into(), extract_value)
    }

    /// Node at `path`, with the reason when it does not resolve.
    pub fn lookup(&self, path: &str) -> Result<Node, PathError> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.tree.resolve(path).cloned()
    }

    /// Live value of the leaf at `path`.
    pub fn value(&self, path: &str) -> Option<Scalar> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.tree.value(path).cloned()
    }

    pub fn get_f64(&self, path: &str, default: f64) -> f64 {
        self.value(path).and_then(|v| v.as_f64()).unwrap_or(default)
    }

    pub fn get_i64(&self, path: &str, default: i64) -> i64 {
        self.value(path).and_then(|v| v.as_i64()).unwrap_or(default)
    }

    pub fn get_bool(&self, path: &str, default: bool) -> bool {
        self.value(path).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    pub fn get_str(&self, path: &str, default: &str) -> String {
        match self.value(path) {
            Some(Scalar::Str(s)) => s,
            _ => default.to_string(),
        }
    }

    /// Write a single parameter and save. Listeners are not notified.
    ///
    /// Fails with [`StoreError::ReadOnly`] for read-only leaves; the tree is
    /// unchanged on any error.
    pub fn set(&self, path: &str, value: impl Into<Scalar>) -> Result<(), StoreError> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        state.tree.set(path, value)?;
        state.runtime = RuntimeConfig::from_tree(&state.tree);
        self.write_through(&state.tree);
        Ok(())
    }

    // -------------------------------------------------------------------
    // Listeners
    // -------------------------------------------------------------------

    /// Register a reload listener. A listener already subscribed (same
    /// `Arc`) is not added again and not invoked.
    ///
    /// When newly added with `invoke_immediately`, it runs once before this
    /// returns. Returns true if the listener was added.
    pub fn subscribe(&self, listener: Listener<SettingsStore>, invoke_immediately: bool) -> bool {
        let guard = self.state.lock();
        let added = guard.borrow_mut().hub.subscribe(Arc::clone(&listener));
        if added && invoke_immediately {
            listener(self);
        }
        added
    }

    pub fn unsubscribe(&self, listener: &Listener<SettingsStore>) -> bool {
        let guard = self.state.lock();
        let removed = guard.borrow_mut().hub.unsubscribe(listener);
        removed
    }

    pub fn listener_count(&self) -> usize {
        let guard = self.state.lock();
        let count = guard.borrow().hub.len();
        count
    }

    /// Invoke every listener in subscription order with this store.
    pub fn notify_all(&self) {
        let guard = self.state.lock();
        // Listeners may re-enter the store, so no RefCell borrow is held
        // while they run.
        let listeners = guard.borrow().hub.listeners();
        for listener in listeners {
            listener(self);
        }
    }

    // -------------------------------------------------------------------
    // Snapshots and persistence
    // -------------------------------------------------------------------

    /// Copy of the live tree.
    pub fn tree(&self) -> ParameterTree {
        let guard = self.state.lock();
        let tree = guard.borrow().tree.clone();
        tree
    }

    pub fn runtime(&self) -> RuntimeConfig {
        let guard = self.state.lock();
        let runtime = guard.borrow().runtime;
        runtime
    }

    /// Current `global/grpc_timeout`, in seconds.
    pub fn grpc_timeout(&self) -> f64 {
        self.runtime().grpc_timeout
    }

    pub fn to_yaml(&self) -> Result<String, StoreError> {
        let guard = self.state.lock();
        let state = guard.borrow();
        codec::encode(&state.tree)
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        let guard = self.state.lock();
        let state = guard.borrow();
        codec::to_json(&state.tree)
    }

    /// Save the live tree, returning any failure to the caller.
    pub fn save(&self) -> Result<(), StoreError> {
        let guard = self.state.lock();
        let state = guard.borrow();
        codec::save(&state.tree, &self.path)
    }

    fn write_through(&self, tree: &ParameterTree) {
        if let Err(e) = codec::save(tree, &self.path) {
            log::warn!(
                target: "settings",
                "can't save configuration to '{}': {}",
                self.path.display(),
                e
            );
        }
    }
}

impl fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsStore")
            .field("path", &self.path)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}
