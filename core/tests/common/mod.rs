#![allow(dead_code)]
//! Shared helpers for paramstore-core integration tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use paramstore_core::{Listener, SettingsStore, StoreConfig};
use tempfile::TempDir;

pub const VERSION: &str = "2.4.1";

/// A store backed by `settings.yaml` inside a fresh temp dir.
pub struct TestStore {
    pub dir: TempDir,
    pub store: SettingsStore,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(config_in(&dir));
        TestStore { dir, store }
    }

    pub fn file(&self) -> PathBuf {
        self.dir.path().join("settings.yaml")
    }

    pub fn file_contents(&self) -> String {
        std::fs::read_to_string(self.file()).unwrap()
    }

    /// Open a second store on the same file, as a restarted process would.
    pub fn reopen(&self) -> SettingsStore {
        SettingsStore::open(config_in(&self.dir))
    }
}

pub fn config_in(dir: &TempDir) -> StoreConfig {
    StoreConfig::new(dir.path().join("settings.yaml"))
        .with_version(VERSION)
        .with_log_dir("/var/log/test/")
}

/// A listener that counts its invocations.
pub fn counting_listener() -> (Listener<SettingsStore>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let listener: Listener<SettingsStore> = Arc::new(move |_: &SettingsStore| {
        c.fetch_add(1, Ordering::SeqCst);
    });
    (listener, calls)
}

pub fn count(calls: &Arc<AtomicUsize>) -> usize {
    calls.load(Ordering::SeqCst)
}
