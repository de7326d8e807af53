//! The built-in parameter tree used on first start, after a corrupt load,
//! and whenever `global/reset` is requested.

use std::path::{Path, PathBuf};

use super::node::{Group, LeafMeta, ParameterTree};


/// Default timeout for connections to a remote gRPC server, in seconds.
pub const DEFAULT_GRPC_TIMEOUT: f64 = 15.0;

/// Reserved control parameter: when true after a merge the whole tree is
/// replaced by the defaults.
pub const RESET_PATH: &str = "global/reset";

pub const GRPC_TIMEOUT_PATH: &str = "global/grpc_timeout";


/// Inputs that the default tree embeds as read-only or environment-derived
/// values.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultSchema {
    pub version: String,
    pub file: PathBuf,
    pub log_dir: PathBuf,
}

impl DefaultSchema {
    pub fn new(version: impl Into<String>, file: &Path) -> Self {
        DefaultSchema {
            version: version.into(),
            file: file.to_path_buf(),
            log_dir: Self::default_log_dir(),
        }
    }

    /// `$ROS_LOG_DIR/` when set, else `~/.ros/log/`.
    pub fn default_log_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("ROS_LOG_DIR") {
            if !dir.is_empty() {
                let mut s = dir;
                if !s.ends_with(std::path::MAIN_SEPARATOR) {
                    s.push(std::path::MAIN_SEPARATOR);
                }
                return PathBuf::from(s);
            }
        }
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".ros").join("log").join("")
    }

    pub fn build(&self) -> ParameterTree {
        let global = Group::new()
            .with("version", LeafMeta::new(self.version.clone()).read_only())
            .with(
                "file",
                LeafMeta::new(self.file.to_string_lossy().into_owned()).read_only(),
            )
            .with(
                "grpc_timeout",
                LeafMeta::new(DEFAULT_GRPC_TIMEOUT)
                    .with_min(0)
                    .with_default(DEFAULT_GRPC_TIMEOUT)
                    .with_hint("timeout for connection to remote gRPC-server"),
            )
            .with("only_diagnostics_agg", false)
            .with("reset", false);

        let usage_mb = || {
            LeafMeta::new(100)
                .with_default(100.0)
                .with_hint("values in MB")
        };

        let sysmon = Group::new()
            .with("CPU", Group::new().with("load_warn_level", 0.9))
            .with(
                "Disk",
                Group::new()
                    .with("usage_warn_level", usage_mb())
                    .with("path", self.log_dir.to_string_lossy().into_owned()),
            )
            .with("Memory", Group::new().with("usage_warn_level", usage_mb()))
            .with(
                "Network",
                Group::new()
                    .with(
                        "load_warn_level",
                        LeafMeta::new(0.9)
                            .with_default(0.9)
                            .with_hint("Percent of the maximum speed"),
                    )
                    .with(
                        "speed",
                        LeafMeta::new(6)
                            .with_default(6)
                            .with_hint("Maximal speed in MBit"),
                    )
                    .with("interface", ""),
            );

        ParameterTree::from_root(Group::new().with("global", global).with("sysmon", sysmon))
    }
}
