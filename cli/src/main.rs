//! pstore: operator tool for a paramstore settings file.
//!
//! # Usage
//!
//! ```text
//! pstore get global/grpc_timeout
//! pstore set global/grpc_timeout 20.0
//! pstore apply update.yaml
//! pstore dump --json
//! ```

mod args;

use std::io::Read;
use std::path::PathBuf;
use std::process;

use paramstore_core::codec::{self, parse_scalar};
use paramstore_core::{Node, Scalar, SettingsStore, StoreConfig, StoreError};

use args::{parse_args, Command, Options, USAGE};


fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let arg_refs: Vec<&str> = args[1..].iter().map(|s| s.as_str()).collect();

    let (opts, cmd) = match parse_args(&arg_refs) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("pstore: {}", e);
            process::exit(2);
        }
    };

    if cmd == Command::Help {
        println!("{}", USAGE);
        return;
    }

    let store = SettingsStore::open(store_config(&opts));
    match run(&store, cmd) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("pstore error: {}", e);
            process::exit(1);
        }
    }
}


fn store_config(opts: &Options) -> StoreConfig {
    let path = opts.file.clone().unwrap_or_else(resolve_settings_file);
    log::debug!(target: "pstore", "settings file: {}", path.display());
    let mut config = StoreConfig::new(path);
    if let Some(ref v) = opts.version {
        config = config.with_version(v.clone());
    }
    config
}


fn resolve_settings_file() -> PathBuf {
    if let Ok(file) = std::env::var("PSTORE_FILE") {
        return PathBuf::from(file);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home)
        .join(".config")
        .join("ros.fkie")
        .join("node_manager_daemon.yaml")
}


fn run(store: &SettingsStore, cmd: Command) -> Result<String, StoreError> {
    match cmd {
        Command::Get { path, full } => match store.lookup(&path) {
            Ok(Node::Bare(v)) => Ok(v.to_string()),
            Ok(Node::Leaf(meta)) if !full => Ok(meta.value.to_string()),
            Ok(node) => render(&node),
            Err(e) => Err(StoreError::InvalidPath(e.to_string())),
        },
        Command::Set { path, value } => {
            store.set(&path, literal(&value))?;
            Ok(String::new())
        }
        Command::Apply { source } => {
            let payload = match source {
                Some(file) => std::fs::read_to_string(file)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let report = store.apply(&payload)?;
            Ok(report.to_string())
        }
        Command::Reset => {
            store.apply("global:\n  reset: true\n")?;
            Ok(format!("reset {} to defaults", store.path().display()))
        }
        Command::Dump { json: true } => store.to_json(),
        Command::Dump { json: false } => store.to_yaml(),
        Command::Help => Ok(USAGE.to_string()),
    }
}


/// A command-line value as a scalar. Anything that is not a YAML scalar
/// (`a: b`, `#tag`, `[1, 2]`) is kept as the literal string.
fn literal(text: &str) -> Scalar {
    parse_scalar(text).unwrap_or_else(|_| Scalar::Str(text.to_string()))
}


/// YAML rendering of a group or full leaf.
fn render(node: &Node) -> Result<String, StoreError> {
    let group = match node {
        Node::Group(g) => g.clone(),
        other => paramstore_core::Group::new().with("value", other.clone()),
    };
    let text = codec::encode(&paramstore_core::ParameterTree::from_root(group))?;
    Ok(text.trim_end().to_string())
}
