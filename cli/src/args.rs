//! Argument parsing for `pstore`.

use std::path::PathBuf;


/// A parsed `pstore` command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Get { path: String, full: bool },
    Set { path: String, value: String },
    /// `None` reads the payload from stdin.
    Apply { source: Option<PathBuf> },
    Reset,
    Dump { json: bool },
    Help,
}

/// Global options preceding the command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    pub file: Option<PathBuf>,
    pub version: Option<String>,
}


/// Parse arguments WITHOUT the program name.
pub fn parse_args(args: &[&str]) -> Result<(Options, Command), String> {
    let mut opts = Options::default();
    let mut rest = args;

    loop {
        match rest.first() {
            Some(&"--file") => {
                let v = rest.get(1).ok_or("--file needs a path")?;
                opts.file = Some(PathBuf::from(v));
                rest = &rest[2..];
            }
            Some(&"--version-tag") => {
                let v = rest.get(1).ok_or("--version-tag needs a value")?;
                opts.version = Some(v.to_string());
                rest = &rest[2..];
            }
            _ => break,
        }
    }

    if rest.is_empty() {
        return Err("No command specified. Run 'pstore help' for usage.".into());
    }

    let cmd = match rest[0] {
        "get" => parse_get(rest)?,
        "set" => parse_set(rest)?,
        "apply" => parse_apply(rest)?,
        "reset" => Command::Reset,
        "dump" => Command::Dump {
            json: rest[1..].contains(&"--json"),
        },
        "help" | "--help" | "-h" => Command::Help,
        other => return Err(format!("Unknown command: '{}'", other)),
    };
    Ok((opts, cmd))
}

/// `pstore get <path> [--full]`
fn parse_get(args: &[&str]) -> Result<Command, String> {
    let path = args
        .get(1)
        .filter(|a| !a.starts_with("--"))
        .ok_or("Usage: pstore get <path> [--full]")?;
    Ok(Command::Get {
        path: path.to_string(),
        full: args[2..].contains(&"--full"),
    })
}

/// `pstore set <path> <value>`
fn parse_set(args: &[&str]) -> Result<Command, String> {
    if args.len() < 3 {
        return Err("Usage: pstore set <path> <value>".into());
    }
    Ok(Command::Set {
        path: args[1].into(),
        value: args[2..].join(" "),
    })
}

/// `pstore apply <file|->`
fn parse_apply(args: &[&str]) -> Result<Command, String> {
    match args.get(1) {
        None => Err("Usage: pstore apply <file|->".into()),
        Some(&"-") => Ok(Command::Apply { source: None }),
        Some(p) => Ok(Command::Apply {
            source: Some(PathBuf::from(p)),
        }),
    }
}

pub const USAGE: &str = "\
Usage: pstore [--file PATH] [--version-tag V] <command>

Commands:
  get <path> [--full]   print a parameter (--full: with metadata)
  set <path> <value>    write one parameter
  apply <file|->        merge a YAML payload from a file or stdin
  reset                 restore the built-in defaults
  dump [--json]         print the whole tree
  help                  show this text

The backing file defaults to $PSTORE_FILE, then
$HOME/.config/ros.fkie/node_manager_daemon.yaml.";


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_get_with_full_flag() {
        let (_, cmd) = parse_args(&["get", "global/grpc_timeout", "--full"]).unwrap();
        assert_eq!(cmd, Command::Get { path: "global/grpc_timeout".into(), full: true });
    }

    #[test]
    fn parse_set_joins_value_words() {
        let (_, cmd) = parse_args(&["set", "sysmon/Network/interface", "eth", "0"]).unwrap();
        assert_eq!(
            cmd,
            Command::Set { path: "sysmon/Network/interface".into(), value: "eth 0".into() }
        );
    }

    #[test]
    fn parse_global_options() {
        let (opts, cmd) =
            parse_args(&["--file", "/tmp/s.yaml", "--version-tag", "3.0", "dump", "--json"]).unwrap();
        assert_eq!(opts.file, Some(PathBuf::from("/tmp/s.yaml")));
        assert_eq!(opts.version.as_deref(), Some("3.0"));
        assert_eq!(cmd, Command::Dump { json: true });
    }

    #[test]
    fn parse_apply_stdin() {
        let (_, cmd) = parse_args(&["apply", "-"]).unwrap();
        assert_eq!(cmd, Command::Apply { source: None });
    }

    #[test]
    fn parse_errors() {
        assert!(parse_args(&[]).is_err());
        assert!(parse_args(&["--file"]).is_err());
        assert!(parse_args(&["get"]).is_err());
        assert!(parse_args(&["set", "a"]).is_err());
        assert!(parse_args(&["frobnicate"]).unwrap_err().contains("Unknown command"));
    }
}
