use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{ArgAction, Parser};

pub const APP_NAME: &str = "Webby";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable naming the directory files are served from.
pub const ROOT_ENV: &str = "WEBBY_ROOT";

pub const DEFAULT_PORT: u16 = 9090;

/// Upper bound on the body of a single response. Larger files are truncated.
pub const MAX_RESPONSE_SIZE: usize = 65536;

/// Size of the single read performed on each connection.
pub const MAX_BUFFER: usize = 2048;

/// Events fetched per `epoll_wait` call.
pub const MAX_EVENTS: usize = 10;

/// Webby - A small webserver
#[derive(Debug, Parser)]
#[command(name = "webby", version, disable_version_flag = true)]
pub struct Cli {
    /// print debug logs
    #[arg(short, long)]
    pub debug: bool,

    /// print version number and exit
    #[arg(short = 'v', long, action = ArgAction::Version, value_parser = clap::value_parser!(bool))]
    version: (),

    /// set the port number
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

/// Process-wide settings, built once at startup and only read afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub debug: bool,
    /// Canonical path of the static root.
    pub root: PathBuf,
}

impl Config {
    /// Builds a config from already parsed arguments and the `WEBBY_ROOT`
    /// environment variable.
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let root = match std::env::var_os(ROOT_ENV) {
            Some(root) if !root.is_empty() => PathBuf::from(root),
            _ => bail!("Please set {ROOT_ENV} environment variable"),
        };

        Self::new(cli.port, cli.debug, root)
    }

    pub fn new(port: u16, debug: bool, root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .with_context(|| format!("invalid static root {}", root.display()))?;

        if !root.is_dir() {
            bail!("static root {} is not a directory", root.display());
        }

        Ok(Self { port, debug, root })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_port_9090() {
        let cli = Cli::try_parse_from(["webby"]).unwrap();
        assert_eq!(cli.port, DEFAULT_PORT);
        assert!(!cli.debug);
    }

    #[test]
    fn short_and_long_flags() {
        let cli = Cli::try_parse_from(["webby", "-d", "-p", "8081"]).unwrap();
        assert!(cli.debug);
        assert_eq!(cli.port, 8081);

        let cli = Cli::try_parse_from(["webby", "--debug", "--port", "3000"]).unwrap();
        assert!(cli.debug);
        assert_eq!(cli.port, 3000);
    }

    #[test]
    fn version_flag_is_lowercase_v() {
        let err = Cli::try_parse_from(["webby", "-v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);

        let err = Cli::try_parse_from(["webby", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn rejects_bad_port() {
        assert!(Cli::try_parse_from(["webby", "-p", "not-a-port"]).is_err());
        assert!(Cli::try_parse_from(["webby", "-p", "70000"]).is_err());
    }
}
