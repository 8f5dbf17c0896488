use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use modlink_frame::COMPOSITE;
use modlink_module::{HostConfig, ModuleHost, NativeLoader};

use crate::exit::{load_error, CliResult};
use crate::output::OutputFormat;

pub mod inspect;
pub mod ping;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a library and check for the handshake export without calling it.
    Inspect(InspectArgs),
    /// Load a module, ping it and unload it.
    Ping(PingArgs),
    /// Load a module, send one composite message and print the response.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, config: &HostConfig, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Inspect(args) => inspect::run(args, config, format),
        Command::Ping(args) => ping::run(args, config, format),
        Command::Send(args) => send::run(args, config, format),
        Command::Version(args) => version::run(args, config),
    }
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the module library.
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct PingArgs {
    /// Path to the module library.
    pub path: PathBuf,
    /// Number of pings to send.
    #[arg(long, short = 'n', default_value_t = 1)]
    pub count: u32,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Path to the module library.
    pub path: PathBuf,
    /// Message code.
    #[arg(long, default_value_t = COMPOSITE, allow_hyphen_values = true)]
    pub code: i32,
    /// String entry (repeatable).
    #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub fields: Vec<(String, String)>,
    /// Integer entry, encoded as i64 (repeatable).
    #[arg(long = "int", value_name = "KEY=N", value_parser = parse_key_int)]
    pub ints: Vec<(String, i64)>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build and protocol details.
    #[arg(long)]
    pub extended: bool,
}

/// Load `path` with the platform loader.
pub(crate) fn load_host(path: &Path, config: &HostConfig) -> CliResult<ModuleHost> {
    // SAFETY: the operator picked this library; module code runs with full
    // process privileges by design of the protocol.
    unsafe { ModuleHost::load_with_config(NativeLoader, path, config) }
        .map_err(|err| load_error("load failed", err))
}

fn parse_key_value(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{input}`"))?;
    if key.is_empty() {
        return Err("key must not be empty".to_string());
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_key_int(input: &str) -> Result<(String, i64), String> {
    let (key, value) = parse_key_value(input)?;
    let value = value
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("`{value}` is not an integer"))?;
    Ok((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_splits_on_first_equals() {
        assert_eq!(
            parse_key_value("greeting=a=b").unwrap(),
            ("greeting".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_key_value("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
    }

    #[test]
    fn key_value_rejects_malformed_input() {
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=value").is_err());
        assert!(parse_key_int("age=old").is_err());
        assert_eq!(parse_key_int("age= 45").unwrap(), ("age".to_string(), 45));
    }
}
