mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;
use modlink_module::{HostConfig, HANDSHAKE_SYMBOL};

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "modlink", version, about = "Load native modules and exchange frames with them")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "MODLINK_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    /// Exported symbol called to hand the endpoint to a module.
    #[arg(
        long,
        value_name = "SYMBOL",
        default_value = HANDSHAKE_SYMBOL,
        env = "MODLINK_HANDSHAKE_SYMBOL",
        global = true
    )]
    handshake_symbol: String,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn host_config(&self) -> HostConfig {
        HostConfig::default().with_handshake_symbol(self.handshake_symbol.clone())
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let config = cli.host_config();
    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, &config, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "modlink",
            "send",
            "./libecho_module.so",
            "--code",
            "42",
            "--field",
            "greeting=Hello",
            "--int",
            "age=45",
        ])
        .expect("send args should parse");

        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.code, 42);
        assert_eq!(args.fields, [("greeting".to_string(), "Hello".to_string())]);
        assert_eq!(args.ints, [("age".to_string(), 45)]);
    }

    #[test]
    fn send_code_defaults_to_composite() {
        let cli = Cli::try_parse_from(["modlink", "send", "libx.so"]).expect("should parse");
        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.code, modlink_frame::COMPOSITE);
        assert!(args.fields.is_empty());
    }

    #[test]
    fn rejects_malformed_field() {
        let err = Cli::try_parse_from(["modlink", "send", "libx.so", "--field", "oops"])
            .expect_err("field without '=' should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn global_options_apply_after_subcommand() {
        let cli = Cli::try_parse_from([
            "modlink",
            "ping",
            "libx.so",
            "--count",
            "3",
            "--format",
            "json",
            "--handshake-symbol",
            "modlink_handshake",
        ])
        .expect("ping args should parse");

        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert_eq!(cli.host_config().handshake_symbol, "modlink_handshake");
        assert!(matches!(cli.command, Command::Ping(ref args) if args.count == 3));
    }

    #[test]
    fn parses_inspect_subcommand() {
        let cli = Cli::try_parse_from(["modlink", "inspect", "/opt/mods/libecho.so"])
            .expect("inspect args should parse");
        assert!(matches!(cli.command, Command::Inspect(_)));
    }
}
