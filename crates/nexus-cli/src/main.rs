mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Nexus -- AI-assisted remote terminal client.
#[derive(Parser, Debug)]
#[command(name = "nexus", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open an interactive shell with the assistant attached
    Connect {
        /// Remote host to open a shell on
        #[arg(long)]
        host: String,

        /// SSH port
        #[arg(long, default_value = "22")]
        port: u16,

        /// Login username
        #[arg(long)]
        username: String,

        /// Environment variable holding the password or passphrase
        #[arg(long, default_value = "NEXUS_CREDENTIAL")]
        credential_env: String,

        /// Path to the configuration file (defaults to ./nexus.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a configuration file and print the effective settings
    CheckConfig {
        /// Path to the configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing with env filter (e.g., RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Connect {
            host,
            port,
            username,
            credential_env,
            config,
        } => commands::connect::run(&host, port, &username, &credential_env, config.as_deref()),
        Commands::CheckConfig { config } => commands::check_config::run(config.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cli_parse_connect_defaults() {
        let cli = Cli::try_parse_from([
            "nexus",
            "connect",
            "--host",
            "prod-web-1",
            "--username",
            "ops",
        ]);
        assert!(cli.is_ok(), "should parse connect with defaults: {cli:?}");
        let cli = cli.unwrap();
        match cli.command {
            Commands::Connect {
                host,
                port,
                username,
                credential_env,
                config,
            } => {
                assert_eq!(host, "prod-web-1");
                assert_eq!(port, 22);
                assert_eq!(username, "ops");
                assert_eq!(credential_env, "NEXUS_CREDENTIAL");
                assert!(config.is_none());
            }
            _ => panic!("expected Connect command"),
        }
    }

    #[test]
    fn cli_parse_connect_with_port_and_config() {
        let cli = Cli::try_parse_from([
            "nexus",
            "connect",
            "--host",
            "bastion",
            "--port",
            "2222",
            "--username",
            "deploy",
            "--config",
            "/etc/nexus/nexus.toml",
        ]);
        assert!(cli.is_ok(), "should parse connect: {cli:?}");
        let cli = cli.unwrap();
        match cli.command {
            Commands::Connect { port, config, .. } => {
                assert_eq!(port, 2222);
                assert_eq!(config, Some(PathBuf::from("/etc/nexus/nexus.toml")));
            }
            _ => panic!("expected Connect command"),
        }
    }

    #[test]
    fn cli_parse_check_config() {
        let cli = Cli::try_parse_from(["nexus", "check-config"]);
        assert!(cli.is_ok(), "should parse check-config: {cli:?}");
        let cli = cli.unwrap();
        match cli.command {
            Commands::CheckConfig { config } => assert!(config.is_none()),
            _ => panic!("expected CheckConfig command"),
        }
    }

    #[test]
    fn cli_missing_required_args_fails() {
        // connect without --host should fail
        let result = Cli::try_parse_from(["nexus", "connect", "--username", "ops"]);
        assert!(result.is_err(), "connect without --host should fail");

        // connect without --username should fail
        let result = Cli::try_parse_from(["nexus", "connect", "--host", "h"]);
        assert!(result.is_err(), "connect without --username should fail");
    }
}
