//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;

use crate::config::{DEFAULT_LOG_FILE, RunConfig};

#[derive(Debug, Parser)]
#[command(name = "custom-check")]
#[command(about = "Execute remote commands from a CSV file", long_about = None)]
pub struct Cli {
    /// IP address of the server
    #[arg(long = "server_ip")]
    pub server_ip: String,

    /// SSH port of the server
    #[arg(long = "port", default_value_t = 22)]
    pub port: u16,

    /// Username for the server
    #[arg(long = "username")]
    pub username: String,

    /// Path to the private key file
    #[arg(long = "private_key_path")]
    pub private_key_path: PathBuf,

    /// Path to the CSV file with commands
    #[arg(long = "custom_commands")]
    pub custom_commands: PathBuf,

    /// Path to the output CSV file for failed commands
    #[arg(long = "output")]
    pub output: PathBuf,

    /// Path of the append-only result log
    #[arg(long = "log_file", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Exit with status 1 when any command failed
    #[arg(long = "strict")]
    pub strict: bool,
}

impl From<Cli> for RunConfig {
    fn from(cli: Cli) -> Self {
        RunConfig {
            server_ip: cli.server_ip,
            port: cli.port,
            username: cli.username,
            private_key_path: cli.private_key_path,
            custom_commands: cli.custom_commands,
            output: cli.output,
            log_file: cli.log_file,
            strict: cli.strict,
            ..RunConfig::default()
        }
    }
}
