//! Command-line surface: global flags usable with any subcommand, plus a
//! `#[derive(Subcommand)]` enum dispatched in `main.rs`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "zkid-server")]
#[command(about = "zk-id verification server: proof verification, revocation, and issuer administration")]
#[command(version = BUILD_VERSION)]
pub struct Cli {
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(short = 'd', long, global = true, value_name = "DIR", env = "ZKID_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP verification server.
    Serve {
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
    /// Manage the issuer registry.
    Issuer {
        #[command(subcommand)]
        action: IssuerAction,
    },
    /// Add a credential commitment to the revocation tree.
    Revoke {
        #[arg(value_name = "COMMITMENT")]
        commitment: String,
    },
    /// Print the current revocation root.
    RevocationRoot,
}

#[derive(Subcommand)]
pub enum IssuerAction {
    Add {
        #[arg(long)]
        issuer: String,
        #[arg(long)]
        public_key: String,
        #[arg(long)]
        jurisdiction: String,
        #[arg(long)]
        valid_from: Option<String>,
        #[arg(long)]
        valid_to: Option<String>,
    },
    List,
    Suspend {
        #[arg(value_name = "ISSUER")]
        issuer: String,
    },
}
