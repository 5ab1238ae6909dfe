//! Command-line surface and validation
//!
//! Flag names keep the underscore spelling used across the mpistat tooling
//! so existing invocations carry over. Validation runs before any tree
//! allocation; violations are reported on stderr and exit with status 1.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use treeserve::Error;

/// Raw command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "treeserve")]
#[command(about = "Serve aggregate filesystem statistics built from mpistat lstat dumps")]
pub struct Args {
    /// Comma/whitespace-separated paths of gzipped lstat dumps
    #[arg(long)]
    pub lstat: Option<String>,

    /// Path of a previously serialized tree (reserved, not implemented)
    #[arg(long)]
    pub serial: Option<PathBuf>,

    /// Path to serialize the built tree to (reserved, not implemented)
    #[arg(long)]
    pub dump: Option<PathBuf>,

    /// Port to listen on
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub ip: String,

    /// Worker threads for the HTTP runtime (0 means one per core)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Memory limit in MB before the watchdog kills the process
    #[arg(long = "mem_limit", default_value_t = 4096)]
    pub mem_limit: u64,

    /// Seconds between watchdog memory checks
    #[arg(long = "mem_check_interval", default_value_t = 60)]
    pub mem_check_interval: u64,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Input dump files, in ingest order.
    pub lstat_files: Vec<PathBuf>,
    /// Reserved dump target, warned about and skipped.
    pub dump: Option<PathBuf>,
    /// Bind address for the HTTP listener.
    pub listen_addr: SocketAddr,
    /// Worker threads (0 = runtime default).
    pub threads: usize,
    /// Watchdog limit in MB.
    pub mem_limit_mb: u64,
    /// Watchdog check interval in seconds.
    pub mem_check_interval_secs: u64,
}

impl ServerConfig {
    /// Validate raw arguments into a runnable configuration.
    pub fn from_args(args: Args) -> Result<Self, Error> {
        match (&args.lstat, &args.serial) {
            (None, None) => {
                return Err(Error::Config(
                    "you must specify an lstat file OR a serial file".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(Error::Config(
                    "specify an lstat file or a serial file, not both".to_string(),
                ))
            }
            (None, Some(_)) => {
                return Err(Error::Config(
                    "tree deserialization (--serial) is not implemented".to_string(),
                ))
            }
            (Some(_), None) => {}
        }

        let lstat_files = split_input_list(args.lstat.as_deref().unwrap_or_default());
        if lstat_files.is_empty() {
            return Err(Error::Config("--lstat names no files".to_string()));
        }

        let listen_addr: SocketAddr = format!("{}:{}", args.ip, args.port)
            .parse()
            .map_err(|_| Error::Config(format!("invalid bind address {:?}", args.ip)))?;

        Ok(Self {
            lstat_files,
            dump: args.dump,
            listen_addr,
            threads: args.threads,
            mem_limit_mb: args.mem_limit,
            mem_check_interval_secs: args.mem_check_interval,
        })
    }
}

/// Split the `--lstat` value on commas and whitespace, dropping empties.
fn split_input_list(value: &str) -> Vec<PathBuf> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(PathBuf::from)
        .collect()
}
