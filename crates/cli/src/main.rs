use clap::{Parser, Subcommand};
use proxyscan_domain::{CliOverrides, RecordType};
use tracing::info;

mod bootstrap;
mod scan;

#[derive(Parser)]
#[command(name = "proxyscan")]
#[command(version)]
#[command(about = "Proxyscan - asynchronous DNS resolution and negative cache for proxy scanning")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Nameserver to query instead of the configured sources (repeatable)
    #[arg(short = 'n', long = "nameserver", value_name = "ADDR")]
    nameservers: Vec<String>,

    /// Seconds before an unanswered query times out
    #[arg(short = 't', long)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve names concurrently through the poll-driven resolver
    Resolve {
        /// Record type to ask for
        #[arg(long = "type", default_value = "A")]
        record_type: RecordType,

        /// Names or addresses to resolve
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Resolve a single name with the blocking helper
    Lookup {
        /// A or AAAA
        #[arg(long = "type", default_value = "A")]
        record_type: RecordType,

        name: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        log_level: cli.log_level.clone(),
        nameservers: cli.nameservers.clone(),
        timeout: cli.timeout,
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;

    bootstrap::init_logging(&config);

    info!("Starting Proxyscan v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Resolve { record_type, names } => {
            scan::run_resolve(&config, record_type, &names).await
        }
        Command::Lookup { record_type, name } => scan::run_lookup(&config, record_type, name).await,
    }
}
