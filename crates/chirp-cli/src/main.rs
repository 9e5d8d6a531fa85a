mod cmd;
mod logging;
mod output;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "chirp",
    about = "Scheduled X bot: posts, likes, replies to mentions and follows back on a cadence",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (a missing default file means built-in defaults)
    #[arg(
        long,
        global = true,
        env = "CHIRP_CONFIG",
        default_value = chirp_core::config::DEFAULT_CONFIG_FILE
    )]
    config: PathBuf,

    /// Override the X API base URL (proxies, local mocks)
    #[arg(long, global = true, env = "CHIRP_API_BASE_URL")]
    api_base_url: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and run the bot until Ctrl-C or a fatal stop
    Run,

    /// Connect and run exactly one cycle
    Tick,

    /// Authenticate and print the account behind the credentials
    Whoami,

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Show each action's cadence
    Schedule,
}

fn main() {
    let code = match real_main() {
        Ok(()) => 0,
        Err(e) => {
            // Print the full error chain (anyhow's alternate Display)
            eprintln!("error: {e:#}");
            1
        }
    };
    std::process::exit(code);
}

/// Everything that must be dropped (log flushing) before the process exits.
fn real_main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Credentials may live in a .env file next to the config.
    let _ = dotenvy::dotenv();

    let config = cmd::load_config(&cli.config)?;

    let (default_level, log_file) = match &cli.command {
        Commands::Run | Commands::Tick => (tracing::Level::INFO, config.logging.file.clone()),
        Commands::Whoami => (tracing::Level::INFO, None),
        Commands::Config { .. } | Commands::Schedule => (tracing::Level::WARN, None),
    };
    let _guard = logging::init(default_level, log_file.as_deref())?;

    let api = cli.api_base_url.as_deref();
    match cli.command {
        Commands::Run => cmd::run::run(&config, api),
        Commands::Tick => cmd::tick::run(&config, api, cli.json),
        Commands::Whoami => cmd::whoami::run(api, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&config, subcommand, cli.json),
        Commands::Schedule => cmd::schedule::run(&config, cli.json),
    }
}
