use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "rivalt-cli", version, about = "RiValT multi-timer CLI")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Control and edit timers
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Edit timer groups
    Group {
        #[command(subcommand)]
        action: commands::group::GroupAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Apply a sync message from a paired device
    Sync(commands::sync::SyncArgs),
    /// Run the selected timer in the foreground until it halts
    Run(commands::run::RunArgs),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("RIVALT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Group { action } => commands::group::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Sync(args) => commands::sync::run(args),
        Commands::Run(args) => commands::run::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
