use clap::{Parser, Subcommand};
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};

mod commands;
mod host;

#[derive(Parser)]
#[command(name = "calwake", version, about = "Calendar alarm and live notification engine")]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the refresh planners now
    Refresh {
        /// Only refresh the live display, not the alarm set
        #[arg(long)]
        live_only: bool,
        /// Print the dispatch summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fire any due timers, as the OS alarm facility would
    Tick,
    /// Simulate a reboot: timers are gone, persisted alarms re-arm
    Boot,
    /// Upcoming alarm management
    Alarms {
        #[command(subcommand)]
        action: commands::alarms::AlarmsAction,
    },
    /// Local calendar management
    Events {
        #[command(subcommand)]
        action: commands::events::EventsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let _ = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );

    let result = match cli.command {
        Commands::Refresh { live_only, json } => commands::refresh::run(live_only, json),
        Commands::Tick => commands::lifecycle::tick(),
        Commands::Boot => commands::lifecycle::boot(),
        Commands::Alarms { action } => commands::alarms::run(action),
        Commands::Events { action } => commands::events::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
