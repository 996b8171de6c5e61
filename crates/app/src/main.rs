use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use soundscape_core::{AppConfig, ChannelCapacity, SoundScheduler};
use tracing_subscriber::EnvFilter;

mod script;

use script::Script;

fn main() -> soundscape_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { script, config } => run_simulate(&script, config.as_deref()),
        Commands::Channels { total, config } => run_channels(total, config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> soundscape_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::default()),
    }
}

fn run_simulate(script_path: &Path, config: Option<&Path>) -> soundscape_core::Result<()> {
    let config = load_config(config)?;
    let script = Script::load(script_path)?;
    tracing::info!(?script_path, frames = script.frames.len(), "replaying sound script");

    let mut scheduler = SoundScheduler::from_app_config(script.engine(), config);
    scheduler.configure_sound();
    if let Some((registry, identities)) = script.registry() {
        scheduler.on_registry_reload(registry, identities);
    }

    for frame in &script.frames {
        for _ in 0..frame.repeat {
            scheduler.engine_mut().advance();
            if let Some(load) = frame.background_load {
                scheduler.engine_mut().set_background_load(load);
            }

            let report = scheduler.tick(frame.to_frame());
            println!(
                "tick {}: faded={} created={} admitted={} expired={}{}",
                report.tick,
                report.reconcile.faded,
                report.reconcile.created,
                report.drained.admitted,
                report.drained.expired,
                if report.reset { " reset" } else { "" }
            );
            for line in scheduler.diagnostics() {
                println!("  {line}");
            }
        }
    }
    Ok(())
}

fn run_channels(total: u32, config: Option<&Path>) -> soundscape_core::Result<()> {
    let config = load_config(config)?;
    let capacity = ChannelCapacity::derive(Some(total), &config.sound);
    println!("normal:    {}", capacity.normal_channels);
    println!("streaming: {}", capacity.streaming_channels);
    println!("admission limit: {}", capacity.admission_limit());
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Ambient and spot sound scheduler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a JSON tick script against a simulated host engine.
    Simulate {
        /// Path to the script describing each tick.
        script: PathBuf,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the channel split for a device reporting `total` mono sources.
    Channels {
        #[arg(short, long)]
        total: u32,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
