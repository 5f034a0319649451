mod cli;
mod commands;
mod config;
mod storage;

use clap::Parser;
use color_eyre::Result;
use taskvault_storage::password_source::generate_password;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Command, ConfigCommand};

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = cli::Cli::parse();
    match cli.command {
        Command::Version => {
            print_version();
            return Ok(());
        }
        Command::GenKey { length } => {
            println!("{}", generate_password(length).as_str());
            return Ok(());
        }
        _ => {}
    }

    let config = config::load()?;
    init_tracing(config.log_level);
    config.log_summary();

    if let Command::Config(ConfigCommand::Init) = cli.command {
        return init_config(&config);
    }

    let storage = storage::store_from_config(&config)?;
    match cli.command {
        Command::Init => {
            println!("Storage ready at {}", config.data_dir.display());
            commands::info(&storage)?
        }
        Command::Load { output } => commands::load(&storage, output.as_deref())?,
        Command::Save { input } => commands::save(&storage, input.as_deref())?,
        Command::Backup => commands::backup(&storage)?,
        Command::Backups => commands::list_backups(&storage)?,
        Command::Restore { name } => commands::restore(&storage, &name)?,
        Command::Prune => commands::prune(&storage)?,
        Command::Info => commands::info(&storage)?,
        Command::Version | Command::GenKey { .. } | Command::Config(_) => {}
    }

    Ok(())
}

fn init_tracing(level: config::LogLevel) {
    // RUST_LOG wins over the configured level.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("taskvault {}", env!("CARGO_PKG_VERSION"));
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
