mod cli;
mod format;

use std::time::Duration;

use clap::Parser;
use lightproxy_install::{InstallConfig, Installer};

use cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_new(cli.log_directive())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // Hold the non-blocking guards for the lifetime of main so logs flush on exit.
    let _log_guards = init_logging(env_filter, cli.log_file.as_deref())?;

    let command = cli.command.unwrap_or(Command::Install);

    if command == Command::Version {
        if cli.json {
            println!(
                "{}",
                serde_json::json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "platform": lightproxy_common::PlatformKind::current(),
                })
            );
        } else {
            println!("lightproxy-install {}", env!("CARGO_PKG_VERSION"));
        }
        return Ok(());
    }

    let config = load_config(&cli)?;
    tracing::debug!(?config, "Resolved install config");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async_main(command, config, cli.json))
}

async fn async_main(command: Command, config: InstallConfig, json: bool) -> anyhow::Result<()> {
    let installer = Installer::for_platform(config);

    match command {
        Command::Status => {
            let status = installer.status().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                format::install_status(&status, installer.config());
            }
        }
        Command::Install => {
            let report = installer.check_install_status().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                format::install_report(&report, installer.config());
            }
        }
        Command::Version => {}
    }
    Ok(())
}

/// File config with CLI overrides applied on top.
fn load_config(cli: &Cli) -> anyhow::Result<InstallConfig> {
    let mut config = InstallConfig::load(cli.config.as_deref())?;
    if let Some(secs) = cli.prompt_timeout {
        config = config.with_prompt_timeout(Some(Duration::from_secs(secs)));
    }
    Ok(config)
}

/// Stderr logging through a non-blocking writer, plus an optional
/// append-mode log file.
fn init_logging(
    env_filter: tracing_subscriber::EnvFilter,
    log_file: Option<&std::path::Path>,
) -> anyhow::Result<Vec<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::prelude::*;

    let (nb_stderr, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(nb_stderr);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let (nb_file, file_guard) = tracing_appender::non_blocking(file);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(nb_file);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();

        Ok(vec![stderr_guard, file_guard])
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();

        Ok(vec![stderr_guard])
    }
}
