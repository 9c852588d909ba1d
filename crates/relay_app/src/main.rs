mod config;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use relay_engine::{run_engine, TelegramNotifier};
use relay_logging::{relay_error, relay_info, LevelFilter, LogDestination};
use tokio_util::sync::CancellationToken;

use config::AppConfig;

fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };
    relay_logging::initialize(LogDestination::Both, LevelFilter::Info, &config.log_file);

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            relay_error!("Relay failed: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(config: AppConfig) -> anyhow::Result<()> {
    let notifier = TelegramNotifier::new(
        config.telegram_api.clone(),
        config.bot_token.clone(),
        config.chat_id.clone(),
        Duration::from_secs(15),
    )
    .context("building notification sink")?;
    let settings = config.engine_settings();

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(async move {
        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                relay_info!("Shutdown requested; finishing current cycle");
            }
            signal_token.cancel();
        });

        let state = run_engine(settings, notifier, shutdown).await;
        relay_info!("Stopped with {} ranges in the baseline", state.snapshot.len());
    });
    Ok(())
}
