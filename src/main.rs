use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::signal;

use livegrab::cli::Cli;
use livegrab::core::config::RecorderConfig;
use livegrab::core::web_server::{start_trigger_server, TriggerState};
use livegrab::core::{init_logger, StatusReporter};
use livegrab::platform::{StreamPlatform, TwitchClient, VkClient};
use livegrab::telegram::{NoopNotifier, Notifier, TelegramNotifier};
use livegrab::watcher::{start_scheduler, Orchestrator, RecorderSettings, StreamProbe};

/// Main entry point for the recorder
///
/// # Errors
/// Returns an error if startup validation fails (missing binary, output directory or
/// template placeholders); no check cycle runs in that case.
#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    let cli = Cli::parse_args();

    init_logger(cli.log_file.as_deref(), cli.verbose)?;

    let cwd = std::env::current_dir()?;
    let config = match RecorderConfig::from_cli(&cli, &cwd) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return Err(e.into());
        }
    };
    log::info!("livegrab v{}", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    let twitch: Arc<dyn StreamPlatform> = Arc::new(TwitchClient::new(config.device_id.clone())?);
    let vk: Arc<dyn StreamPlatform> = Arc::new(VkClient::new(config.vk_token.clone())?);
    let probe = StreamProbe::new(twitch, vk, config.channel.clone());

    let notifier: Arc<dyn Notifier> = match config.telegram {
        Some(ref telegram) => Arc::new(TelegramNotifier::new(telegram)),
        None => Arc::new(NoopNotifier),
    };
    let status = Arc::new(StatusReporter::new(notifier));

    let orchestrator = Arc::new(Orchestrator::new(RecorderSettings::from(&config), probe, status));

    let server = config.trigger.clone().map(|trigger| {
        let state = TriggerState::new(Arc::clone(&orchestrator), &trigger, config.http_delay);
        tokio::spawn(async move {
            if let Err(e) = start_trigger_server(trigger, state).await {
                log::error!("Trigger server failed: {}", e);
            }
        })
    });

    let scheduler = start_scheduler(Arc::clone(&orchestrator), config.poll_interval);

    wait_for_signal().await;
    if orchestrator.shutdown().await {
        log::info!("Shutting down gracefully...");
    }

    // Later signals are only logged; the active recording gets to finish its file.
    let ignore_signals = tokio::spawn(async {
        loop {
            wait_for_signal().await;
            log::info!("Already shutting down, signal ignored");
        }
    });

    orchestrator.wait_idle().await;
    ignore_signals.abort();

    if let Err(e) = scheduler.await {
        log::warn!("Scheduler task ended abnormally: {}", e);
    }
    if let Some(server) = server {
        if let Err(e) = server.await {
            log::warn!("Trigger server task ended abnormally: {}", e);
        }
    }

    log::info!("Bye");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal as unix_signal, SignalKind};

    match unix_signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = signal::ctrl_c() => log::info!("SIGINT received"),
                _ = term.recv() => log::info!("SIGTERM received"),
            }
        }
        Err(e) => {
            log::warn!("Cannot listen for SIGTERM: {}", e);
            if let Err(e) = signal::ctrl_c().await {
                log::error!("Cannot listen for SIGINT: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match signal::ctrl_c().await {
        Ok(()) => log::info!("Ctrl-C received"),
        Err(e) => {
            log::error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
