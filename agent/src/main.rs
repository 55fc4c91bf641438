use lending_agent::config::{load_config, load_default_config};
use lending_agent::control::{ControlSurfaceBridge, SettingsStore};
use lending_agent::lending::{
    Clock, JsonStatusLog, LendingRunner, LendingSession, SimulatedExchange, SystemClock,
    TracingNotifier,
};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("lending_agent=info".parse()?))
        .init();

    // lending-agent [config.json] [--dry-run]
    let args: Vec<String> = std::env::args().skip(1).collect();
    let dry_run = args.iter().any(|a| a == "--dry-run");
    let config = match args.iter().find(|a| !a.starts_with("--")) {
        Some(path) => load_config(path)?,
        None => load_default_config()?,
    };
    config.validate()?;

    let policies = config.policy_store()?;
    let mut settings = config.session_settings()?;
    settings.dry_run |= dry_run;
    if settings.dry_run {
        tracing::info!("Dry run: no transfers, cancels or offers will be sent");
    }

    let exchange = Arc::new(match &config.api.seed_file {
        Some(path) => SimulatedExchange::from_seed_file(path)?,
        None => SimulatedExchange::new(),
    });
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let status = Arc::new(JsonStatusLog::new(
        config.status.max_lines,
        config.status.file.clone(),
        Arc::clone(&clock),
    ));
    let notifier = Arc::new(TracingNotifier::new(config.notify.channels.clone()));

    let bridge = ControlSurfaceBridge::open(SettingsStore::new(&config.control.settings_file))?;
    let watcher = bridge.spawn_watcher(config.control.poll_interval());

    tracing::info!(
        currencies = ?policies.currencies().map(|c| c.as_str()).collect::<Vec<_>>(),
        paused = bridge.state().paused,
        "Starting lending agent..."
    );

    let session = LendingSession::new(
        exchange,
        policies,
        settings,
        bridge.handle(),
        status,
        notifier,
        clock,
    );
    let runner = LendingRunner::new(session);
    let result = runner.run().await;

    watcher.abort();
    result?;
    Ok(())
}
