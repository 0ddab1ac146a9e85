use anyhow::Result;
use std::env;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voxpense::{app, logging::ConsoleFormatter, secrets, server, Config, ConfigManager, ExpenseApp};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voxpense=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().event_format(ConsoleFormatter::new()))
        .init();

    let args: Vec<String> = env::args().collect();

    let config_manager = ConfigManager::load()?;
    let config = config_manager.get();

    if args.iter().any(|arg| arg == "--recent") {
        return app::print_recent(&config);
    }

    if args.iter().any(|arg| arg == "--serve") {
        return run_server(config).await;
    }

    let guarded = args.iter().any(|arg| arg == "--guarded");
    run_logger(config, guarded).await
}

async fn run_logger(config: Config, guarded: bool) -> Result<()> {
    let mut app = ExpenseApp::new(config, guarded)?;

    tokio::select! {
        result = app.run() => {
            result?;
        }
        _ = signal::ctrl_c() => {
            info!("");
        }
    }

    info!("Expense Logger Stopped!");
    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    let cwd = env::current_dir()?;
    let secrets = secrets::load_from(&cwd)?;
    info!("Successfully loaded API token from {}", secrets::SECRETS_FILE);

    server::write_config_artifact(&cwd, &secrets)?;

    tokio::select! {
        result = server::serve(config.server_port) => {
            result?;
        }
        _ = signal::ctrl_c() => {
            info!("");
        }
    }

    info!("Server stopped");
    Ok(())
}
