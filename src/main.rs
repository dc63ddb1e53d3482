use acmezone::{Config, Controller, SharedConfig};
use anyhow::{anyhow, Result};
use is_terminal::IsTerminal;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let mut first_args = std::env::args().take(2);
    let (program_name, config_file) = (
        first_args.next().unwrap_or("acmezone".to_string()),
        first_args.next(),
    );

    let config = config_init(&program_name, config_file)?;
    let initial_zone = config.initial_snapshot()?;

    let controller = Arc::new(Controller::new(
        &config,
        initial_zone,
        tracing::info_span!("acmezone"),
    ));
    controller.start().await?;

    tracing::info!("API listening on {}", &config.api_bind_addr);
    let api_server = acmezone::api::new(config.clone(), controller.clone())?;
    let api_handle = tokio::spawn(api_server);

    let outcome = tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
            Ok(())
        },
        api_res = api_handle => match api_res {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(err.into()),
            Err(err) => Err(err.into()),
        },
    };

    controller.stop().await;
    tracing::info!("goodbye");
    outcome
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_ansi(std::io::stdout().is_terminal()))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "acmezone=info".into()),
        )
        .init();
}

fn config_init(program_name: &str, config_file: Option<String>) -> Result<SharedConfig> {
    match config_file {
        None => Err(anyhow!("usage: {program_name} /path/to/config.json")),
        Some(config_file) => {
            tracing::debug!("loaded config from {config_file}");
            let config = Config::try_from_file(&config_file)?;
            Ok(Arc::new(config))
        }
    }
}
