use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use taskflow::infrastructure::{
    AppConfig, CliArgs, GoogleAuthClient, KeyringTokenStorage, StorageManager, TaskApiClient,
};
use taskflow::presentation::{App, AppSettings};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry().with(filter).init();
    }

    Ok(())
}

fn create_app() -> Result<(App, Option<String>)> {
    let mut args = CliArgs::parse();
    let cli_token = args.token.take();

    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);

    init_logging(&config)?;

    info!(version = taskflow::VERSION, api_url = %config.api_url, "Starting taskflow");

    let settings = AppSettings::from_config(&config)?;
    let auth_client = Arc::new(GoogleAuthClient::new(
        config.google_client_id.clone(),
        config.request_timeout(),
    )?);
    let task_api = Arc::new(TaskApiClient::new(
        settings.api_base.clone(),
        config.request_timeout(),
    )?);
    let token_storage = Arc::new(KeyringTokenStorage::new());

    let app = App::new(auth_client, task_api, token_storage, settings);

    Ok((app, cli_token))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let (app, cli_token) = create_app()?;

    let mut terminal = ratatui::init();

    let result = app.run(&mut terminal, cli_token).await;

    ratatui::restore();

    result
}
