use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "taskflow",
    version,
    about = "A terminal task board with live updates",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Base URL of the task API.
    #[arg(long, env = "TASKFLOW_API_URL", value_name = "URL")]
    pub api_url: Option<String>,

    /// Google ID token used to sign in.
    #[arg(long, env = "TASKFLOW_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// OAuth client id the ID token must be issued for.
    #[arg(long, env = "TASKFLOW_GOOGLE_CLIENT_ID", value_name = "ID")]
    pub google_client_id: Option<String>,

    /// Remember the token in the system keyring.
    #[arg(long)]
    pub persist_token: Option<bool>,

    /// Subscribe to live task deletions.
    #[arg(long)]
    pub live_updates: Option<bool>,

    /// Request timeout in seconds.
    #[arg(long)]
    pub request_timeout: Option<u64>,

    /// Notification duration in seconds.
    #[arg(long)]
    pub notification_duration: Option<u64>,
}
