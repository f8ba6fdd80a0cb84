pub mod admin;
pub mod api;
pub mod ask;
mod commands;
pub mod config;
pub mod error;
pub mod speakers;
pub mod text;
pub mod wake;

use clap::Parser;
use commands::{Cli, Command};
use config::ClientConfig;
use error::AppError;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Also routes `log` records from the library into the subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(ClientConfig::default_path);
    let config = ClientConfig::load(config_path.as_deref())?;
    tracing::info!(base_url = %config.base_url, "sttcast client starting");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(dispatch(&config, cli.command));
    if let Err(AppError::Unauthorized { login_url }) = &result {
        eprintln!("Login required. Sign in at {} and set STTCAST_SESSION.", login_url);
        std::process::exit(2);
    }
    result.map_err(Into::into)
}

async fn dispatch(config: &ClientConfig, command: Command) -> Result<(), AppError> {
    match command {
        Command::Ask {
            question,
            lang,
            html,
        } => commands::ask::ask(config, &question, lang.as_deref(), html.as_deref()).await,
        Command::Saved { uuid, lang } => commands::ask::saved(config, &uuid, lang.as_deref()).await,
        Command::Speakers {
            from,
            to,
            tags,
            svg_dir,
        } => commands::speakers::speakers(config, from, to, &tags, svg_dir.as_deref()).await,
        Command::Admin(command) => commands::admin::admin(config, command).await,
    }
}
