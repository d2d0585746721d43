mod send_command;
mod token_command;

use std::path::PathBuf;

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    mailrun_config::{Settings, loader},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "mailrun",
    version,
    about = "mailrun: Microsoft 365 OAuth2 token helper and bulk mail dispatcher"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file. Defaults to ./mailrun.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dotenv file to load instead of ./.env.
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive authorization flow and print a refresh token.
    Token(token_command::TokenArgs),
    /// Send the message template to every recipient.
    Send(send_command::SendArgs),
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn load_env_file(path: Option<&PathBuf>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
        },
        None => {
            dotenvy::dotenv().ok();
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    load_env_file(cli.env_file.as_ref())?;
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "mailrun starting");

    let file = loader::load_file(cli.config.as_deref())?;
    let settings = Settings::from_env(file)?;

    match cli.command {
        Commands::Token(args) => token_command::run(args, &settings).await,
        Commands::Send(args) => send_command::run(args, &settings).await,
    }
}
