use clap::Parser;
use paysplit::cli::{Cli, Commands, SheetCommands};
use paysplit::config::{Config, LogFormat};
use paysplit::{cli, create_app, startup};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(format: LogFormat) {
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Config => cli::handle_config_show(&config),
        Commands::Check => cli::handle_check(&config).await,
        Commands::Sheet(SheetCommands::Init) => cli::handle_sheet_init(&config).await,
        Commands::Summary { month } => cli::handle_summary(&config, month).await,
        Commands::Token {
            subject,
            email,
            hours,
        } => cli::handle_token(&config, &subject, email.as_deref(), hours),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let state = startup::build_state(&config)?;

    if let Err(e) = state.payments.prepare_store().await {
        tracing::warn!(error = %e, "Could not verify sheet headers at startup");
    }

    let app = create_app(state).layer(startup::cors_layer(&config.allowed_origins)?);

    let addr = config.bind_address();
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
