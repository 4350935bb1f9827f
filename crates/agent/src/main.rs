use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use eagle_agent::VERSION;
use eagle_agent::agent_modules::config::{AgentConfig, ConfigFile};
use eagle_agent::web::{AppState, Variant, create_axum_router};

#[derive(Parser, Debug)]
#[command(author, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Server flavour to run
    #[arg(long, value_enum, default_value_t = Variant::Public)]
    variant: Variant,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "agent.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Manually check for --version before full parsing to keep the output to a single line.
    if std::env::args().any(|arg| arg == "--version") {
        println!("Agent version: {VERSION}");
        return Ok(());
    }

    let args = Args::parse();

    let (config, config_file) = match AgentConfig::load(args.config.as_deref()) {
        Ok((config, config_file)) => (Arc::new(config), config_file),
        Err(e) => {
            eprintln!("Failed to load agent configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir);
    info!(version = VERSION, variant = ?args.variant, "Starting agent.");

    match &config_file {
        ConfigFile::NotGiven => {}
        ConfigFile::Missing(path) => {
            warn!(path = ?path, "Config file not found, using environment and defaults.")
        }
        ConfigFile::Loaded(path) => info!(path = ?path, "Loaded config file."),
    }

    if args.variant == Variant::Secured && !config.has_credentials() {
        warn!("Basic-auth username or password is empty; requests with matching empty credentials will be accepted.");
    }

    let app_state = Arc::new(AppState::from_system(config));
    let app = create_axum_router(args.variant, app_state);

    let addr = args.variant.listen_address();
    let socket = tokio::net::TcpSocket::new_v4()?;
    socket.set_reuseaddr(true)?;
    if let Err(e) = socket.bind(addr) {
        error!(address = %addr, error = %e, "Failed to bind listening port.");
        return Err(e.into());
    }
    let listener = socket.listen(1024)?;
    info!(address = %addr, "HTTP server listening.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(Box::new)?;

    info!("Agent stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal.");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}
