//! Headless API server entrypoint.

use shortpaste_core::constants::CONFIG_PATH_ENV;
use shortpaste_server::{resolve_bind_address, serve_router, AppState, Config, DEFAULT_PORT};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CliFlags {
    help: bool,
}

fn parse_cli_flags(args: &[String]) -> anyhow::Result<CliFlags> {
    let mut flags = CliFlags::default();
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => flags.help = true,
            value if value.starts_with('-') => {
                anyhow::bail!(
                    "Unknown option: '{}'. Use --help to see supported options.",
                    value
                );
            }
            value => {
                anyhow::bail!(
                    "Unexpected positional argument: '{}'. Use --help to see supported options.",
                    value
                );
            }
        }
    }
    Ok(flags)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "shortpaste=info,shortpaste_server=info,shortpaste_core=info,tower_http=warn"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli_flags = parse_cli_flags(&args)?;

    if cli_flags.help {
        print_help();
        return Ok(());
    }

    let config = Config::load()?;
    tracing::info!(
        "Keys: documents {} x {}, urls {} x {}",
        config.key_generator.kind,
        config.key_length,
        config.url_key_generator.kind,
        config.url_key_length
    );

    let state = AppState::open(config.clone())?;
    let loaded = state.store.preload(&config.documents)?;
    if loaded > 0 {
        tracing::info!("Loaded {} static document(s)", loaded);
    }

    let bind_addr = resolve_bind_address(&config);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let actual_addr = listener.local_addr().unwrap_or(bind_addr);
    tracing::info!("shortpaste running at http://{}", actual_addr);

    serve_router(listener, state, shutdown_signal()).await?;
    tracing::info!("shortpaste stopped");

    Ok(())
}

fn print_help() {
    println!("shortpaste server\n");
    println!("Usage: shortpaste [OPTIONS]\n");
    println!("Options:");
    println!("  --help            Show this help message");
    println!("\nEnvironment variables:");
    println!(
        "  {}  JSON configuration file (camelCase keys)",
        CONFIG_PATH_ENV
    );
    println!("  HOST              Bind host (default: 127.0.0.1)");
    println!("  PORT              Server port (default: {})", DEFAULT_PORT);
    println!("  STORAGE_PATH      Document directory (default: ./data)");
    println!("  STORAGE_TYPE      file | redb | memory (default: file)");
    println!("  KEY_LENGTH        Length of document keys (default: 10)");
    println!("  URL_KEY_LENGTH    Length of URL alias keys (default: 7)");
    println!("  MAX_DOCUMENT_LENGTH  Maximum document size in bytes");
    println!("  TRUST_PROXY       Rate-limit by X-Forwarded-For");
    println!("  RUST_LOG          Log filter (default: shortpaste=info)");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
