use clap::Parser;
use nowwit_core::NowwitConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "nowwit.toml")]
    config: String,

    /// Print the effective configuration status and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match NowwitConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging (RUST_LOG wins over the configured level)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    if args.check {
        println!("Model:    {} @ {}", config.model.model, config.model.base_url);
        println!("Listen:   {}:{}", config.http.host, config.http.port);
        match NowwitConfig::api_key() {
            Some(_) => println!("✅ {} is set", nowwit_core::config::API_KEY_ENV),
            None => {
                println!("❌ {} is not set", nowwit_core::config::API_KEY_ENV);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let state = nowwit_server::build_state(config, None);

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    nowwit_server::http::start_http_server(state, tx.subscribe()).await?;

    Ok(())
}
