mod config;
mod doctor_cmd;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use teloxide::Bot;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use soundrelay_channels::{
    ChannelAdapter, DeliveryMode, MessageRouter, TelegramAdapter, TelegramTransport,
};
use soundrelay_media::{PipelineSettings, TrackAcquirer, TrackPipeline, YtDlpExtractor};

use config::Config;

#[derive(Parser)]
#[command(name = "soundrelay")]
#[command(about = "soundrelay: SoundCloud tracks delivered as Telegram audio")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot
    Serve {
        /// How updates arrive: polling or webhook
        #[arg(short, long)]
        mode: Option<String>,
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Query a running instance on the local port
    Status,
    /// Check the token, extractor, and scratch space
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    // `--help` and `--version` must work even with a broken environment.
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    soundrelay_logging::init_logger(config.log_dir.as_deref(), &config.log_level);

    match cli.command {
        Commands::Serve { mode, port } => {
            let config = serve_config(config, mode.as_deref(), port)?;
            run_server(config).await?;
        }
        Commands::Status => {
            println!("soundrelay status: checking...");
            let client = reqwest::Client::new();
            match client
                .get(format!("http://localhost:{}/", config.port))
                .send()
                .await
            {
                Ok(resp) => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(_) => {
                    println!("soundrelay is not running on port {}", config.port);
                }
            }
        }
        Commands::Doctor => doctor_cmd::run(&config).await?,
    }

    Ok(())
}

/// Apply `serve` flags over the environment configuration.
fn serve_config(config: Config, mode: Option<&str>, port: Option<u16>) -> Result<Config> {
    Ok(Config {
        mode: match mode {
            Some(raw) => raw.parse()?,
            None => config.mode,
        },
        port: port.unwrap_or(config.port),
        ..config
    })
}

async fn run_server(config: Config) -> Result<()> {
    let token = config.require_token()?;
    info!(
        mode = %config.mode,
        port = config.port,
        bind = %config.bind_address,
        extractor = %config.ytdlp_path.display(),
        "Starting soundrelay"
    );

    let bot = Bot::new(token);
    let transport = Arc::new(TelegramTransport::new(bot.clone()));

    let extractor = Arc::new(YtDlpExtractor::with_binary(config.ytdlp_path.clone()));
    let acquirer = Arc::new(TrackAcquirer::new(extractor));
    let pipeline = Arc::new(TrackPipeline::new(
        acquirer,
        transport.clone(),
        PipelineSettings {
            acquire_timeout: config.acquire_timeout,
            scratch_root: config.scratch_dir.clone(),
        },
    ));
    let router = Arc::new(MessageRouter::new(transport, pipeline));

    let adapter = Arc::new(TelegramAdapter::new(
        bot,
        router,
        config.mode,
        config.public_base_url.clone(),
    ));

    let app = adapter.build_router().layer(TraceLayer::new_for_http());
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, adapter = adapter.name(), "HTTP listening");

    match config.mode {
        DeliveryMode::Webhook => {
            adapter.start().await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        DeliveryMode::Polling => {
            let server = tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app).await {
                    error!(error = %e, "Health server failed");
                }
            });

            let stopper = Arc::clone(&adapter);
            tokio::spawn(async move {
                shutdown_signal().await;
                stopper.stop().await;
            });

            adapter.start().await?;
            server.abort();
        }
    }

    info!("soundrelay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
