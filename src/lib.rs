pub mod chart;
pub mod cli;
pub mod models;
pub mod pace;
pub mod relay;
pub mod runs;
pub mod server;
pub mod store;
pub mod widget;

use cli::{ Args, Command };
use governor::{ Quota, RateLimiter };
use log::{ info, warn };
use relay::WebhookClient;
use runs::RunColumns;
use server::{ AppState, Server };
use std::error::Error;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Wires the run store, webhook client and limiter from configuration.
pub fn build_state(args: &Args) -> Result<AppState, Box<dyn Error + Send + Sync>> {
    let store = store::create_run_store(args)?;
    let webhook = WebhookClient::new(
        args.webhook_url.clone(),
        Duration::from_secs(args.webhook_timeout_secs)
    )?;
    if !webhook.is_configured() {
        warn!("N8N_WEBHOOK_URL is not set. Chat requests will fail with a configuration error.");
    }
    let chat_limiter = NonZeroU32::new(args.chat_rate_limit)
        .map(|rate| Arc::new(RateLimiter::keyed(Quota::per_second(rate))));

    Ok(AppState {
        store,
        columns: Arc::new(RunColumns {
            date: args.date_column.clone(),
            pace: args.pace_column.clone(),
        }),
        webhook,
        chat_limiter,
    })
}

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    if let Some(Command::Chat { url }) = &args.command {
        return widget::run_terminal_chat(url).await;
    }

    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("Webhook Configured: {}", args.webhook_url.is_some());
    info!("Webhook Timeout: {}s", args.webhook_timeout_secs);
    info!("Chat Rate Limit (per session): {}/s", args.chat_rate_limit);
    info!("Run Store Type: {}", args.store_type);
    if let Some(url) = &args.backend_url {
        info!("Backend URL: {}", url);
    }
    info!("Backend Timeout: {}s", args.backend_timeout_secs);
    info!("Runs Table: {}", args.runs_table);
    info!("Date Column: {}", args.date_column);
    info!("Pace Column: {}", args.pace_column);
    info!("-------------------------");

    let state = build_state(&args)?;
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, state, args);
    server.run().await?;

    Ok(())
}
