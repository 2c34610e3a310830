use clap::{ Parser, Subcommand };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    // --- Server Args ---
    /// Host address and port for the HTTP server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:3000", global = true)]
    pub server_addr: String,

    #[arg(long, env = "ENABLE_TLS", default_value = "false", global = true)]
    pub enable_tls: bool,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH", global = true)]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH", global = true)]
    pub tls_key_path: Option<String>,

    // --- Chat Relay Args ---
    /// Workflow webhook that produces chat replies. Checked per request, not at startup.
    #[arg(long, env = "N8N_WEBHOOK_URL", global = true)]
    pub webhook_url: Option<String>,

    /// Timeout in seconds for the outbound webhook call.
    #[arg(long, env = "WEBHOOK_TIMEOUT_SECS", default_value = "30", global = true)]
    pub webhook_timeout_secs: u64,

    /// Chat requests allowed per second for each session. 0 (the default) disables the
    /// limiter; when enabled, a session over its quota gets 429.
    #[arg(long, env = "CHAT_RATE_LIMIT", default_value = "0", global = true)]
    pub chat_rate_limit: u32,

    // --- Run Store Args ---
    /// Run data store type (postgrest, memory)
    #[arg(long, env = "RUN_STORE_TYPE", default_value = "postgrest", global = true)]
    pub store_type: String,

    /// Base URL of the hosted backend (e.g., https://xyz.supabase.co)
    #[arg(long, env = "SUPABASE_URL", global = true)]
    pub backend_url: Option<String>,

    /// Anonymous access key for the hosted backend
    #[arg(long, env = "SUPABASE_ANON_KEY", global = true)]
    pub backend_key: Option<String>,

    /// Timeout in seconds for backend reads.
    #[arg(long, env = "BACKEND_TIMEOUT_SECS", default_value = "10", global = true)]
    pub backend_timeout_secs: u64,

    /// Table holding the run records.
    #[arg(long, env = "RUNS_TABLE", default_value = "test_run_data", global = true)]
    pub runs_table: String,

    /// Column holding the run date.
    #[arg(long, env = "RUNS_DATE_COLUMN", default_value = "Date", global = true)]
    pub date_column: String,

    /// Column holding the best pace as "MM:SS".
    #[arg(long, env = "RUNS_PACE_COLUMN", default_value = "Best Pace", global = true)]
    pub pace_column: String,

    /// JSON array of run records used by the memory store.
    #[arg(long, env = "RUNS_FIXTURE", global = true)]
    pub runs_fixture: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the dashboard and the chat relay (default).
    Serve,
    /// Chat with a running dashboard from the terminal.
    Chat {
        /// Base URL of the dashboard server.
        #[arg(long, env = "DASHBOARD_URL", default_value = "http://127.0.0.1:3000")]
        url: String,
    },
}
