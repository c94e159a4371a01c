//! Server configuration, loaded from environment variables at startup.

use std::time::Duration;

use clap::Parser;

const MIB: usize = 1024 * 1024;
const DEFAULT_MAX_UPLOAD_MB: usize = 50;

/// Command-line overrides. Anything not given here comes from the
/// environment (see [`Config::from_env`]).
#[derive(Debug, Parser)]
#[command(name = "agentdesk-server", version, about = "In-memory development API for the agent console")]
pub struct Cli {
    /// Address to bind, overrides `AGENTDESK_BIND`.
    #[arg(long)]
    pub bind: Option<String>,

    /// Emit JSON log lines, overrides `AGENTDESK_LOG_JSON`.
    #[arg(long)]
    pub log_json: bool,
}

/// Runtime configuration for agentdesk-server.
///
/// Every field has a default so the server works out-of-the-box without any
/// environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:5175"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Shared bearer secret (default: `"mock-token"`).
    pub token: String,

    /// Also require the token on agent, knowledge-base, workflow and plugin
    /// routes.
    pub guard_resources: bool,

    /// Comma-separated list of allowed CORS origins; `None` allows any.
    pub cors_allowed_origins: Option<String>,

    /// Mount Swagger UI at `/swagger-ui`.
    pub enable_swagger: bool,

    /// Simulated document processing time.
    pub processing_delay: Duration,

    /// Characters per streamed chat chunk.
    pub stream_chunk_chars: usize,

    /// Pause between streamed chat chunks.
    pub stream_chunk_delay: Duration,

    /// Request body cap for document uploads, in bytes.
    pub max_upload_bytes: usize,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("AGENTDESK_BIND", "0.0.0.0:5175"),
            log_level: env_or("AGENTDESK_LOG", "info"),
            log_json: env_flag("AGENTDESK_LOG_JSON", false),
            token: env_or("AGENTDESK_TOKEN", "mock-token"),
            guard_resources: env_flag("AGENTDESK_GUARD_RESOURCES", false),
            cors_allowed_origins: std::env::var("AGENTDESK_CORS_ORIGINS").ok(),
            enable_swagger: env_flag("AGENTDESK_ENABLE_SWAGGER", true),
            processing_delay: Duration::from_millis(parse_env("AGENTDESK_PROCESSING_DELAY_MS", 1500)),
            stream_chunk_chars: parse_env("AGENTDESK_STREAM_CHUNK_CHARS", 8usize).max(1),
            stream_chunk_delay: Duration::from_millis(parse_env("AGENTDESK_STREAM_CHUNK_DELAY_MS", 40)),
            max_upload_bytes: parse_env("AGENTDESK_MAX_UPLOAD_MB", DEFAULT_MAX_UPLOAD_MB).saturating_mul(MIB),
        }
    }

    /// Apply command-line overrides on top of the environment.
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(bind) = &cli.bind {
            self.bind_address = bind.clone();
        }
        if cli.log_json {
            self.log_json = true;
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5175".to_owned(),
            log_level: "info".to_owned(),
            log_json: false,
            token: "mock-token".to_owned(),
            guard_resources: false,
            cors_allowed_origins: None,
            enable_swagger: true,
            processing_delay: Duration::from_millis(1500),
            stream_chunk_chars: 8,
            stream_chunk_delay: Duration::from_millis(40),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * MIB,
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
