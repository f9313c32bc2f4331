// # recsyncd - record sync daemon
//
// Thin integration layer over recsync-core. All sync logic lives in the
// library; this binary:
// 1. Reads configuration from environment variables
// 2. Initializes logging and the runtime
// 3. Builds the DigitalOcean store, the HTTP IP source and the Syncer
// 4. Runs the Poller until a signal or a fatal write error
//
// ## Configuration
//
// - `RECSYNC_API_TOKEN`: DigitalOcean API token (required)
// - `RECSYNC_DOMAIN`: Domain holding the record (required)
// - `RECSYNC_RECORD_TYPE`: Record type (default `A`)
// - `RECSYNC_RECORD_NAME`: Record name (default `@`)
// - `RECSYNC_FREQUENCY_SECS`: Poll and refresh interval in seconds (default 5)
// - `RECSYNC_IP_SOURCE_URL`: IP echo service (default `https://api.ipify.org`)
// - `RECSYNC_LOG_LEVEL`: trace, debug, info, warn or error (default `info`)
//
// ## Example
//
// ```bash
// export RECSYNC_API_TOKEN=your_token
// export RECSYNC_DOMAIN=example.com
// export RECSYNC_RECORD_NAME=home
//
// recsyncd
// ```

use anyhow::{Context, Result};
use recsync_core::{IpVersion, Poller, PollerConfig, SyncPolicy, SyncTarget, Syncer, SyncerConfig};
use recsync_ip_http::{DEFAULT_IP_SERVICE, HttpIpSource};
use recsync_provider_digitalocean::DigitalOceanStore;
use std::env;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error, including a failed record update
#[derive(Debug, Clone, Copy)]
enum RecsyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<RecsyncExitCode> for ExitCode {
    fn from(code: RecsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

const DEFAULT_FREQUENCY_SECS: u64 = 5;
const MAX_FREQUENCY_SECS: u64 = 86_400;

/// Application configuration
struct Config {
    api_token: String,
    domain: String,
    record_type: String,
    record_name: String,
    frequency_secs: u64,
    ip_source_url: String,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let frequency_secs = match lookup("RECSYNC_FREQUENCY_SECS") {
            Some(raw) => raw.trim().parse().with_context(|| {
                format!("RECSYNC_FREQUENCY_SECS must be a whole number of seconds. Got: {}", raw)
            })?,
            None => DEFAULT_FREQUENCY_SECS,
        };

        Ok(Self {
            api_token: lookup("RECSYNC_API_TOKEN").context(
                "RECSYNC_API_TOKEN is required. Set it via: export RECSYNC_API_TOKEN=your_token",
            )?,
            domain: lookup("RECSYNC_DOMAIN").context(
                "RECSYNC_DOMAIN is required. Set it via: export RECSYNC_DOMAIN=example.com",
            )?,
            record_type: lookup("RECSYNC_RECORD_TYPE").unwrap_or_else(|| "A".to_string()),
            record_name: lookup("RECSYNC_RECORD_NAME").unwrap_or_else(|| "@".to_string()),
            frequency_secs,
            ip_source_url: lookup("RECSYNC_IP_SOURCE_URL")
                .unwrap_or_else(|| DEFAULT_IP_SERVICE.to_string()),
            log_level: lookup("RECSYNC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.api_token.trim().is_empty() {
            anyhow::bail!(
                "RECSYNC_API_TOKEN cannot be empty. \
                Set it via: export RECSYNC_API_TOKEN=your_token"
            );
        }

        // Check for obvious placeholder tokens (common mistake)
        let token_lower = self.api_token.to_lowercase();
        if token_lower.contains("your_token")
            || token_lower.contains("replace_me")
            || token_lower == "token"
        {
            anyhow::bail!(
                "RECSYNC_API_TOKEN appears to be a placeholder. \
                Use an actual API token from DigitalOcean."
            );
        }

        validate_domain_name(&self.domain)?;

        if self.record_type.trim().is_empty() {
            anyhow::bail!("RECSYNC_RECORD_TYPE cannot be empty");
        }

        if self.record_name.trim().is_empty() {
            anyhow::bail!("RECSYNC_RECORD_NAME cannot be empty (use @ for the apex)");
        }

        if !(1..=MAX_FREQUENCY_SECS).contains(&self.frequency_secs) {
            anyhow::bail!(
                "RECSYNC_FREQUENCY_SECS must be between 1 and {} seconds. Got: {}",
                MAX_FREQUENCY_SECS,
                self.frequency_secs
            );
        }

        if !self.ip_source_url.starts_with("https://") && !self.ip_source_url.starts_with("http://")
        {
            anyhow::bail!(
                "RECSYNC_IP_SOURCE_URL must use HTTP or HTTPS scheme. Got: {}",
                self.ip_source_url
            );
        }

        parse_log_level(&self.log_level)?;

        Ok(())
    }

    fn frequency(&self) -> Duration {
        Duration::from_secs(self.frequency_secs)
    }
}

/// Map a level name to a tracing level
fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "RECSYNC_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks; catches common typos, not every invalid name.
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        anyhow::bail!("RECSYNC_DOMAIN cannot be empty");
    }

    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for label in domain.split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return RecsyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return RecsyncExitCode::ConfigError.into();
    }

    let log_level = parse_log_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return RecsyncExitCode::ConfigError.into();
    }

    info!("Starting recsyncd");

    // One sync at a time, so a single thread is enough
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return RecsyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let poller = match build_poller(&config) {
            Ok(poller) => poller,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return RecsyncExitCode::ConfigError;
            }
        };

        match run_daemon(poller).await {
            Ok(()) => RecsyncExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                RecsyncExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Wire the store, the IP source and the Syncer into a Poller
fn build_poller(config: &Config) -> Result<Poller> {
    let store = DigitalOceanStore::new(config.api_token.clone())
        .context("Failed to create DigitalOcean store")?;

    let version = IpVersion::for_record_type(&config.record_type);
    let ip_source = HttpIpSource::new(config.ip_source_url.clone(), version)
        .context("Failed to create HTTP IP source")?;

    if config.ip_source_url.starts_with("http://") {
        warn!("RECSYNC_IP_SOURCE_URL uses HTTP (not HTTPS); the reported address can be tampered with");
    }

    let target = SyncTarget::new(
        config.domain.clone(),
        config.record_type.clone(),
        config.record_name.clone(),
    );
    let syncer_config =
        SyncerConfig::new(target).with_policy(SyncPolicy::new(config.frequency()));
    let syncer = Syncer::new(syncer_config, Box::new(store)).context("Invalid sync target")?;

    let (poller, _events) = Poller::new(
        Box::new(ip_source),
        syncer,
        PollerConfig::new(config.frequency()),
    )
    .context("Invalid poller configuration")?;

    Ok(poller)
}

/// Run the poller until a shutdown signal or a fatal error
async fn run_daemon(mut poller: Poller) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let signals = tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => {
                error!("Signal handling error: {}", e);
                std::future::pending::<()>().await;
            }
        }
        let _ = shutdown_tx.send(());
    });

    let result = poller.run_with_shutdown(Some(shutdown_rx)).await;
    signals.abort();

    result?;
    info!("Shutting down recsyncd");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// The name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
