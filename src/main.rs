//! quotawatch CLI entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use quotawatch::config::QuotaConfig;
use quotawatch::remote::{HttpUsageReportSource, RemoteUsageCache};
use quotawatch::service::{LimitScope, QuotaService, QuotaSnapshot};
use quotawatch::store::StateRepository;

const STATE_DIR_NAME: &str = ".quotawatch";
const STATE_FILE_NAME: &str = "state.json";

#[derive(Parser)]
#[command(name = "quotawatch", version, about = "Track token quota usage and learned limits")]
struct Cli {
    /// Path to the state file (defaults to ~/.quotawatch/state.json).
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show current usage, limits, and warnings.
    Status {
        /// Emit machine-readable JSON instead of the human summary.
        #[arg(long)]
        json: bool,
    },
    /// Record a resource-consuming operation.
    RecordUsage {
        /// Tokens consumed.
        tokens: u64,
        /// What the tokens were spent on.
        description: String,
    },
    /// Record an observed exhaustion event for limit learning.
    RecordLimitHit {
        /// Tokens consumed at the moment of exhaustion.
        tokens: u64,
        /// Which limit was hit.
        #[arg(long, value_enum, default_value_t = ScopeArg::Session)]
        scope: ScopeArg,
    },
    /// Drop all tracked usage (learned limits survive).
    Reset,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScopeArg {
    Session,
    Weekly,
}

impl From<ScopeArg> for LimitScope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Session => LimitScope::Session,
            ScopeArg::Weekly => LimitScope::Weekly,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => QuotaConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => QuotaConfig::default(),
    };

    let state_path = match &cli.state_file {
        Some(path) => path.clone(),
        None => dirs::home_dir()
            .context("could not determine home directory; pass --state-file")?
            .join(STATE_DIR_NAME)
            .join(STATE_FILE_NAME),
    };

    let repository = StateRepository::new(state_path);
    let state = repository
        .load()
        .with_context(|| format!("failed to read state from {}", repository.path().display()))?
        .unwrap_or_default();

    let mut service = QuotaService::from_state(config.clone(), state);
    if let Some(cache) = build_remote(&config) {
        service = service.with_remote(cache);
    }

    let now = Utc::now();
    match cli.command {
        Command::Status { json } => {
            let snapshot = service.status(now).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print!("{}", render_status(&snapshot));
            }
        }
        Command::RecordUsage {
            tokens,
            description,
        } => {
            service.record_usage(tokens, description, now);
        }
        Command::RecordLimitHit { tokens, scope } => {
            service.record_limit_hit(scope.into(), tokens, now);
        }
        Command::Reset => {
            service.reset();
        }
    }

    repository
        .save(&service.to_state())
        .with_context(|| format!("failed to write state to {}", repository.path().display()))?;

    Ok(())
}

/// Build the remote cache when an endpoint is configured and its token is set.
fn build_remote(config: &QuotaConfig) -> Option<RemoteUsageCache> {
    let remote = config.remote.as_ref()?;
    if remote.base_url.is_empty() {
        return None;
    }
    let token = std::env::var(&remote.token_env).ok()?;
    let source = HttpUsageReportSource::new(remote.base_url.clone(), token);
    Some(RemoteUsageCache::new(
        Arc::new(source),
        config.cache_ttl(),
        config.remote_timeout(),
        config.weekly_period(),
        config.remote_fallback_spend,
    ))
}

/// Format a snapshot as a human-readable summary.
fn render_status(snapshot: &QuotaSnapshot) -> String {
    let mut output = String::from("## Quota Status\n\n");

    output.push_str(&format!(
        "**Session**: {}/{} tokens ({:.1}%), {} remaining{}\n",
        snapshot.session.used,
        snapshot.session.limit,
        snapshot.session.percent,
        snapshot.session.remaining,
        match snapshot.session.reset_eta_secs {
            Some(secs) => format!(", window drains in {}", format_eta(secs)),
            None => String::new(),
        }
    ));

    output.push_str(&format!(
        "**Weekly**: {}/{} tokens ({:.1}%), {} remaining, resets in {}\n",
        snapshot.weekly.used,
        snapshot.weekly.limit,
        snapshot.weekly.percent,
        snapshot.weekly.remaining,
        snapshot
            .weekly
            .reset_eta_secs
            .map(format_eta)
            .unwrap_or_else(|| "n/a".to_string())
    ));

    if let Some(spend) = snapshot.weekly.remote_spend {
        output.push_str(&format!("**Remote spend**: ${:.2}\n", spend));
    }

    if !snapshot.warnings.is_empty() {
        output.push_str("\n**Warnings**:\n");
        for warning in &snapshot.warnings {
            output.push_str(&format!("- {}\n", warning.message));
        }
    }

    if snapshot.degraded {
        output.push_str("\n(degraded: remote usage source unavailable, figures are local-only)\n");
    }

    output
}

/// Format a second count as hours and minutes.
fn format_eta(secs: i64) -> String {
    let secs = secs.max(0);
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}
