//! `lpstore` CLI — query LaunchPulse project storage.
//!
//! Prints usage statistics and file listings from the storage proxy, and runs
//! an MCP server that exposes the same two operations to AI assistants.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod mcp;

use std::io::IsTerminal;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use lpstore_client::config::{self, redact};
use lpstore_client::{
    FileMetadata, ProxyConfig, ProxyOperation, StorageClient, UsageStats, format_bytes,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

// ── ANSI color helpers ───────────────────────────────────────────────

/// Escape codes, blanked out when color is off.
struct Palette {
    reset: &'static str,
    bold: &'static str,
    dim: &'static str,
    red: &'static str,
    green: &'static str,
    yellow: &'static str,
    cyan: &'static str,
}

impl Palette {
    fn new(enabled: bool) -> Self {
        if enabled {
            Self {
                reset: "\x1b[0m",
                bold: "\x1b[1m",
                dim: "\x1b[2m",
                red: "\x1b[31m",
                green: "\x1b[32m",
                yellow: "\x1b[33m",
                cyan: "\x1b[36m",
            }
        } else {
            Self {
                reset: "",
                bold: "",
                dim: "",
                red: "",
                green: "",
                yellow: "",
                cyan: "",
            }
        }
    }
}

// ── CLI structure ────────────────────────────────────────────────────

/// lpstore — LaunchPulse project storage from the command line.
#[derive(Parser)]
#[command(
    name = "lpstore",
    version,
    about = "lpstore CLI — storage usage and file listings from the LaunchPulse storage proxy",
    long_about = None,
    after_help = "Environment variables:\n  \
         LPSTORE_PROJECT_ID    Project id\n  \
         LPSTORE_TOKEN         Storage proxy token\n  \
         LPSTORE_ENDPOINT_URL  Proxy endpoint (default: https://launchpulse.ai/api/storage/proxy)\n  \
         LPSTORE_TIMEOUT_SECS  Request timeout in seconds (default: 30)\n  \
         LPSTORE_LOG_LEVEL     Log filter when RUST_LOG is unset (default: warn)\n\n\
         Examples:\n  \
         lpstore usage --summary\n  \
         lpstore list\n  \
         lpstore mcp-server"
)]
struct Cli {
    /// Project whose storage is queried. Overrides `LPSTORE_PROJECT_ID`.
    #[arg(long)]
    project_id: Option<String>,

    /// Storage proxy token. Overrides `LPSTORE_TOKEN`.
    #[arg(long)]
    token: Option<String>,

    /// Storage proxy endpoint URL. Overrides `LPSTORE_ENDPOINT_URL`.
    #[arg(long)]
    endpoint_url: Option<String>,

    /// Request timeout in seconds. Overrides `LPSTORE_TIMEOUT_SECS`.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, env = "LPSTORE_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, default_value = "false")]
    log_json: bool,

    /// Disable colored output.
    #[arg(long, default_value = "false")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show storage quota and usage statistics.
    Usage {
        /// Print a human-readable summary instead of raw JSON.
        #[arg(long, default_value = "false")]
        summary: bool,
    },
    /// List files in project storage.
    List {
        /// Print one line per file instead of raw JSON.
        #[arg(long, default_value = "false")]
        summary: bool,
    },
    /// Start the MCP (Model Context Protocol) server for AI assistant integration.
    #[command(name = "mcp-server")]
    McpServer,
    /// Check configuration and endpoint connectivity.
    Doctor,
}

impl Cli {
    /// `LPSTORE_*` environment, with command-line flags on top.
    fn proxy_config(&self) -> ProxyConfig {
        self.apply_overrides(ProxyConfig::from_env())
    }

    fn apply_overrides(&self, mut cfg: ProxyConfig) -> ProxyConfig {
        let flag = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };

        if let Some(project_id) = flag(&self.project_id) {
            cfg.project_id = project_id;
        }
        if let Some(token) = flag(&self.token) {
            cfg.token = token;
        }
        if let Some(endpoint_url) = flag(&self.endpoint_url) {
            cfg.endpoint_url = endpoint_url;
        }
        if let Some(secs) = self.timeout_secs {
            cfg.timeout = Duration::from_secs(secs);
        }
        cfg
    }
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ── Command dispatch ─────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    let color = !cli.no_color
        && std::env::var_os("NO_COLOR").is_none()
        && std::io::stdout().is_terminal();
    let palette = Palette::new(color);

    match run(&cli, &palette).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let Palette {
                reset, bold, red, ..
            } = palette;
            eprintln!("{red}{bold}✗ Error:{reset} {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, palette: &Palette) -> Result<()> {
    let cfg = cli.proxy_config();
    match cli.command {
        Commands::Usage { summary } => cmd_usage(&connect(cfg)?, summary).await,
        Commands::List { summary } => cmd_list(&connect(cfg)?, summary).await,
        Commands::McpServer => mcp::run_mcp_server(connect(cfg)?).await,
        Commands::Doctor => cmd_doctor(cfg, palette).await,
    }
}

fn connect(cfg: ProxyConfig) -> Result<StorageClient> {
    StorageClient::new(cfg).context("invalid configuration")
}

// ── Commands ─────────────────────────────────────────────────────────

async fn cmd_usage(client: &StorageClient, summary: bool) -> Result<()> {
    if !summary {
        let text = client
            .get_storage_usage()
            .await
            .context("failed to fetch storage usage")?;
        println!("{text}");
        return Ok(());
    }

    let value = client
        .fetch(ProxyOperation::Usage)
        .await
        .context("failed to fetch storage usage")?;
    match UsageStats::from_value(&value) {
        Some(stats) => println!("{}", render_usage(&stats)),
        None => println!("{}", pretty(&value)?),
    }
    Ok(())
}

async fn cmd_list(client: &StorageClient, summary: bool) -> Result<()> {
    if !summary {
        let text = client
            .list_project_files()
            .await
            .context("failed to list project files")?;
        println!("{text}");
        return Ok(());
    }

    let value = client
        .fetch(ProxyOperation::List)
        .await
        .context("failed to list project files")?;
    let files = FileMetadata::list_from_value(&value);
    if files.is_empty() && !is_empty_listing(&value) {
        println!("{}", pretty(&value)?);
    } else {
        println!("{}", render_files(&files));
    }
    Ok(())
}

async fn cmd_doctor(cfg: ProxyConfig, palette: &Palette) -> Result<()> {
    let Palette {
        reset,
        bold,
        dim,
        red,
        green,
        yellow,
        cyan,
    } = palette;

    println!();
    println!("  {cyan}{bold}lpstore doctor{reset}");
    println!();

    let mut fail = 0u32;

    print!("  Project id... ");
    if cfg.project_id.is_empty() {
        println!("{red}not set ({}){reset}", config::ENV_PROJECT_ID);
        fail = fail.saturating_add(1);
    } else {
        println!("{green}{}{reset}", cfg.project_id);
    }

    print!("  Token... ");
    if cfg.token.is_empty() {
        println!("{red}not set ({}){reset}", config::ENV_TOKEN);
        fail = fail.saturating_add(1);
    } else {
        println!("{green}{}{reset}", redact(&cfg.token));
    }

    println!("  Endpoint... {dim}{}{reset}", cfg.endpoint_url);
    println!("  Timeout... {dim}{}s{reset}", cfg.timeout.as_secs());

    print!("  Proxy round trip... ");
    if fail > 0 {
        println!("{yellow}skipped{reset}");
    } else {
        match probe(cfg).await {
            Ok(()) => println!("{green}ok{reset}"),
            Err(e) => {
                println!("{red}{e:#}{reset}");
                fail = fail.saturating_add(1);
            }
        }
    }

    println!();
    if fail > 0 {
        bail!("{fail} check(s) failed");
    }
    println!("  {green}All checks passed.{reset}");
    Ok(())
}

async fn probe(cfg: ProxyConfig) -> Result<()> {
    let client = connect(cfg)?;
    client.fetch(ProxyOperation::Usage).await?;
    Ok(())
}

// ── Rendering ────────────────────────────────────────────────────────

fn pretty(value: &Value) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to format response")
}

fn is_empty_listing(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.is_empty(),
        Value::Object(obj) => obj
            .get("files")
            .and_then(Value::as_array)
            .is_some_and(Vec::is_empty),
        _ => false,
    }
}

fn render_usage(stats: &UsageStats) -> String {
    let show = |v: Option<u64>| v.map_or_else(|| "unknown".to_owned(), format_bytes);

    let mut out = format!("Used:  {}", show(stats.total_bytes));
    if let (Some(used), Some(quota)) = (stats.total_bytes, stats.quota_bytes) {
        if quota > 0 {
            #[allow(clippy::cast_precision_loss)]
            let pct = used as f64 / quota as f64 * 100.0;
            out.push_str(&format!(" of {} ({pct:.1}%)", format_bytes(quota)));
        }
    }
    out.push_str(&format!("\nFree:  {}", show(stats.remaining_bytes())));
    out.push_str(&format!(
        "\nFiles: {}",
        stats
            .file_count
            .map_or_else(|| "unknown".to_owned(), |n| n.to_string())
    ));
    out
}

fn render_files(files: &[FileMetadata]) -> String {
    if files.is_empty() {
        return "No files in project storage.".to_owned();
    }

    let mut out = format!("{} file(s):", files.len());
    for file in files {
        let name = file.filename.as_deref().unwrap_or("<unnamed>");
        let size = file.size.map_or_else(|| "?".to_owned(), format_bytes);
        let kind = file.content_type.as_deref().unwrap_or("-");
        out.push_str(&format!("\n  • {name}  {size}  {kind}"));
        if let Some(link) = file.link() {
            out.push_str(&format!("  {link}"));
        }
    }
    out
}
