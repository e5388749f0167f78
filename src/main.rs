//! ssr-page CLI
//!
//! Single-shot mode:
//!   ssr-page render --stats stats.json --bundle dist/server/render.js /about
//!
//! Server mode (persistent process, reads routes from stdin):
//!   ssr-page serve --stats stats.json --bundle dist/server/render.js
//!
//! Protocol (server mode):
//!   Request (stdin), one route per line:
//!     /about
//!
//!   Response (stdout):
//!     Status:Ok
//!     Length:1234
//!
//!     <html>...
//!
//!   Error response:
//!     Status:Error
//!     Length:42
//!
//!     failed to render markup for route '/about': ...

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use ssr_page::{
    render_page, ClientStats, MarkupRenderer, RenderParams, RouteTable, SandboxConfig,
    SandboxRenderer, MAIN_ENTRYPOINT,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one route and print the document
    Render {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(default_value = "/")]
        route: String,
    },
    /// Render routes read line by line from stdin
    Serve {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Client build stats (JSON with entrypoints.<name>.assets)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    stats: PathBuf,

    /// Server bundle entry module exporting render(route)
    #[arg(
        long,
        required_unless_present = "routes",
        conflicts_with = "routes",
        value_hint = clap::ValueHint::FilePath
    )]
    bundle: Option<PathBuf>,

    /// Pre-rendered route table (JSON) instead of a bundle
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    routes: Option<PathBuf>,

    /// Directory the bundle may import from [default: the bundle's directory]
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    chunks_dir: Option<PathBuf>,

    /// Entry point whose assets become script tags
    #[arg(long, default_value = MAIN_ENTRYPOINT)]
    entrypoint: String,

    /// Per-render timeout; 0 disables it
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    /// V8 heap limit; 0 disables it
    #[arg(long, default_value_t = 64)]
    max_heap_mb: usize,
}

/// Whichever markup source the command line picked
enum Renderer {
    Sandbox(Box<SandboxRenderer>),
    Routes(RouteTable),
}

impl MarkupRenderer for Renderer {
    async fn render_markup(&mut self, route: &str) -> Result<String> {
        match self {
            Renderer::Sandbox(sandbox) => sandbox.render_markup(route).await,
            Renderer::Routes(table) => table.render_markup(route).await,
        }
    }
}

impl SourceArgs {
    fn sandbox_config(&self, bundle: &std::path::Path) -> Result<SandboxConfig> {
        let chunks_dir = match &self.chunks_dir {
            Some(dir) => dir.clone(),
            None => bundle
                .parent()
                .map(|p| if p.as_os_str().is_empty() { PathBuf::from(".") } else { p.to_path_buf() })
                .ok_or_else(|| anyhow!("Cannot derive chunks dir from '{}'", bundle.display()))?,
        };

        Ok(SandboxConfig {
            chunks_dir,
            max_heap_size: (self.max_heap_mb > 0).then(|| self.max_heap_mb * 1024 * 1024),
            timeout_ms: (self.timeout_ms > 0).then_some(self.timeout_ms),
        })
    }

    fn renderer(&self) -> Result<Renderer> {
        if let Some(bundle) = &self.bundle {
            let config = self.sandbox_config(bundle)?;
            tracing::info!(bundle = %bundle.display(), chunks_dir = %config.chunks_dir.display(), "starting sandbox");
            let sandbox = SandboxRenderer::new(&config, bundle)?;
            return Ok(Renderer::Sandbox(Box::new(sandbox)));
        }

        let routes = self
            .routes
            .as_ref()
            .ok_or_else(|| anyhow!("Either --bundle or --routes is required"))?;
        Ok(Renderer::Routes(RouteTable::load(routes)?))
    }

    fn client_stats(&self) -> Result<ClientStats> {
        ClientStats::load(&self.stats).context("Failed to load client stats")
    }
}

async fn run_single_shot(source: &SourceArgs, route: &str) -> Result<()> {
    let stats = source.client_stats()?;
    let mut renderer = source.renderer()?;

    let params = RenderParams {
        entrypoint: &source.entrypoint,
        ..RenderParams::new(route, &stats)
    };
    let html = render_page(&mut renderer, params).await?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{html}")?;
    stdout.flush()?;
    Ok(())
}

async fn run_server(source: &SourceArgs) -> Result<()> {
    // Stats and runtime are built once; every request reuses them
    let stats = source.client_stats()?;
    let mut renderer = source.renderer()?;

    let stdin = std::io::stdin();
    let mut reader = stdin.lock();
    let mut stdout = std::io::stdout();

    tracing::info!("server ready, reading routes from stdin");

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let route = line.trim_end_matches(['\r', '\n']);

        let params = RenderParams {
            entrypoint: &source.entrypoint,
            ..RenderParams::new(route, &stats)
        };
        match render_page(&mut renderer, params).await {
            Ok(html) => write_response(&mut stdout, true, &html)?,
            Err(e) => {
                let message = format!("{:#}", anyhow::Error::from(e));
                tracing::warn!(route, error = %message, "render failed");
                write_response(&mut stdout, false, &message)?;
            }
        }
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}

/// Write one response in the length-prefixed protocol
fn write_response(out: &mut impl Write, ok: bool, body: &str) -> Result<()> {
    let status = if ok { "Ok" } else { "Error" };

    writeln!(out, "Status:{status}")?;
    writeln!(out, "Length:{}", body.len())?;
    writeln!(out)?;
    write!(out, "{body}")?;
    out.flush()?;

    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match &cli.command {
        Command::Render { source, route } => run_single_shot(source, route).await,
        Command::Serve { source } => run_server(source).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_response_ok() {
        let mut out = Vec::new();
        write_response(&mut out, true, "<html></html>").unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Status:Ok\nLength:13\n\n<html></html>"
        );
    }

    #[test]
    fn test_write_response_error_counts_bytes() {
        let mut out = Vec::new();
        write_response(&mut out, false, "héllo").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Status:Error\nLength:6\n\nhéllo");
    }

    #[test]
    fn test_cli_requires_markup_source() {
        let result = Cli::try_parse_from(["ssr-page", "render", "--stats", "s.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_both_sources() {
        let result = Cli::try_parse_from([
            "ssr-page", "render", "--stats", "s.json", "--bundle", "a.js", "--routes", "r.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_chunks_dir_defaults_to_bundle_dir() {
        let cli = Cli::try_parse_from([
            "ssr-page", "serve", "--stats", "s.json", "--bundle", "dist/server/render.js",
        ])
        .unwrap();
        let Command::Serve { source } = cli.command else {
            panic!("expected serve");
        };

        let config = source.sandbox_config(source.bundle.as_deref().unwrap()).unwrap();
        assert_eq!(config.chunks_dir, PathBuf::from("dist/server"));
        assert_eq!(config.timeout_ms, Some(30_000));
        assert_eq!(config.max_heap_size, Some(64 * 1024 * 1024));
    }

    #[test]
    fn test_zero_limits_disable() {
        let cli = Cli::try_parse_from([
            "ssr-page", "render", "--stats", "s.json", "--bundle", "render.js",
            "--timeout-ms", "0", "--max-heap-mb", "0",
        ])
        .unwrap();
        let Command::Render { source, route } = cli.command else {
            panic!("expected render");
        };

        assert_eq!(route, "/");
        let config = source.sandbox_config(source.bundle.as_deref().unwrap()).unwrap();
        assert_eq!(config.chunks_dir, PathBuf::from("."));
        assert_eq!(config.timeout_ms, None);
        assert_eq!(config.max_heap_size, None);
    }
}
