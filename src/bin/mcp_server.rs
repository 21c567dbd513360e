//! brlaw MCP Server
//!
//! Serves precedent research on the STJ, TST and STF case-law portals to MCP clients. One browser
//! is started (or attached to) for the life of the process and shared by every connection.

use anyhow::Context;
use brlaw_mcp::browser::{BrowserSession, ConnectionOptions, LaunchOptions};
use brlaw_mcp::mcp::LegalResearchServer;
use brlaw_mcp::research::ResearchConfig;
use clap::{ArgAction, Parser, ValueEnum};
use rmcp::{
    ServiceExt,
    transport::{
        sse_server::{SseServer, SseServerConfig},
        stdio,
        streamable_http_server::{StreamableHttpService, session::local::LocalSessionManager},
    },
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Transport {
    /// Standard input/output transport (default)
    Stdio,
    /// Server-Sent Events transport
    Sse,
    /// HTTP streamable transport
    Http,
}

#[derive(Parser)]
#[command(name = "brlaw-mcp-server")]
#[command(version)]
#[command(about = "Legal precedent research MCP server for the Brazilian superior courts", long_about = None)]
struct Cli {
    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H', env = "BRLAW_HEADED")]
    headed: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH", env = "BRLAW_CHROME_PATH")]
    executable_path: Option<String>,

    /// WebSocket endpoint URL of an already running browser
    #[arg(long, value_name = "URL", env = "BRLAW_WS_ENDPOINT")]
    ws_endpoint: Option<String>,

    /// Persistent browser profile directory
    #[arg(long, value_name = "DIR", env = "BRLAW_USER_DATA_DIR")]
    user_data_dir: Option<String>,

    /// Disable the Chrome sandbox (needed in some containers)
    #[arg(long)]
    no_sandbox: bool,

    /// Transport type to use
    #[arg(long, short = 't', value_enum, default_value = "stdio", env = "BRLAW_TRANSPORT")]
    transport: Transport,

    /// Address for SSE or HTTP transport
    #[arg(long, default_value = "127.0.0.1", env = "BRLAW_HOST")]
    host: String,

    /// Port for SSE or HTTP transport
    #[arg(long, short = 'p', default_value = "3000", env = "BRLAW_PORT")]
    port: u16,

    /// SSE endpoint path
    #[arg(long, default_value = "/sse")]
    sse_path: String,

    /// SSE POST path for messages
    #[arg(long, default_value = "/message")]
    sse_post_path: String,

    /// HTTP streamable endpoint path
    #[arg(long, default_value = "/mcp")]
    http_path: String,

    /// Wall-clock ceiling of one research call, in seconds
    #[arg(long, value_name = "SECS", default_value = "30", env = "BRLAW_CALL_TIMEOUT")]
    call_timeout: u64,

    /// Search submissions attempted when a court answers with an anti-automation challenge
    #[arg(long, value_name = "N", default_value = "3", env = "BRLAW_CHALLENGE_ATTEMPTS")]
    challenge_attempts: u32,

    /// Pause between two challenged submissions, in milliseconds
    #[arg(long, value_name = "MS", default_value = "2000", env = "BRLAW_CHALLENGE_BACKOFF_MS")]
    challenge_backoff_ms: u64,

    /// More logging: -v for info, -vv for debug (RUST_LOG takes precedence)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn launch_options(&self) -> LaunchOptions {
        let mut options = LaunchOptions::new().headless(!self.headed).sandbox(!self.no_sandbox);
        if let Some(path) = &self.executable_path {
            options = options.chrome_path(path);
        }
        if let Some(dir) = &self.user_data_dir {
            options = options.user_data_dir(dir);
        }
        options
    }

    fn research_config(&self) -> ResearchConfig {
        let defaults = ResearchConfig::default();
        ResearchConfig::new()
            .challenge_attempts(self.challenge_attempts)
            .challenge_backoff(Duration::from_millis(self.challenge_backoff_ms), defaults.challenge_jitter)
            .call_timeout(Duration::from_secs(self.call_timeout))
    }

    fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries the stdio transport, so logs go to stderr
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .target(env_logger::Target::Stderr)
        .init();

    log::info!("brlaw MCP Server v{}", env!("CARGO_PKG_VERSION"));

    let ws_endpoint = cli.ws_endpoint.clone();
    let options = cli.launch_options();
    let session = tokio::task::spawn_blocking(move || match ws_endpoint {
        Some(url) => {
            log::info!(endpoint = url.as_str(); "Attaching to running browser");
            BrowserSession::connect(ConnectionOptions::new(url))
        }
        None => BrowserSession::launch(options),
    })
    .await
    .context("browser startup task failed")?
    .context("failed to start the browser")?;

    let session = Arc::new(session);
    let config = cli.research_config();

    match cli.transport {
        Transport::Stdio => {
            log::info!("Ready to accept MCP connections via stdio");
            let server = LegalResearchServer::with_shared_session(session.clone(), config)
                .serve(stdio())
                .await
                .context("failed to start the stdio transport")?;
            let quit_reason = server.waiting().await?;
            log::info!("Server quit with reason: {:?}", quit_reason);
        }
        Transport::Sse => {
            let bind_addr = format!("{}:{}", cli.host, cli.port);

            let sse_config = SseServerConfig {
                bind: bind_addr
                    .parse::<std::net::SocketAddr>()
                    .with_context(|| format!("invalid bind address {}", bind_addr))?,
                sse_path: cli.sse_path.clone(),
                post_path: cli.sse_post_path.clone(),
                ct: CancellationToken::new(),
                sse_keep_alive: None,
            };

            let (sse_server, router) = SseServer::new(sse_config);

            // Every connection shares the one browser
            let shared = session.clone();
            let _cancellation_token =
                sse_server.with_service(move || LegalResearchServer::with_shared_session(shared.clone(), config.clone()));

            log::info!("Ready to accept MCP connections at http://{}{}", bind_addr, cli.sse_path);

            let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
            axum::serve(listener, router.into_make_service()).await?;
        }
        Transport::Http => {
            let bind_addr = format!("{}:{}", cli.host, cli.port);

            let shared = session.clone();
            let service_factory =
                move || Ok(LegalResearchServer::with_shared_session(shared.clone(), config.clone()));

            let http_service = StreamableHttpService::new(
                service_factory,
                LocalSessionManager::default().into(),
                Default::default(),
            );

            let router = axum::Router::new().nest_service(&cli.http_path, http_service);

            log::info!("Ready to accept MCP connections at http://{}{}", bind_addr, cli.http_path);

            let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
            axum::serve(listener, router).await?;
        }
    }

    let session = Arc::clone(&session);
    tokio::task::spawn_blocking(move || session.close())
        .await
        .context("browser shutdown task failed")?
        .context("failed to close browser pages")?;

    Ok(())
}
