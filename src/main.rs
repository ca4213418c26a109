// src/main.rs

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use medalists_chat::{
    api::create_router,
    blockchain::{LocalWalletSession, RpcChainReader},
    chat::{payload::ChatPayload, session::ChatSession},
    config::Config,
    mint::orchestrator::MintOrchestrator,
    AppState,
};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// --- HTTP Server Logic ---
async fn run_http_server(state: AppState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], state.config.port));
    let app = create_router(state);

    info!("HTTP Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

async fn write_payloads(
    stdout: &mut io::Stdout,
    payloads: Vec<ChatPayload>,
) -> anyhow::Result<()> {
    for payload in payloads {
        let line = serde_json::to_string(&payload)?;
        debug!("Sending: {}", line);
        stdout.write_all(format!("{}\n", line).as_bytes()).await?;
    }
    stdout.flush().await?;
    Ok(())
}

// --- Session Logic ---
// One conversation over stdin/stdout, playing the client: the local wallet
// signs on `/confirm`, receipt updates are printed as they arrive.
async fn run_session(state: AppState) -> anyhow::Result<()> {
    let key = state
        .config
        .wallet_private_key
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("WALLET_PRIVATE_KEY is required in session mode"))?;
    let wallet = LocalWalletSession::new(key, &state.config.rpc_url)?;
    let reader = RpcChainReader::new(state.config.rpc_url.clone());
    let orchestrator = MintOrchestrator::new(
        state.config.mint_settings()?,
        Arc::new(wallet),
        Arc::new(reader),
    );
    let mut session = ChatSession::new(state.router.clone(), orchestrator);

    info!("Starting chat session on stdin/stdout...");
    let mut stdin = io::BufReader::new(io::stdin());
    let mut stdout = io::stdout();

    // read_line is not cancel safe; partial input stays in `line` across iterations.
    let mut line = String::new();
    loop {
        tokio::select! {
            read = stdin.read_line(&mut line) => {
                match read {
                    Ok(0) => {
                        info!("EOF received, ending session");
                        break;
                    }
                    Ok(_) => {
                        let text = line.trim().to_string();
                        line.clear();
                        if text.is_empty() {
                            continue;
                        }
                        debug!("Received: {}", text);
                        let mut out = session.pump().await;
                        out.extend(match text.as_str() {
                            "/confirm" => session.confirm(None).await,
                            "/cancel" => session.cancel().await,
                            other => session.send(other).await,
                        });
                        write_payloads(&mut stdout, out).await?;
                    }
                    Err(e) => {
                        error!("Failed to read from stdin: {}", e);
                        break;
                    }
                }
            }
            Some(event) = session.next_event() => {
                let updates = session.apply_event(event).await;
                write_payloads(&mut stdout, updates).await?;
            }
        }
    }

    info!("Chat session shutting down");
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medalists_chat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            return;
        }
    };
    info!(
        network = config.network_name(),
        mcp = %config.mcp_server_url,
        "Configuration loaded"
    );

    let app_state = AppState::from_config(config);

    // Check if running in session mode (stdin/stdout) or HTTP server mode
    let args: Vec<String> = env::args().collect();
    let result = if args.contains(&"--session".to_string()) || env::var("SESSION_MODE").is_ok() {
        run_session(app_state).await
    } else {
        run_http_server(app_state).await
    };

    if let Err(e) = result {
        error!("Fatal: {:#}", e);
    }
}
