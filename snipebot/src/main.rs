// External imports
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use ethers::signers::Signer;
use ethers::types::Address;
use ethers::utils::{format_ether, format_units};
use futures::future::join_all;

// Standard library imports
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

// Internal imports
use snipe_common::logger::{init_logging, LoggerConfig};
use snipebot::chain_adapters::{ChainClient, EthersChainClient};
use snipebot::config::{load_wallet, RuntimeConfig, SnipeSettings};
use snipebot::endpoint_manager::{EndpointConfig, PoolMonitor};
use snipebot::health_monitor::probe;
use snipebot::notifier::{EventDispatcher, EventSink, SnipeEvent};
use snipebot::snipebot::{RunOutcome, SnipeBot};
use snipebot::trade::SubmissionEngine;

// Third party imports
use tracing::{error, info, warn};

/// Exit code khi bị dừng bằng Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(author, version, about = "RPC failover swap sniper")]
struct Cli {
    /// Path to config file (default: snipebot.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for rolling log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Monitor endpoints and submit the swap once one is functional (default)
    Run,
    /// Probe every endpoint once and print the health snapshots as JSON
    Probe,
    /// Print the wallet's native balance
    Balance,
    /// Print the wallet's ERC-20 balance, trying endpoints in priority order
    TokenBalance {
        /// Token address (default: contracts.token)
        #[arg(long)]
        token: Option<String>,
    },
}

fn build_dispatcher(runtime: &RuntimeConfig) -> EventDispatcher {
    match EventDispatcher::from_target(runtime.notify.as_ref()) {
        Ok(dispatcher) => dispatcher,
        Err(err) => {
            warn!(error = %format!("{:#}", err), "Notifications disabled");
            EventDispatcher::log_only()
        }
    }
}

fn connect(endpoint: &EndpointConfig, runtime: &RuntimeConfig) -> Result<EthersChainClient> {
    EthersChainClient::connect(endpoint, runtime.rpc_timeout)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

async fn run_bot(runtime: RuntimeConfig, events: Arc<dyn EventSink>) -> Result<ExitCode> {
    let wallet = load_wallet()?;
    let account = wallet.address();
    info!(account = ?account, endpoints = runtime.endpoints.len(), "Starting RPC monitor and sniper");

    let mut pool: Vec<(EndpointConfig, Arc<dyn ChainClient>)> = Vec::with_capacity(runtime.endpoints.len());
    for endpoint in &runtime.endpoints {
        let client = connect(endpoint, &runtime)?.with_wallet(wallet.clone());
        pool.push((endpoint.clone(), Arc::new(client)));
    }

    let monitor = PoolMonitor::new(pool, runtime.stale_threshold, Arc::clone(&events));
    let mut engine = SubmissionEngine::new(account, runtime.intent.clone(), runtime.retry, Arc::clone(&events));
    if let Some(poll_interval) = runtime.balance_poll_interval {
        engine = engine.with_balance_gate(poll_interval);
    }

    let mut bot = SnipeBot::new(monitor, engine, events, runtime.max_retries, runtime.poll_interval);
    match bot.run(shutdown_signal()).await {
        RunOutcome::Confirmed { endpoint, tx_hash } => {
            info!(endpoint = %endpoint, tx_hash = ?tx_hash, "Snipe successful, exiting");
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Shutdown => Ok(ExitCode::from(EXIT_INTERRUPTED)),
    }
}

async fn probe_endpoints(runtime: RuntimeConfig) -> Result<ExitCode> {
    let mut clients = Vec::with_capacity(runtime.endpoints.len());
    for endpoint in &runtime.endpoints {
        clients.push((endpoint, connect(endpoint, &runtime)?));
    }

    let snapshots = join_all(
        clients
            .iter()
            .map(|(endpoint, client)| probe(client, endpoint, runtime.stale_threshold)),
    )
    .await;

    println!("{}", serde_json::to_string_pretty(&snapshots)?);
    if snapshots.iter().any(|snapshot| snapshot.healthy) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

async fn native_balance(runtime: RuntimeConfig) -> Result<ExitCode> {
    let account = load_wallet()?.address();
    println!("Wallet Address: {:?}", account);

    for endpoint in &runtime.endpoints {
        let client = connect(endpoint, &runtime)?;
        match client.balance(account).await {
            Ok(balance) => {
                println!("Network: {} (chain id {})", endpoint.name, endpoint.chain_id);
                println!("ETH Balance: {} ETH", format_ether(balance));
                return Ok(ExitCode::SUCCESS);
            }
            Err(err) => warn!(endpoint = %endpoint.name, error = %err, "Failed to check balance"),
        }
    }
    Err(anyhow!("Failed to check balance using any RPC"))
}

async fn token_balance(runtime: RuntimeConfig, token: Option<String>) -> Result<ExitCode> {
    let token = match token {
        Some(token) => Address::from_str(token.trim()).with_context(|| format!("Invalid token address: {}", token))?,
        None => runtime.token,
    };
    let account = load_wallet()?.address();
    println!("Wallet Address: {:?}", account);
    println!("Token Address: {:?}", token);

    for endpoint in &runtime.endpoints {
        let client = connect(endpoint, &runtime)?;
        match client.token_balance(token, account).await {
            Ok(balance) => {
                let formatted = format_units(balance.raw, u32::from(balance.decimals))
                    .context("Failed to format token balance")?;
                println!("Network: {}", endpoint.name);
                println!("Token: {} ({} decimals)", balance.symbol, balance.decimals);
                println!("Balance: {} {}", formatted, balance.symbol);
                println!("Raw Balance: {}", balance.raw);
                return Ok(ExitCode::SUCCESS);
            }
            Err(err) => warn!(endpoint = %endpoint.name, error = %err, "Failed to check token balance"),
        }
    }
    Err(anyhow!("Failed to check balance using any RPC"))
}

async fn execute(command: Command, runtime: RuntimeConfig, events: Arc<dyn EventSink>) -> Result<ExitCode> {
    match command {
        Command::Run => run_bot(runtime, events).await,
        Command::Probe => probe_endpoints(runtime).await,
        Command::Balance => native_balance(runtime).await,
        Command::TokenBalance { token } => token_balance(runtime, token).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    dotenv::dotenv().ok();

    // Thiết lập logging
    let mut logger = LoggerConfig::default();
    if let Some(log_dir) = cli.log_dir.clone() {
        logger.log_dir = log_dir;
    }
    let _guard = match init_logging(&logger) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("Failed to initialise logging: {:#}", err);
            None
        }
    };

    // Lỗi cấu hình dừng ngay, chưa có kênh thông báo hợp lệ
    let runtime = match SnipeSettings::load(cli.config.as_deref()).and_then(|settings| settings.validate()) {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let command = cli.command.unwrap_or(Command::Run);
    let events: Arc<dyn EventSink> = Arc::new(build_dispatcher(&runtime));

    match execute(command.clone(), runtime, Arc::clone(&events)).await {
        Ok(code) => code,
        Err(err) => {
            let message = format!("{:#}", err);
            error!(error = %message, "Fatal error");
            if command == Command::Run {
                events.emit(SnipeEvent::Fatal { message }).await;
            }
            ExitCode::FAILURE
        }
    }
}
