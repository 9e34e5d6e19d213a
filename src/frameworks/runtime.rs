// Framework bootstrap for the client runtime.

use crate::domain::{EventSink, LedgerSet};
use crate::frameworks::{cli, config};
use crate::interface_adapters::launcher::ThreadLauncher;
use crate::interface_adapters::ledger::{HttpLedger, MemoryLedger};
use crate::interface_adapters::logging::TracingSink;
use crate::interface_adapters::storage::FileKeyValueStore;
use crate::use_cases::{ActionWorker, Coordinator, CoordinatorSettings, GameSession};

use std::{io::Result, sync::Arc};
use tokio::io::BufReader;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // Logs go to stderr; stdout carries command results.
    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run() -> Result<()> {
    init_runtime();

    let session = build_session().map_err(std::io::Error::other)?;
    // A failed start is retried by the first command.
    if let Err(e) = session.initialize().await {
        tracing::warn!(error = %e, "worker not ready at startup");
    }

    let outcome = cli::run_commands(
        &session,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await;

    session.shutdown().await;
    outcome
}

/// Wires ledgers, worker thread, coordinator and store from the environment.
pub fn build_session() -> std::result::Result<GameSession, String> {
    let sink: Arc<dyn EventSink> = Arc::new(TracingSink);

    let ledgers = build_ledgers()?;
    let worker = Arc::new(ActionWorker::new(ledgers, sink.clone()));
    let launcher = Arc::new(ThreadLauncher::new(worker, config::WORKER_CHANNEL_CAPACITY));

    let settings = CoordinatorSettings {
        request_timeout: config::request_timeout(),
        init_timeout: config::init_timeout(),
    };
    tracing::debug!(
        request_timeout_ms = settings.request_timeout.as_millis(),
        init_timeout_ms = settings.init_timeout.as_millis(),
        "coordinator configured"
    );
    let coordinator = Arc::new(Coordinator::new(
        launcher,
        settings,
        config::network(),
        sink.clone(),
    ));

    let storage_path = config::storage_path();
    tracing::debug!(path = %storage_path.display(), "using key store");
    let store = Arc::new(FileKeyValueStore::new(storage_path));

    Ok(GameSession::new(coordinator, store, sink))
}

fn build_ledgers() -> std::result::Result<LedgerSet, String> {
    match config::ledger_backend() {
        config::LedgerBackend::Memory => {
            tracing::debug!("using in-memory ledgers");
            Ok(LedgerSet::new(
                Arc::new(MemoryLedger::new()),
                Arc::new(MemoryLedger::new()),
            ))
        }
        config::LedgerBackend::Http => {
            let timeout = config::ledger_timeout();
            let local = HttpLedger::new(config::local_ledger_url(), timeout)
                .map_err(|e| format!("failed to initialize local ledger client: {e}"))?;
            let testnet = HttpLedger::new(config::testnet_ledger_url(), timeout)
                .map_err(|e| format!("failed to initialize testnet ledger client: {e}"))?;
            tracing::debug!(
                local = local.base_url(),
                testnet = testnet.base_url(),
                timeout_ms = timeout.as_millis(),
                "using http ledgers"
            );
            Ok(LedgerSet::new(Arc::new(local), Arc::new(testnet)))
        }
    }
}
