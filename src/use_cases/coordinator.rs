// Request correlator: owns the worker link and routes response frames back to callers.

use crate::domain::{EventSink, LogLevel, Network};
use crate::interface_adapters::protocol::{RequestEnvelope, ResponseEnvelope, ResponseKind};
use crate::use_cases::types::{ActionKind, ActionRequest, ActionResult, ClientError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

const CONTEXT: &str = "coordinator";

/// Both ends of a freshly launched worker, as seen from the coordinator.
pub struct WorkerChannels {
    pub requests: mpsc::Sender<String>,
    pub responses: mpsc::Receiver<String>,
}

// Port for starting a worker execution context.
pub trait WorkerLauncher: Send + Sync {
    fn launch(&self, network: Network) -> Result<WorkerChannels, String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerStatus {
    Uninitialized,
    Initializing,
    Ready,
    Failed(String),
    Closed,
}

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// Bound on a single call, from send to routed response.
    pub request_timeout: Duration,
    /// Bound on the worker's `init` acknowledgment.
    pub init_timeout: Duration,
}

type Reply = oneshot::Sender<Result<ActionResult, ClientError>>;

struct PendingCall {
    action: ActionKind,
    // Which worker launch the call was sent to.
    generation: u64,
    reply: Reply,
}

type PendingTable = Arc<Mutex<HashMap<u64, PendingCall>>>;

struct WorkerLink {
    requests: mpsc::Sender<String>,
    generation: u64,
    router: JoinHandle<()>,
}

/// Single owner of the worker handle for one session.
pub struct Coordinator {
    launcher: Arc<dyn WorkerLauncher>,
    settings: CoordinatorSettings,
    sink: Arc<dyn EventSink>,
    // Held across the init handshake so concurrent first calls queue behind it.
    link: tokio::sync::Mutex<Option<WorkerLink>>,
    pending: PendingTable,
    next_request_id: AtomicU64,
    next_generation: AtomicU64,
    // Network handed to freshly launched workers.
    network: Mutex<Network>,
    status_tx: watch::Sender<WorkerStatus>,
    closed: AtomicBool,
}

impl Coordinator {
    pub fn new(
        launcher: Arc<dyn WorkerLauncher>,
        settings: CoordinatorSettings,
        network: Network,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let (status_tx, _status_rx) = watch::channel(WorkerStatus::Uninitialized);
        Self {
            launcher,
            settings,
            sink,
            link: tokio::sync::Mutex::new(None),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_request_id: AtomicU64::new(1),
            next_generation: AtomicU64::new(1),
            network: Mutex::new(network),
            status_tx,
            closed: AtomicBool::new(false),
        }
    }

    /// Starts the worker eagerly instead of on the first call.
    pub async fn start(&self) -> Result<(), ClientError> {
        self.ensure_worker().await.map(|_| ())
    }

    pub fn status(&self) -> watch::Receiver<WorkerStatus> {
        self.status_tx.subscribe()
    }

    pub fn network(&self) -> Network {
        *lock(&self.network)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Sends one request and waits for its correlated response.
    pub async fn send(&self, request: ActionRequest) -> Result<ActionResult, ClientError> {
        let action = request.kind();
        // Recorded first so a worker launched for this very call already targets it.
        if let ActionRequest::SetNetwork { network } = &request {
            *lock(&self.network) = *network;
        }
        let (requests, generation) = self.ensure_worker().await?;

        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let frame = serde_json::to_string(&RequestEnvelope::new(request_id, &request))
            .map_err(|err| ClientError::Protocol(format!("failed to encode {action}: {err}")))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        self.register(
            request_id,
            PendingCall {
                action,
                generation,
                reply: reply_tx,
            },
        )?;
        self.sink.log(
            LogLevel::Debug,
            CONTEXT,
            "request sent",
            &[("action", action.to_string()), ("request_id", request_id.to_string())],
        );

        let exchange = async {
            if requests.send(frame).await.is_err() {
                return Err(ClientError::WorkerExited);
            }
            reply_rx.await.unwrap_or(Err(ClientError::Cancelled))
        };

        let outcome = match timeout(self.settings.request_timeout, exchange).await {
            Ok(outcome) => outcome,
            Err(_) => {
                self.sink.log(
                    LogLevel::Warn,
                    CONTEXT,
                    "request timed out",
                    &[
                        ("action", action.to_string()),
                        ("request_id", request_id.to_string()),
                        ("timeout_ms", self.settings.request_timeout.as_millis().to_string()),
                    ],
                );
                Err(ClientError::Timeout { action })
            }
        };

        // A late response for a removed entry is matched-and-dropped by the router.
        if outcome.is_err() {
            lock(&self.pending).remove(&request_id);
        }
        outcome
    }

    // A shutdown that drained the table before this insert would never reject the entry.
    fn register(&self, request_id: u64, call: PendingCall) -> Result<(), ClientError> {
        lock(&self.pending).insert(request_id, call);
        if self.closed.load(Ordering::SeqCst) {
            lock(&self.pending).remove(&request_id);
            return Err(ClientError::Cancelled);
        }
        Ok(())
    }

    /// Releases the worker and rejects every pending call. Later calls are rejected too.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);

        if let Some(link) = self.link.lock().await.take() {
            link.router.abort();
            // Dropping the request sender lets the worker drain and exit.
            drop(link.requests);
        }

        let cancelled: Vec<PendingCall> = lock(&self.pending).drain().map(|(_, call)| call).collect();
        let count = cancelled.len();
        for call in cancelled {
            let _ = call.reply.send(Err(ClientError::Cancelled));
        }

        self.status_tx.send_replace(WorkerStatus::Closed);
        self.sink.log(
            LogLevel::Info,
            CONTEXT,
            "coordinator shut down",
            &[("cancelled", count.to_string())],
        );
    }

    async fn ensure_worker(&self) -> Result<(mpsc::Sender<String>, u64), ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Cancelled);
        }

        let mut link = self.link.lock().await;
        // Shutdown may have won the race while this call waited on the lock.
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Cancelled);
        }

        if let Some(existing) = link.as_ref() {
            if !existing.requests.is_closed() {
                return Ok((existing.requests.clone(), existing.generation));
            }
            self.sink
                .log(LogLevel::Warn, CONTEXT, "worker link closed; relaunching", &[]);
        }
        *link = None;

        self.status_tx.send_replace(WorkerStatus::Initializing);
        match self.launch().await {
            Ok(new_link) => {
                let handle = (new_link.requests.clone(), new_link.generation);
                *link = Some(new_link);
                self.status_tx.send_replace(WorkerStatus::Ready);
                Ok(handle)
            }
            Err(err) => {
                self.status_tx
                    .send_replace(WorkerStatus::Failed(err.to_string()));
                self.sink.log(
                    LogLevel::Error,
                    CONTEXT,
                    "worker failed to initialize",
                    &[("error", err.to_string())],
                );
                Err(err)
            }
        }
    }

    async fn launch(&self) -> Result<WorkerLink, ClientError> {
        let network = self.network();
        let WorkerChannels {
            requests,
            mut responses,
        } = self
            .launcher
            .launch(network)
            .map_err(ClientError::Initialization)?;

        let ack = timeout(self.settings.init_timeout, responses.recv())
            .await
            .map_err(|_| {
                ClientError::Initialization("worker did not acknowledge init in time".to_string())
            })?
            .ok_or_else(|| ClientError::Initialization("worker exited before init".to_string()))?;

        match serde_json::from_str::<ResponseEnvelope>(&ack) {
            Ok(envelope) if envelope.kind == ResponseKind::Init => {}
            Ok(envelope) => {
                return Err(ClientError::Initialization(format!(
                    "expected init acknowledgment, got {:?}",
                    envelope.kind
                )));
            }
            Err(err) => {
                return Err(ClientError::Initialization(format!(
                    "malformed init frame: {err}"
                )));
            }
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let router = tokio::spawn(route_responses(
            responses,
            self.pending.clone(),
            generation,
            self.sink.clone(),
        ));
        self.sink.log(
            LogLevel::Info,
            CONTEXT,
            "worker ready",
            &[("network", network.to_string()), ("generation", generation.to_string())],
        );

        Ok(WorkerLink {
            requests,
            generation,
            router,
        })
    }
}

// Resolves pending calls by request id until the worker's response channel closes.
async fn route_responses(
    mut responses: mpsc::Receiver<String>,
    pending: PendingTable,
    generation: u64,
    sink: Arc<dyn EventSink>,
) {
    while let Some(frame) = responses.recv().await {
        let envelope = match serde_json::from_str::<ResponseEnvelope>(&frame) {
            Ok(envelope) => envelope,
            Err(err) => {
                sink.log(
                    LogLevel::Warn,
                    CONTEXT,
                    "dropping malformed response frame",
                    &[("error", err.to_string())],
                );
                continue;
            }
        };

        let Some(request_id) = envelope.request_id else {
            sink.log(
                LogLevel::Warn,
                CONTEXT,
                "dropping uncorrelated response",
                &[("type", format!("{:?}", envelope.kind))],
            );
            continue;
        };

        let call = lock(&pending).remove(&request_id);
        let Some(call) = call else {
            sink.log(
                LogLevel::Debug,
                CONTEXT,
                "no pending call for response; dropping",
                &[("request_id", request_id.to_string())],
            );
            continue;
        };

        let outcome = envelope.into_outcome(call.action);
        if let Err(err) = &outcome {
            sink.log(
                LogLevel::Debug,
                CONTEXT,
                "request rejected",
                &[
                    ("action", call.action.to_string()),
                    ("request_id", request_id.to_string()),
                    ("error", err.to_string()),
                ],
            );
        }
        let _ = call.reply.send(outcome);
    }

    // Only calls sent to this launch are orphaned; a relaunched worker owns the rest.
    let orphaned: Vec<PendingCall> = {
        let mut table = lock(&pending);
        let ids: Vec<u64> = table
            .iter()
            .filter(|(_, call)| call.generation == generation)
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter().filter_map(|id| table.remove(&id)).collect()
    };
    if !orphaned.is_empty() {
        sink.log(
            LogLevel::Warn,
            CONTEXT,
            "worker exited with calls pending",
            &[("pending", orphaned.len().to_string())],
        );
    }
    for call in orphaned {
        let _ = call.reply.send(Err(ClientError::WorkerExited));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
