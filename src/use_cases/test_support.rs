use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{
    Blinds, CardsState, ChipsState, EventSink, GameState, GameStatus, KeyValueStore, Ledger,
    LogLevel, Network, Player,
};
use crate::interface_adapters::protocol::{RequestEnvelope, ResponseEnvelope};
use crate::use_cases::coordinator::{CoordinatorSettings, WorkerChannels, WorkerLauncher};
use crate::use_cases::worker::{worker_task, ActionWorker};

// Short bounds so timeout paths finish quickly in tests.
pub(crate) fn fast_settings() -> CoordinatorSettings {
    CoordinatorSettings {
        request_timeout: Duration::from_millis(300),
        init_timeout: Duration::from_millis(300),
    }
}

pub(crate) fn sample_game(game_id: u64, pot: u64) -> GameState {
    GameState {
        id: game_id,
        players: vec![Player::new("aleo_creator", 1000, 0)],
        community_cards: Vec::new(),
        pot,
        current_turn: 0,
        status: GameStatus::Waiting,
        blinds: Blinds { small: 5, big: 10 },
    }
}

#[derive(Clone, Copy, Default)]
pub(crate) struct LedgerFailures {
    pub create_game: bool,
    pub join_game: bool,
    pub place_bet: bool,
    pub game_state: bool,
    pub chips_state: bool,
    pub panic_on_cards: bool,
}

// Ledger fake that records every call as "<operation>:<game_id>".
pub(crate) struct RecordingLedger {
    calls: Mutex<Vec<String>>,
    game_state_calls: AtomicUsize,
    failures: LedgerFailures,
    delays: HashMap<&'static str, Duration>,
    versioned: bool,
}

impl RecordingLedger {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            game_state_calls: AtomicUsize::new(0),
            failures: LedgerFailures::default(),
            delays: HashMap::new(),
            versioned: false,
        }
    }

    pub(crate) fn with_failures(mut self, failures: LedgerFailures) -> Self {
        self.failures = failures;
        self
    }

    pub(crate) fn with_delay(mut self, operation: &'static str, delay: Duration) -> Self {
        self.delays.insert(operation, delay);
        self
    }

    // Each game_state call reports its own call number as the pot.
    pub(crate) fn versioned(mut self) -> Self {
        self.versioned = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    async fn record(&self, operation: &'static str, game_id: u64) {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(format!("{operation}:{game_id}"));
        if let Some(delay) = self.delays.get(operation) {
            tokio::time::sleep(*delay).await;
        }
    }
}

#[async_trait]
impl Ledger for RecordingLedger {
    async fn create_game(&self, game_id: u64, creator: &str) -> Result<GameState, String> {
        self.record("create_game", game_id).await;
        if self.failures.create_game {
            return Err(format!("game {game_id} already exists"));
        }
        let mut game = sample_game(game_id, 0);
        game.players[0].address = creator.to_string();
        Ok(game)
    }

    async fn join_game(&self, game_id: u64, player: &str) -> Result<GameState, String> {
        self.record("join_game", game_id).await;
        if self.failures.join_game {
            return Err(format!("game {game_id} is full"));
        }
        let mut game = sample_game(game_id, 0);
        game.players.push(Player::new(player, 1000, 1));
        Ok(game)
    }

    async fn place_bet(&self, game_id: u64, _player: &str, amount: u64) -> Result<GameState, String> {
        self.record("place_bet", game_id).await;
        if self.failures.place_bet {
            return Err("bet rejected".to_string());
        }
        Ok(sample_game(game_id, amount))
    }

    async fn game_state(&self, game_id: u64) -> Result<GameState, String> {
        let call = self.game_state_calls.fetch_add(1, Ordering::SeqCst) as u64 + 1;
        self.record("game_state", game_id).await;
        if self.failures.game_state {
            return Err(format!("game {game_id} not found"));
        }
        let pot = if self.versioned { call } else { 0 };
        Ok(sample_game(game_id, pot))
    }

    async fn chips_state(&self, game_id: u64) -> Result<ChipsState, String> {
        self.record("chips_state", game_id).await;
        if self.failures.chips_state {
            return Err("chips unavailable".to_string());
        }
        Ok(ChipsState::from(&sample_game(game_id, 0)))
    }

    async fn cards_state(&self, game_id: u64, player: &str) -> Result<CardsState, String> {
        self.record("cards_state", game_id).await;
        if self.failures.panic_on_cards {
            panic!("card ledger exploded");
        }
        Ok(CardsState {
            game_id,
            player: player.to_string(),
            hole_cards: None,
            community_cards: Vec::new(),
        })
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    entries: Mutex<Vec<(LogLevel, String, String)>>,
}

impl RecordingSink {
    pub(crate) fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries
            .lock()
            .expect("sink mutex poisoned")
            .iter()
            .filter(|(entry_level, _, _)| *entry_level == level)
            .map(|(_, _, message)| message.clone())
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn log(&self, level: LogLevel, context: &str, message: &str, _fields: &[(&str, String)]) {
        self.entries.lock().expect("sink mutex poisoned").push((
            level,
            context.to_string(),
            message.to_string(),
        ));
    }
}

#[derive(Default)]
pub(crate) struct RecordingStore {
    values: Mutex<HashMap<String, String>>,
    fail_writes: bool,
}

impl RecordingStore {
    pub(crate) fn with_value(key: &str, value: &str) -> Self {
        let store = Self::default();
        store
            .values
            .lock()
            .expect("store mutex poisoned")
            .insert(key.to_string(), value.to_string());
        store
    }

    pub(crate) fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    pub(crate) fn value(&self, key: &str) -> Option<String> {
        self.values.lock().expect("store mutex poisoned").get(key).cloned()
    }
}

impl KeyValueStore for RecordingStore {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        Ok(self.value(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        if self.fail_writes {
            return Err("disk full".to_string());
        }
        self.values
            .lock()
            .expect("store mutex poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// Runs the real worker on the test runtime and counts frames sent to it.
pub(crate) struct InlineLauncher {
    worker: Arc<ActionWorker>,
    launches: AtomicUsize,
    frames: Arc<AtomicUsize>,
    networks: Mutex<Vec<Network>>,
}

impl InlineLauncher {
    pub(crate) fn new(worker: ActionWorker) -> Self {
        Self {
            worker: Arc::new(worker),
            launches: AtomicUsize::new(0),
            frames: Arc::new(AtomicUsize::new(0)),
            networks: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub(crate) fn frames(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }

    pub(crate) fn networks(&self) -> Vec<Network> {
        self.networks
            .lock()
            .expect("networks mutex poisoned")
            .clone()
    }
}

impl WorkerLauncher for InlineLauncher {
    fn launch(&self, network: Network) -> Result<WorkerChannels, String> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.networks
            .lock()
            .expect("networks mutex poisoned")
            .push(network);

        let (request_tx, mut request_rx) = mpsc::channel::<String>(64);
        let (worker_tx, worker_rx) = mpsc::channel::<String>(64);
        let (response_tx, response_rx) = mpsc::channel::<String>(64);

        let frames = self.frames.clone();
        tokio::spawn(async move {
            while let Some(frame) = request_rx.recv().await {
                frames.fetch_add(1, Ordering::SeqCst);
                if worker_tx.send(frame).await.is_err() {
                    break;
                }
            }
        });
        tokio::spawn(worker_task(
            self.worker.clone(),
            worker_rx,
            response_tx,
            network,
        ));

        Ok(WorkerChannels {
            requests: request_tx,
            responses: response_rx,
        })
    }
}

// The far side of a scripted worker, driven by the test body.
pub(crate) struct FakeWorker {
    pub requests: mpsc::Receiver<String>,
    pub responses: mpsc::Sender<String>,
}

impl FakeWorker {
    pub(crate) async fn next_request(&mut self) -> RequestEnvelope {
        let frame = tokio::time::timeout(Duration::from_secs(2), self.requests.recv())
            .await
            .expect("request in time")
            .expect("coordinator alive");
        serde_json::from_str(&frame).expect("valid request frame")
    }

    pub(crate) async fn reply(&self, envelope: ResponseEnvelope) {
        let frame = serde_json::to_string(&envelope).expect("serialize response");
        self.reply_raw(&frame).await;
    }

    pub(crate) async fn reply_raw(&self, frame: &str) {
        self.responses
            .send(frame.to_string())
            .await
            .expect("router alive");
    }
}

// Hands each launched worker's channels to the test instead of running a worker.
pub(crate) struct ScriptedLauncher {
    ack_init: bool,
    workers: mpsc::UnboundedSender<FakeWorker>,
    launches: AtomicUsize,
    networks: Mutex<Vec<Network>>,
}

impl ScriptedLauncher {
    pub(crate) fn new(ack_init: bool) -> (Self, mpsc::UnboundedReceiver<FakeWorker>) {
        let (workers, worker_rx) = mpsc::unbounded_channel();
        (
            Self {
                ack_init,
                workers,
                launches: AtomicUsize::new(0),
                networks: Mutex::new(Vec::new()),
            },
            worker_rx,
        )
    }

    pub(crate) fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub(crate) fn networks(&self) -> Vec<Network> {
        self.networks.lock().expect("networks mutex poisoned").clone()
    }
}

impl WorkerLauncher for ScriptedLauncher {
    fn launch(&self, network: Network) -> Result<WorkerChannels, String> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.networks.lock().expect("networks mutex poisoned").push(network);
        let (request_tx, request_rx) = mpsc::channel::<String>(64);
        let (response_tx, response_rx) = mpsc::channel::<String>(64);

        if self.ack_init {
            let init = serde_json::to_string(&ResponseEnvelope::init()).map_err(|e| e.to_string())?;
            response_tx.try_send(init).map_err(|e| e.to_string())?;
        }

        self.workers
            .send(FakeWorker {
                requests: request_rx,
                responses: response_tx,
            })
            .map_err(|_| "worker receiver dropped".to_string())?;

        Ok(WorkerChannels {
            requests: request_tx,
            responses: response_rx,
        })
    }
}
