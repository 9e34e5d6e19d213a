// Worker execution context: one action per request frame, one response frame per request.

use crate::domain::account::{derive_address, generate_private_key, validate_bet_amount};
use crate::domain::{EventSink, Ledger, LedgerSet, LogLevel, Network};
use crate::interface_adapters::protocol::{recover_request_id, RequestEnvelope, ResponseEnvelope};
use crate::use_cases::types::{
    ActionRequest, ActionResult, CreatedGame, JoinedGame, PlacedBet,
};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;

const CONTEXT: &str = "worker";

/// Shared, immutable dependencies of a worker. Per-launch state lives in `worker_task`.
pub struct ActionWorker {
    ledgers: LedgerSet,
    sink: Arc<dyn EventSink>,
}

impl ActionWorker {
    pub fn new(ledgers: LedgerSet, sink: Arc<dyn EventSink>) -> Self {
        Self { ledgers, sink }
    }

    /// Runs a single action against the ledger captured at dispatch.
    pub async fn execute(
        &self,
        ledger: &dyn Ledger,
        request: ActionRequest,
    ) -> Result<ActionResult, String> {
        match request {
            ActionRequest::GetKey => Ok(ActionResult::Key(generate_private_key())),
            ActionRequest::CreateGame {
                game_id,
                private_key,
            } => {
                let creator = derive_address(&private_key).map_err(|e| e.to_string())?;
                let state = ledger.create_game(game_id, &creator).await?;
                Ok(ActionResult::GameCreated(CreatedGame {
                    game_id,
                    creator,
                    state: Some(state),
                }))
            }
            ActionRequest::JoinGame {
                game_id,
                private_key,
            } => {
                let player = derive_address(&private_key).map_err(|e| e.to_string())?;
                let state = ledger.join_game(game_id, &player).await?;
                Ok(ActionResult::GameJoined(JoinedGame {
                    game_id,
                    player,
                    state: Some(state),
                }))
            }
            ActionRequest::PlaceBet {
                game_id,
                amount,
                private_key,
            } => {
                // Amount is checked before anything touches the ledger.
                let amount = validate_bet_amount(amount).map_err(|e| e.to_string())?;
                let player = derive_address(&private_key).map_err(|e| e.to_string())?;
                let state = ledger.place_bet(game_id, &player, amount).await?;
                Ok(ActionResult::BetPlaced(PlacedBet {
                    game_id,
                    amount,
                    player,
                    state: Some(state),
                }))
            }
            ActionRequest::SetNetwork { network } => Ok(ActionResult::NetworkSet(network)),
            ActionRequest::GetGameState { game_id } => {
                ledger.game_state(game_id).await.map(ActionResult::GameState)
            }
            ActionRequest::GetChipsState { game_id } => {
                ledger.chips_state(game_id).await.map(ActionResult::ChipsState)
            }
            ActionRequest::GetCardsState {
                game_id,
                private_key,
            } => {
                let player = derive_address(&private_key).map_err(|e| e.to_string())?;
                ledger
                    .cards_state(game_id, &player)
                    .await
                    .map(ActionResult::CardsState)
            }
        }
    }
}

/// Serves request frames until the request channel closes.
///
/// Sends a single `init` frame first. Network switches are applied inline in arrival
/// order; every other action runs as its own task against the network active when it
/// was received, so a slow action never holds up later ones.
pub async fn worker_task(
    worker: Arc<ActionWorker>,
    mut request_rx: mpsc::Receiver<String>,
    response_tx: mpsc::Sender<String>,
    initial_network: Network,
) {
    let mut network = initial_network;

    if !send_frame(&response_tx, &ResponseEnvelope::init()).await {
        return;
    }
    worker.sink.log(
        LogLevel::Info,
        CONTEXT,
        "worker ready",
        &[("network", network.to_string())],
    );

    while let Some(frame) = request_rx.recv().await {
        let envelope = match serde_json::from_str::<RequestEnvelope>(&frame) {
            Ok(envelope) => envelope,
            Err(err) => {
                let request_id = recover_request_id(&frame);
                worker.sink.log(
                    LogLevel::Warn,
                    CONTEXT,
                    "malformed request frame",
                    &[("error", err.to_string()), ("request_id", format!("{request_id:?}"))],
                );
                // Without an id nobody is waiting on a reply we could route.
                if request_id.is_some() {
                    let reply =
                        ResponseEnvelope::error(request_id, format!("malformed request: {err}"));
                    send_frame(&response_tx, &reply).await;
                }
                continue;
            }
        };

        let request_id = envelope.request_id;
        let request = match envelope.into_request() {
            Ok(request) => request,
            Err(reason) => {
                worker.sink.log(
                    LogLevel::Warn,
                    CONTEXT,
                    "rejected request",
                    &[("request_id", request_id.to_string()), ("reason", reason.clone())],
                );
                send_frame(&response_tx, &ResponseEnvelope::error(Some(request_id), reason))
                    .await;
                continue;
            }
        };

        if let ActionRequest::SetNetwork { network: next } = request {
            worker.sink.log(
                LogLevel::Info,
                CONTEXT,
                "network switched",
                &[("from", network.to_string()), ("to", next.to_string())],
            );
            network = next;
            let reply = ResponseEnvelope::success(Some(request_id), &ActionResult::NetworkSet(next));
            send_frame(&response_tx, &reply).await;
            continue;
        }

        let ledger = worker.ledgers.select(network);
        let worker = worker.clone();
        let response_tx = response_tx.clone();
        tokio::spawn(async move {
            let action = request.kind();
            let outcome = AssertUnwindSafe(worker.execute(ledger.as_ref(), request))
                .catch_unwind()
                .await;

            let reply = match outcome {
                Ok(Ok(result)) => {
                    worker.sink.log(
                        LogLevel::Debug,
                        CONTEXT,
                        "action completed",
                        &[("action", action.to_string()), ("request_id", request_id.to_string())],
                    );
                    ResponseEnvelope::success(Some(request_id), &result)
                }
                Ok(Err(reason)) => {
                    worker.sink.log(
                        LogLevel::Warn,
                        CONTEXT,
                        "action failed",
                        &[
                            ("action", action.to_string()),
                            ("request_id", request_id.to_string()),
                            ("reason", reason.clone()),
                        ],
                    );
                    ResponseEnvelope::error(Some(request_id), reason)
                }
                Err(_) => {
                    worker.sink.log(
                        LogLevel::Error,
                        CONTEXT,
                        "action panicked",
                        &[("action", action.to_string()), ("request_id", request_id.to_string())],
                    );
                    ResponseEnvelope::error(
                        Some(request_id),
                        format!("{action} failed unexpectedly"),
                    )
                }
            };

            send_frame(&response_tx, &reply).await;
        });
    }

    worker
        .sink
        .log(LogLevel::Info, CONTEXT, "request channel closed; worker exiting", &[]);
}

// Returns false once the coordinator side has gone away.
async fn send_frame(response_tx: &mpsc::Sender<String>, envelope: &ResponseEnvelope) -> bool {
    match serde_json::to_string(envelope) {
        Ok(frame) => response_tx.send(frame).await.is_ok(),
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize response envelope");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface_adapters::protocol::{ResponseKind, ResponseResult};
    use crate::use_cases::test_support::{LedgerFailures, RecordingLedger, RecordingSink};
    use crate::use_cases::types::ActionKind;
    use std::time::Duration;
    use tokio::time::timeout;

    struct Harness {
        requests: mpsc::Sender<String>,
        responses: mpsc::Receiver<String>,
        local: Arc<RecordingLedger>,
        testnet: Arc<RecordingLedger>,
    }

    impl Harness {
        async fn start(local: RecordingLedger, testnet: RecordingLedger) -> Self {
            let local = Arc::new(local);
            let testnet = Arc::new(testnet);
            let worker = Arc::new(ActionWorker::new(
                LedgerSet::new(local.clone(), testnet.clone()),
                Arc::new(RecordingSink::default()),
            ));
            let (requests, request_rx) = mpsc::channel(16);
            let (response_tx, mut responses) = mpsc::channel(16);
            tokio::spawn(worker_task(worker, request_rx, response_tx, Network::Local));

            let init = next_response(&mut responses).await;
            assert_eq!(init.kind, ResponseKind::Init);

            Self {
                requests,
                responses,
                local,
                testnet,
            }
        }

        async fn send(&self, request_id: u64, request: ActionRequest) {
            let frame = serde_json::to_string(&RequestEnvelope::new(request_id, &request))
                .expect("serialize request");
            self.requests.send(frame).await.expect("worker alive");
        }

        async fn next(&mut self) -> ResponseEnvelope {
            next_response(&mut self.responses).await
        }
    }

    async fn next_response(responses: &mut mpsc::Receiver<String>) -> ResponseEnvelope {
        let frame = timeout(Duration::from_secs(2), responses.recv())
            .await
            .expect("response in time")
            .expect("worker alive");
        serde_json::from_str(&frame).expect("valid response frame")
    }

    #[tokio::test]
    async fn create_game_reports_creator_derived_from_key() {
        let mut harness = Harness::start(RecordingLedger::new(), RecordingLedger::new()).await;

        harness
            .send(
                1,
                ActionRequest::CreateGame {
                    game_id: 1,
                    private_key: "priv_test_abc123".to_string(),
                },
            )
            .await;
        let response = harness.next().await;

        assert_eq!(response.request_id, Some(1));
        let created = response
            .into_outcome(ActionKind::CreateGame)
            .expect("create succeeds");
        let ActionResult::GameCreated(created) = created else {
            panic!("expected a created game");
        };
        assert_eq!(created.game_id, 1);
        assert_eq!(created.creator, derive_address("priv_test_abc123").unwrap());
        assert!(created.state.is_some());
    }

    #[tokio::test]
    async fn malformed_key_fails_the_action_and_worker_keeps_serving() {
        let mut harness = Harness::start(RecordingLedger::new(), RecordingLedger::new()).await;

        harness
            .send(
                1,
                ActionRequest::JoinGame {
                    game_id: 1,
                    private_key: "not-a-key".to_string(),
                },
            )
            .await;
        let failed = harness.next().await;
        harness.send(2, ActionRequest::GetKey).await;
        let key = harness.next().await;

        assert_eq!(failed.kind, ResponseKind::Error);
        assert_eq!(failed.request_id, Some(1));
        assert_eq!(key.kind, ResponseKind::Key);
        assert_eq!(key.request_id, Some(2));
        assert!(harness.local.calls().is_empty());
    }

    #[tokio::test]
    async fn negative_bet_never_reaches_the_ledger() {
        let mut harness = Harness::start(RecordingLedger::new(), RecordingLedger::new()).await;

        harness
            .send(
                1,
                ActionRequest::PlaceBet {
                    game_id: 1,
                    amount: -5.0,
                    private_key: "priv_test_abc123".to_string(),
                },
            )
            .await;
        let response = harness.next().await;

        assert_eq!(response.kind, ResponseKind::Error);
        assert!(harness.local.calls().is_empty());
    }

    #[tokio::test]
    async fn undecodable_frame_with_request_id_gets_an_error_reply() {
        let mut harness = Harness::start(RecordingLedger::new(), RecordingLedger::new()).await;

        harness
            .requests
            .send(r#"{"action":"fold","requestId":77}"#.to_string())
            .await
            .expect("worker alive");
        let response = harness.next().await;

        assert_eq!(response.kind, ResponseKind::Error);
        assert_eq!(response.request_id, Some(77));
    }

    #[tokio::test]
    async fn network_switch_only_affects_later_requests() {
        let local = RecordingLedger::new().with_delay("game_state", Duration::from_millis(100));
        let mut harness = Harness::start(local, RecordingLedger::new()).await;

        harness.send(1, ActionRequest::GetGameState { game_id: 1 }).await;
        harness
            .send(
                2,
                ActionRequest::SetNetwork {
                    network: Network::Testnet,
                },
            )
            .await;
        harness.send(3, ActionRequest::GetGameState { game_id: 1 }).await;

        let mut ids = Vec::new();
        for _ in 0..3 {
            let response = harness.next().await;
            assert_ne!(response.kind, ResponseKind::Error);
            ids.push(response.request_id);
        }

        // The slow local query finishes last but still ran against the local ledger.
        assert_eq!(ids.last(), Some(&Some(1)));
        assert_eq!(harness.local.calls(), vec!["game_state:1".to_string()]);
        assert_eq!(harness.testnet.calls(), vec!["game_state:1".to_string()]);
    }

    #[tokio::test]
    async fn chips_failure_does_not_block_game_state_query() {
        let local = RecordingLedger::new().with_failures(LedgerFailures {
            chips_state: true,
            ..Default::default()
        });
        let mut harness = Harness::start(local, RecordingLedger::new()).await;

        harness.send(1, ActionRequest::GetChipsState { game_id: 1 }).await;
        harness.send(2, ActionRequest::GetGameState { game_id: 1 }).await;
        let first = harness.next().await;
        let second = harness.next().await;

        let mut by_id = [first, second];
        by_id.sort_by_key(|response| response.request_id);
        assert_eq!(by_id[0].kind, ResponseKind::Error);
        assert_eq!(by_id[1].kind, ResponseKind::GameState);
    }

    #[tokio::test]
    async fn panicking_ledger_call_becomes_an_error_response() {
        let local = RecordingLedger::new().with_failures(LedgerFailures {
            panic_on_cards: true,
            ..Default::default()
        });
        let mut harness = Harness::start(local, RecordingLedger::new()).await;

        harness
            .send(
                1,
                ActionRequest::GetCardsState {
                    game_id: 1,
                    private_key: "priv_test_abc123".to_string(),
                },
            )
            .await;
        let failed = harness.next().await;
        harness.send(2, ActionRequest::GetGameState { game_id: 1 }).await;
        let recovered = harness.next().await;

        assert_eq!(failed.kind, ResponseKind::Error);
        assert!(matches!(failed.result, ResponseResult::Text(ref reason) if reason.contains("get_cards_state")));
        assert_eq!(recovered.kind, ResponseKind::GameState);
    }
}
