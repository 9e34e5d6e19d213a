// Shared mock ledger service for integration tests.
#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use poker_client::domain::Ledger;
use poker_client::interface_adapters::ledger::MemoryLedger;
use serde::{Deserialize, Serialize};
use std::{
    sync::{
        Arc, OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

// Base URL of the mock ledger shared by every test in the binary.
static SERVER_URL: OnceLock<String> = OnceLock::new();

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateGameBody {
    game_id: u64,
    creator: String,
}

#[derive(Deserialize)]
struct JoinGameBody {
    player: String,
}

#[derive(Deserialize)]
struct PlaceBetBody {
    player: String,
    amount: u64,
}

#[derive(Deserialize)]
struct CardsQuery {
    player: String,
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

type LedgerState = Arc<MemoryLedger>;

// Map ledger outcomes to JSON responses; missing games become 404.
fn respond<T: Serialize>(outcome: Result<T, String>) -> Response {
    match outcome {
        Ok(value) => Json(value).into_response(),
        Err(message) => {
            let status = if message.contains("not found") {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::BAD_REQUEST
            };
            (status, Json(ErrorBody { message })).into_response()
        }
    }
}

async fn create_game(State(ledger): State<LedgerState>, Json(body): Json<CreateGameBody>) -> Response {
    respond(ledger.create_game(body.game_id, &body.creator).await)
}

async fn join_game(
    State(ledger): State<LedgerState>,
    Path(game_id): Path<u64>,
    Json(body): Json<JoinGameBody>,
) -> Response {
    respond(ledger.join_game(game_id, &body.player).await)
}

async fn place_bet(
    State(ledger): State<LedgerState>,
    Path(game_id): Path<u64>,
    Json(body): Json<PlaceBetBody>,
) -> Response {
    respond(ledger.place_bet(game_id, &body.player, body.amount).await)
}

async fn game_state(State(ledger): State<LedgerState>, Path(game_id): Path<u64>) -> Response {
    respond(ledger.game_state(game_id).await)
}

async fn chips_state(State(ledger): State<LedgerState>, Path(game_id): Path<u64>) -> Response {
    respond(ledger.chips_state(game_id).await)
}

async fn cards_state(
    State(ledger): State<LedgerState>,
    Path(game_id): Path<u64>,
    Query(query): Query<CardsQuery>,
) -> Response {
    respond(ledger.cards_state(game_id, &query.player).await)
}

fn router() -> Router {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/{id}", get(game_state))
        .route("/games/{id}/join", post(join_game))
        .route("/games/{id}/bets", post(place_bet))
        .route("/games/{id}/chips", get(chips_state))
        .route("/games/{id}/cards", get(cards_state))
        .with_state(Arc::new(MemoryLedger::new()))
}

// Ensure the mock ledger is running and return its base URL.
pub fn ensure_ledger() -> &'static str {
    SERVER_URL.get_or_init(|| {
        let (url_tx, url_rx) = std::sync::mpsc::channel();
        // An OS thread keeps the server alive across individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("mock ledger runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral port");
                let addr = listener.local_addr().expect("local addr");
                url_tx.send(format!("http://{addr}")).expect("publish url");
                axum::serve(listener, router()).await.expect("mock ledger failed");
            });
        });

        let url = url_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("mock ledger did not start");
        wait_until_accepting(&url);
        url
    })
}

fn wait_until_accepting(base_url: &str) {
    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");
    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("mock ledger did not become ready in time");
}

// Game ids are unique per test binary because the mock ledger is shared.
pub fn next_game_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}
