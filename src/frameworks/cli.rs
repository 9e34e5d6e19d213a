// Line-oriented command loop over the session facade. Each command prints one JSON line.

use crate::domain::account::derive_address;
use crate::domain::Network;
use crate::interface_adapters::protocol::ResponseEnvelope;
use crate::use_cases::{ActionResult, ClientError, GameSession};

use serde_json::{json, Value};
use std::io::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Key,
    Create(u64),
    Join(u64),
    Bet { game_id: u64, amount: f64 },
    Network(Network),
    State(u64),
    Chips(u64),
    Cards(u64),
    Status,
    Quit,
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> std::result::Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (name.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("key", []) => Command::Key,
        ("create", [id]) => Command::Create(game_id(id)?),
        ("join", [id]) => Command::Join(game_id(id)?),
        ("bet", [id, amount]) => Command::Bet {
            game_id: game_id(id)?,
            amount: amount
                .parse()
                .map_err(|_| format!("invalid amount `{amount}`"))?,
        },
        ("network", [network]) => Command::Network(network.parse()?),
        ("state", [id]) => Command::State(game_id(id)?),
        ("chips", [id]) => Command::Chips(game_id(id)?),
        ("cards", [id]) => Command::Cards(game_id(id)?),
        ("status", []) => Command::Status,
        ("quit" | "exit", []) => Command::Quit,
        (other, _) => return Err(format!("unknown command or arguments: `{other}`")),
    };

    Ok(Some(command))
}

fn game_id(raw: &str) -> std::result::Result<u64, String> {
    raw.parse().map_err(|_| format!("invalid game id `{raw}`"))
}

/// Runs one command and renders its outcome in the response wire shape.
pub async fn execute(session: &GameSession, command: Command) -> Value {
    let outcome: std::result::Result<ActionResult, ClientError> = match command {
        Command::Key => session.generate_account().await.map(ActionResult::Key),
        Command::Create(id) => session.create_game(id).await.map(ActionResult::GameCreated),
        Command::Join(id) => session.join_game(id).await.map(ActionResult::GameJoined),
        Command::Bet { game_id, amount } => session
            .place_bet(game_id, amount)
            .await
            .map(ActionResult::BetPlaced),
        Command::Network(network) => session
            .set_network(network)
            .await
            .map(|()| ActionResult::NetworkSet(network)),
        Command::State(id) => session.fetch_game_state(id).await.map(ActionResult::GameState),
        Command::Chips(id) => session.fetch_chips_state(id).await.map(ActionResult::ChipsState),
        Command::Cards(id) => session.fetch_cards_state(id).await.map(ActionResult::CardsState),
        Command::Status => return status(session),
        Command::Quit => return json!({ "type": "quit" }),
    };

    let envelope = match outcome {
        Ok(result) => ResponseEnvelope::success(None, &result),
        Err(err) => ResponseEnvelope::error(None, err.to_string()),
    };
    serde_json::to_value(envelope).unwrap_or_else(|e| json!({ "type": "error", "result": e.to_string() }))
}

fn status(session: &GameSession) -> Value {
    let state = session.snapshot();
    let address = state
        .private_key
        .as_deref()
        .and_then(|key| derive_address(key).ok());
    let worker = format!("{:?}", *session.lifecycle().borrow());

    json!({
        "type": "status",
        "result": {
            "network": state.network,
            "connectionStatus": state.connection_status,
            "address": address,
            "lastGameId": state.last_game_state.as_ref().map(|game| game.id),
            "error": state.error,
            "worker": worker,
        }
    })
}

pub async fn run_commands<R, W>(session: &GameSession, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let reply = match parse_command(&line) {
            Ok(None) => continue,
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => execute(session, command).await,
            Err(reason) => json!({ "type": "error", "result": reason }),
        };

        output.write_all(reply.to_string().as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }

    Ok(())
}
