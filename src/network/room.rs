//! Room Management
//!
//! A room hosts exactly one match: two seated players plus any number
//! of spectators. The room validates every intent through the rule
//! engine while holding its own lock, so the validate-mutate-broadcast
//! sequence is atomic per room and every participant observes the same
//! snapshot order.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::game::board::Coord;
use crate::game::nation::NationId;
use crate::game::rules::{self, AttackReport, RuleError, SelectOutcome};
use crate::game::state::{GameState, Phase, RuleConfig};
use crate::network::protocol::{GameAction, MessageKind, PlayerInfo, ServerMessage};

/// Unique identifier for one WebSocket connection.
pub type ConnId = Uuid;

/// A room-level failure the registry must act on.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RoomError {
    /// The rule engine reported a broken invariant. The room is no
    /// longer trustworthy and must be torn down; other rooms continue.
    #[error("engine fault in room: {0}")]
    EngineFault(String),
}

/// What a join resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRole {
    /// Took a player seat.
    Seated(u8),
    /// Both seats were taken; watching.
    Spectator,
}

/// A seated player.
struct Seat {
    number: u8,
    name: String,
    conn: ConnId,
    sender: mpsc::Sender<ServerMessage>,
}

/// One match room.
pub struct Room {
    /// Room identifier, as chosen by the first joiner.
    pub id: String,
    seats: Vec<Seat>,
    spectators: BTreeMap<ConnId, mpsc::Sender<ServerMessage>>,
    state: GameState,
}

impl Room {
    /// Create an empty room with a fixed ruleset configuration.
    pub fn new(id: String, config: RuleConfig) -> Self {
        Self {
            id,
            seats: Vec::new(),
            spectators: BTreeMap::new(),
            state: GameState::new(config),
        }
    }

    /// Seated player count.
    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }

    /// Spectator count.
    pub fn spectator_count(&self) -> usize {
        self.spectators.len()
    }

    /// Whether nobody is connected to this room anymore.
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty() && self.spectators.is_empty()
    }

    /// Read access to the match state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    fn seat_of(&self, conn: ConnId) -> Option<u8> {
        self.seats.iter().find(|s| s.conn == conn).map(|s| s.number)
    }

    fn seat_name(&self, number: u8) -> Option<&str> {
        self.seats
            .iter()
            .find(|s| s.number == number)
            .map(|s| s.name.as_str())
    }

    /// Send a message to every seat and spectator. Best effort: a full
    /// outbound queue drops the message rather than stalling the room,
    /// and a closed channel is cleaned up at disconnect.
    pub async fn broadcast(&self, message: ServerMessage) {
        for seat in &self.seats {
            if let Err(mpsc::error::TrySendError::Full(_)) =
                seat.sender.try_send(message.clone())
            {
                warn!(room = %self.id, seat = seat.number, "outbound queue full, dropping message");
            }
        }
        for (conn, sender) in &self.spectators {
            if let Err(mpsc::error::TrySendError::Full(_)) = sender.try_send(message.clone()) {
                warn!(room = %self.id, %conn, "outbound queue full, dropping message");
            }
        }
    }

    fn snapshot(&self) -> ServerMessage {
        let mut player_names = BTreeMap::new();
        for seat in &self.seats {
            player_names.insert(seat.number.to_string(), seat.name.clone());
        }
        ServerMessage::GameStateUpdate {
            state: self.state.clone(),
            player_names,
        }
    }

    fn player_list(&self) -> ServerMessage {
        ServerMessage::PlayerListUpdate {
            players: self
                .seats
                .iter()
                .map(|seat| PlayerInfo {
                    player_number: seat.number,
                    player_name: seat.name.clone(),
                    nation: self.state.nation_of(seat.number),
                })
                .collect(),
            spectator_count: self.spectators.len(),
        }
    }

    async fn broadcast_room_state(&self) {
        self.broadcast(self.player_list()).await;
        self.broadcast(self.snapshot()).await;
    }

    async fn announce(&self, message: String, kind: MessageKind) {
        self.broadcast(ServerMessage::GameMessage { message, kind })
            .await;
    }

    /// Add a participant. The first two connections take seats; later
    /// ones spectate. Seating the second player starts the match.
    pub async fn join(
        &mut self,
        conn: ConnId,
        name: String,
        sender: mpsc::Sender<ServerMessage>,
    ) -> JoinRole {
        let role = if self.seats.len() < 2 {
            // The survivor of an earlier departure keeps seat 1.
            let number = if self.seats.iter().any(|s| s.number == 1) {
                2
            } else {
                1
            };
            self.seats.push(Seat {
                number,
                name: name.clone(),
                conn,
                sender: sender.clone(),
            });
            if self.seats.len() == 2 {
                self.state.begin();
            }
            JoinRole::Seated(number)
        } else {
            self.spectators.insert(conn, sender.clone());
            JoinRole::Spectator
        };

        let reply = match role {
            JoinRole::Seated(number) => ServerMessage::PlayerAssigned {
                player_number: number,
                player_name: name.clone(),
                room_id: self.id.clone(),
            },
            JoinRole::Spectator => ServerMessage::JoinedAsSpectator {
                room_id: self.id.clone(),
            },
        };
        let _ = sender.send(reply).await;

        info!(room = %self.id, %conn, ?role, "participant joined");
        self.announce(format!("{} joined the room", name), MessageKind::Info)
            .await;
        if self.state.phase == Phase::NationSelection && self.seats.len() == 2 {
            self.announce("Both players present. Choose your nations".to_string(), MessageKind::Info)
                .await;
        }
        self.broadcast_room_state().await;
        role
    }

    /// Remove a participant. A departing seat aborts the match: the
    /// survivor is renumbered to seat 1 and the state returns to
    /// waiting for a new opponent.
    pub async fn leave(&mut self, conn: ConnId) {
        if self.spectators.remove(&conn).is_some() {
            self.broadcast_room_state().await;
            return;
        }
        let Some(pos) = self.seats.iter().position(|s| s.conn == conn) else {
            return;
        };
        let departed = self.seats.remove(pos);
        info!(room = %self.id, seat = departed.number, "player left");

        if let Some(survivor) = self.seats.first_mut() {
            survivor.number = 1;
        }
        self.state.reset();

        self.announce(
            format!("{} left the room. Waiting for a new opponent", departed.name),
            MessageKind::Info,
        )
        .await;
        self.broadcast_room_state().await;
    }

    /// Claim a nation for the connection's seat. Failures are answered
    /// directly to the requester; nothing is broadcast for them.
    pub async fn select_nation(
        &mut self,
        conn: ConnId,
        nation: NationId,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        let Some(seat) = self.seat_of(conn) else {
            let _ = sender
                .send(ServerMessage::Error {
                    reason: "spectators cannot select a nation".to_string(),
                })
                .await;
            return;
        };

        match rules::select_nation(&mut self.state, seat, nation) {
            Ok(()) => {
                let name = self.seat_name(seat).unwrap_or("player").to_string();
                self.announce(
                    format!("{} fields {}", name, nation.catalog().name),
                    MessageKind::Info,
                )
                .await;
                if self.state.phase == Phase::Placement {
                    self.announce("Placement begins".to_string(), MessageKind::Info)
                        .await;
                }
                self.broadcast_room_state().await;
            }
            Err(err) => {
                let _ = sender
                    .send(ServerMessage::Error {
                        reason: err.to_string(),
                    })
                    .await;
            }
        }
    }

    /// Resolve an in-match intent. Spectator actions and out-of-turn
    /// intents are dropped without a reply; other rule violations are
    /// broadcast as advisories so both players see the call.
    pub async fn apply_action(&mut self, conn: ConnId, action: GameAction) -> Result<(), RoomError> {
        let Some(seat) = self.seat_of(conn) else {
            return Ok(());
        };

        let result = self.dispatch(seat, action);
        match result {
            Ok(events) => {
                for (message, kind) in events {
                    self.announce(message, kind).await;
                }
                self.broadcast_room_state().await;
                Ok(())
            }
            Err(RuleError::NotYourTurn) => Ok(()),
            Err(RuleError::Internal(detail)) => {
                warn!(room = %self.id, %detail, "engine fault");
                Err(RoomError::EngineFault(detail))
            }
            Err(err) => {
                self.announce(err.to_string(), MessageKind::Advisory).await;
                Ok(())
            }
        }
    }

    /// Route one intent to the rule engine and collect the event lines
    /// an accepted intent produces.
    fn dispatch(
        &mut self,
        seat: u8,
        action: GameAction,
    ) -> Result<Vec<(String, MessageKind)>, RuleError> {
        let mut events = Vec::new();
        match action {
            GameAction::PlacePiece {
                row,
                col,
                piece_type,
            } => {
                rules::place_piece(&mut self.state, seat, piece_type, Coord::new(row, col))?;
            }
            GameAction::SelectPieceType { piece_type } => {
                rules::select_piece_type(&mut self.state, seat, piece_type)?;
            }
            GameAction::SelectCell { row, col } => {
                let at = Coord::new(row, col);
                match rules::select_cell(&mut self.state, seat, at)? {
                    SelectOutcome::Attacked(report) => {
                        self.describe_attack(seat, &report, &mut events);
                    }
                    SelectOutcome::Moved(report) if report.healed => {
                        events.push((
                            "A piece returned home and was replenished".to_string(),
                            MessageKind::Info,
                        ));
                    }
                    _ => {}
                }
            }
            GameAction::EndTurn => {
                let was_placement = self.state.phase == Phase::Placement;
                let report = rules::end_turn(&mut self.state, seat)?;
                if was_placement && report.phase == Phase::Battle {
                    events.push(("Battle begins".to_string(), MessageKind::Info));
                }
            }
            GameAction::ToggleOption { option } => {
                rules::toggle_option(&mut self.state, option)?;
                events.push((format!("Ruleset option {:?} toggled", option), MessageKind::Info));
            }
        }
        Ok(events)
    }

    fn describe_attack(
        &self,
        seat: u8,
        report: &AttackReport,
        events: &mut Vec<(String, MessageKind)>,
    ) {
        let mut line = format!(
            "{} hits {} for {} damage",
            report.attacker.display_name(),
            report.target.display_name(),
            report.damage
        );
        if report.charged {
            line.push_str(" (charge)");
        }
        if report.killed {
            line.push_str(". It falls");
        }
        events.push((line, MessageKind::Combat));

        for hit in &report.cleave_hits {
            let mut line = format!("Cleave strikes {}", hit.target.display_name());
            if hit.killed {
                line.push_str(". It falls");
            }
            events.push((line, MessageKind::Combat));
        }

        if let Some(winner) = report.winner {
            let name = self
                .seat_name(winner)
                .unwrap_or(if winner == seat { "You" } else { "Opponent" })
                .to_string();
            events.push((
                format!("The enemy General falls. {} wins the match", name),
                MessageKind::Victory,
            ));
        }
    }
}
