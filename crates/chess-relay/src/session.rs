//! One game between two connections.
//!
//! A session never performs I/O. Each call returns the [`Delivery`] list the
//! server must write out, which keeps turn handling testable on its own.

use chrono::{DateTime, Utc};

use crate::chess::{Acceptance, MoveRejection, MoveResult, RuleEngine};
use crate::matchmaking::Pairing;
use crate::protocol::ServerMessage;
use crate::types::{Color, ConnectionId, GameId};

/// A message addressed to one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub to: ConnectionId,
    pub message: ServerMessage,
}

impl Delivery {
    #[must_use]
    pub fn new(to: ConnectionId, message: ServerMessage) -> Self {
        Self { to, message }
    }
}

/// Outcome of one submitted token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub result: MoveResult,
    pub deliveries: Vec<Delivery>,
}

/// Two connections bound to one rule engine.
#[derive(Debug)]
pub struct GameSession {
    id: GameId,
    white: ConnectionId,
    black: ConnectionId,
    engine: RuleEngine,
    started_at: DateTime<Utc>,
}

impl GameSession {
    /// A new game from the standard position.
    #[must_use]
    pub fn new(pairing: Pairing) -> Self {
        Self::with_engine(pairing, RuleEngine::new())
    }

    /// A game continuing from `engine`'s position.
    #[must_use]
    pub fn with_engine(pairing: Pairing, engine: RuleEngine) -> Self {
        debug_assert_ne!(pairing.white, pairing.black, "a game needs two connections");
        Self {
            id: GameId::new(),
            white: pairing.white,
            black: pairing.black,
            engine,
            started_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn id(&self) -> GameId {
        self.id
    }

    #[must_use]
    pub fn white(&self) -> ConnectionId {
        self.white
    }

    #[must_use]
    pub fn black(&self) -> ConnectionId {
        self.black
    }

    #[must_use]
    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn player(&self, color: Color) -> ConnectionId {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    /// Connection whose color is to move.
    #[must_use]
    pub fn active(&self) -> ConnectionId {
        self.player(self.engine.turn())
    }

    #[must_use]
    pub fn opponent_of(&self, id: ConnectionId) -> Option<ConnectionId> {
        if id == self.white {
            Some(self.black)
        } else if id == self.black {
            Some(self.white)
        } else {
            None
        }
    }

    /// Messages announcing the start of the game.
    #[must_use]
    pub fn start(&self) -> Vec<Delivery> {
        vec![
            Delivery::new(self.white, ServerMessage::Setup),
            Delivery::new(self.black, ServerMessage::Setup),
            Delivery::new(self.active(), ServerMessage::YourTurn),
        ]
    }

    /// Handle one token from `from`.
    ///
    /// Only the active player's connection reaches the engine. Accepted
    /// tokens are echoed to both players; rejections go to the mover alone.
    pub fn submit(&mut self, from: ConnectionId, token: &str) -> Submission {
        if from != self.active() {
            tracing::debug!(game = %self.id, connection = %from, token, "move out of turn");
            return Submission {
                result: Err(MoveRejection::NotInTurn),
                deliveries: vec![Delivery::new(from, ServerMessage::NotYourTurn)],
            };
        }

        let result = self.engine.submit_move(token);
        tracing::debug!(game = %self.id, connection = %from, token, ?result, "move evaluated");

        let deliveries = match result {
            Ok(Acceptance::Accepted | Acceptance::PromotionPending) => {
                let echo = ServerMessage::Moved(token.to_string());
                vec![
                    Delivery::new(self.white, echo.clone()),
                    Delivery::new(self.black, echo),
                    Delivery::new(self.active(), ServerMessage::YourTurn),
                ]
            }
            Err(reason) => vec![Delivery::new(from, ServerMessage::Rejected(reason))],
        };
        Submission { result, deliveries }
    }
}
