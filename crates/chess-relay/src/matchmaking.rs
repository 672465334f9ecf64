//! Single-slot matchmaking queue.
//!
//! The first connection waits alone; the next one to arrive is paired with it.
//! The waiting player takes White.

use crate::types::ConnectionId;

/// A freshly paired couple, in join order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    pub white: ConnectionId,
    pub black: ConnectionId,
}

#[derive(Debug, Default)]
pub struct Matchmaker {
    waiting: Option<ConnectionId>,
    matches_made: u64,
}

impl Matchmaker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `entrant`, or pair it with whoever is already waiting.
    pub fn enqueue(&mut self, entrant: ConnectionId) -> Option<Pairing> {
        match self.waiting.take() {
            Some(white) if white != entrant => {
                self.matches_made += 1;
                tracing::debug!(%white, black = %entrant, "paired players");
                Some(Pairing {
                    white,
                    black: entrant,
                })
            }
            _ => {
                tracing::debug!(connection = %entrant, "waiting for an opponent");
                self.waiting = Some(entrant);
                None
            }
        }
    }

    /// Drop `id` from the queue if it is the one waiting. Returns whether it was.
    pub fn cancel(&mut self, id: ConnectionId) -> bool {
        if self.waiting == Some(id) {
            self.waiting = None;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn waiting(&self) -> Option<ConnectionId> {
        self.waiting
    }

    #[must_use]
    pub fn matches_made(&self) -> u64 {
        self.matches_made
    }
}
