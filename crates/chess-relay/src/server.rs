//! TCP relay: accepts connections, pairs them into games and forwards moves.
//!
//! All relay state lives in a single dispatch loop. Per-connection reader
//! tasks only decode frames and forward them as [`Event`]s over a bounded
//! channel; writer tasks only encode what the loop queues for them. No lock
//! guards the connection table because nothing outside the loop touches it.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::chess::MoveRejection;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::matchmaking::{Matchmaker, Pairing};
use crate::metrics::ServerMetrics;
use crate::protocol::{Inbound, RelayCodec, ServerMessage};
use crate::session::{Delivery, GameSession};
use crate::types::{ConnectionId, GameId};

/// Back-off after a failed `accept`, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Something a connection task reports to the dispatch loop.
#[derive(Debug)]
enum Event {
    Frame { id: ConnectionId, inbound: Inbound },
    Closed {
        id: ConnectionId,
        error: Option<std::io::Error>,
    },
}

/// One row of the connection table.
struct Connection {
    peer: SocketAddr,
    /// Bounded by `outbox_capacity`; a peer that lets it fill is dropped.
    outbox: mpsc::Sender<ServerMessage>,
    /// Stops the reader task when the server drops the connection.
    cancel: CancellationToken,
    game: Option<GameId>,
}

/// A bound relay, ready to [`run`](Server::run).
pub struct Server {
    config: ServerConfig,
    listener: TcpListener,
    metrics: ServerMetrics,
}

impl Server {
    /// Validate `config` and bind its listen address.
    pub async fn bind(config: ServerConfig, metrics: ServerMetrics) -> Result<Self, ServerError> {
        config.validate()?;
        let addr = config.listen_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        Ok(Self {
            config,
            listener,
            metrics,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    #[must_use]
    pub fn metrics(&self) -> &ServerMetrics {
        &self.metrics
    }

    /// Serve until `shutdown` resolves.
    ///
    /// Every open connection is closed on return; messages already queued
    /// for a connection are still flushed.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let (events_tx, mut events) = mpsc::channel(self.config.event_queue_capacity);
        let mut relay = Relay::new(self.config, events_tx, self.metrics);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                Some(event) = events.recv() => relay.dispatch(event),
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => relay.on_connect(stream, peer),
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        relay.close_all();
        Ok(())
    }
}

/// Connection table, open games and matchmaking slot.
struct Relay {
    config: ServerConfig,
    connections: HashMap<ConnectionId, Connection>,
    games: HashMap<GameId, GameSession>,
    matchmaker: Matchmaker,
    next_id: u64,
    events: mpsc::Sender<Event>,
    metrics: ServerMetrics,
}

impl Relay {
    fn new(config: ServerConfig, events: mpsc::Sender<Event>, metrics: ServerMetrics) -> Self {
        Self {
            connections: HashMap::with_capacity(config.max_connections),
            config,
            games: HashMap::new(),
            matchmaker: Matchmaker::new(),
            next_id: 1,
            events,
            metrics,
        }
    }

    fn codec(&self) -> RelayCodec {
        RelayCodec::new(self.config.max_frame_len, self.config.terminator)
    }

    fn dispatch(&mut self, event: Event) {
        match event {
            Event::Frame { id, inbound } => self.on_frame(id, inbound),
            Event::Closed { id, error } => self.on_closed(id, error),
        }
    }

    #[instrument(skip_all, fields(peer = %peer))]
    fn on_connect(&mut self, stream: TcpStream, peer: SocketAddr) {
        if self.connections.len() >= self.config.max_connections {
            tracing::warn!(
                max_connections = self.config.max_connections,
                "connection table full, refusing"
            );
            let mut sink = FramedWrite::new(stream, self.codec());
            tokio::spawn(async move {
                if let Err(e) = sink.send(ServerMessage::ServerFull).await {
                    tracing::debug!(error = %e, "failed to notify refused connection");
                }
            });
            return;
        }

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "set_nodelay failed");
        }

        let id = ConnectionId::new(self.next_id);
        self.next_id += 1;

        let (read_half, write_half) = stream.into_split();
        let (outbox, inbox) = mpsc::channel(self.config.outbox_capacity);
        let cancel = CancellationToken::new();

        tokio::spawn(read_frames(
            id,
            FramedRead::new(read_half, self.codec()),
            self.events.clone(),
            cancel.clone(),
        ));
        tokio::spawn(write_frames(
            id,
            FramedWrite::new(write_half, self.codec()),
            inbox,
        ));

        self.connections.insert(
            id,
            Connection {
                peer,
                outbox,
                cancel,
                game: None,
            },
        );
        tracing::info!(connection = %id, "connection accepted");

        if let Some(pairing) = self.matchmaker.enqueue(id) {
            self.start_game(pairing);
        }
        self.refresh_gauges();
    }

    fn start_game(&mut self, pairing: Pairing) {
        let session = GameSession::new(pairing);
        let game = session.id();
        for id in [pairing.white, pairing.black] {
            if let Some(conn) = self.connections.get_mut(&id) {
                conn.game = Some(game);
            }
        }
        tracing::info!(
            game = %game,
            white = %pairing.white,
            black = %pairing.black,
            "game started"
        );
        let deliveries = session.start();
        self.games.insert(game, session);
        self.deliver(deliveries);
    }

    #[instrument(skip_all, fields(connection = %id))]
    fn on_frame(&mut self, id: ConnectionId, inbound: Inbound) {
        let game = match self.connections.get(&id) {
            Some(conn) => conn.game,
            // The connection was dropped while this frame was queued.
            None => return,
        };

        let token = match inbound {
            Inbound::Token(token) => token,
            unreadable @ (Inbound::Oversized | Inbound::Malformed) => {
                tracing::warn!(frame = ?unreadable, "unreadable frame");
                self.metrics.moves_rejected.inc();
                self.send(id, ServerMessage::Rejected(MoveRejection::InvalidFormat));
                return;
            }
        };

        let Some(session) = game.and_then(|game| self.games.get_mut(&game)) else {
            tracing::debug!(token = %token, "move while waiting for an opponent");
            self.metrics.moves_rejected.inc();
            self.send(id, ServerMessage::NotYourTurn);
            return;
        };

        let submission = session.submit(id, &token);
        match submission.result {
            Ok(_) => self.metrics.moves_accepted.inc(),
            Err(_) => self.metrics.moves_rejected.inc(),
        }
        self.deliver(submission.deliveries);
    }

    #[instrument(skip_all, fields(connection = %id))]
    fn on_closed(&mut self, id: ConnectionId, error: Option<std::io::Error>) {
        let Some(conn) = self.connections.remove(&id) else {
            return;
        };
        conn.cancel.cancel();
        match error {
            Some(e) => tracing::warn!(peer = %conn.peer, error = %e, "connection failed"),
            None => tracing::info!(peer = %conn.peer, "connection closed by peer"),
        }

        self.matchmaker.cancel(id);
        if let Some(game) = conn.game {
            self.dissolve(game, id);
        }
        self.refresh_gauges();
    }

    /// End `game` after `leaver` disconnected and release the other player.
    fn dissolve(&mut self, game: GameId, leaver: ConnectionId) {
        let Some(session) = self.games.remove(&game) else {
            return;
        };
        tracing::info!(
            game = %game,
            leaver = %leaver,
            turn = %session.engine().turn(),
            duration_secs = (chrono::Utc::now() - session.started_at()).num_seconds(),
            "game dissolved"
        );
        if let Some(opponent) = session.opponent_of(leaver) {
            self.send(opponent, ServerMessage::OpponentLeft);
            self.drop_connection(opponent);
        }
    }

    /// Remove `id` from the table. Its writer flushes what is queued and
    /// then shuts the socket down.
    fn drop_connection(&mut self, id: ConnectionId) {
        if let Some(conn) = self.connections.remove(&id) {
            conn.cancel.cancel();
            self.matchmaker.cancel(id);
            tracing::info!(connection = %id, peer = %conn.peer, "connection closed by server");
        }
    }

    fn deliver(&mut self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            self.send(delivery.to, delivery.message);
        }
    }

    fn send(&mut self, id: ConnectionId, message: ServerMessage) {
        let Some(conn) = self.connections.get(&id) else {
            return;
        };
        match conn.outbox.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    connection = %id,
                    outbox_capacity = self.config.outbox_capacity,
                    "peer is not reading, dropping it"
                );
                self.evict(id);
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(connection = %id, "writer already gone");
            }
        }
    }

    /// Drop `id` from the server side and end any game it was playing.
    fn evict(&mut self, id: ConnectionId) {
        let game = self.connections.get(&id).and_then(|conn| conn.game);
        self.drop_connection(id);
        if let Some(game) = game {
            self.dissolve(game, id);
        }
        self.refresh_gauges();
    }

    fn refresh_gauges(&self) {
        self.metrics.connections.set(self.connections.len() as i64);
        self.metrics
            .waiting
            .set(i64::from(self.matchmaker.waiting().is_some()));
        self.metrics.games.set(self.games.len() as i64);
    }

    fn close_all(&mut self) {
        let ids: Vec<ConnectionId> = self.connections.keys().copied().collect();
        for id in ids {
            self.drop_connection(id);
        }
        self.games.clear();
        self.refresh_gauges();
        tracing::info!(
            matches_made = self.matchmaker.matches_made(),
            "relay stopped"
        );
    }
}

/// Decode frames from one connection until EOF, error or cancellation.
async fn read_frames(
    id: ConnectionId,
    mut frames: FramedRead<OwnedReadHalf, RelayCodec>,
    events: mpsc::Sender<Event>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            next = frames.next() => next,
        };
        let event = match next {
            Some(Ok(inbound)) => Event::Frame { id, inbound },
            Some(Err(e)) => Event::Closed { id, error: Some(e) },
            None => Event::Closed { id, error: None },
        };
        let last = matches!(event, Event::Closed { .. });
        if events.send(event).await.is_err() || last {
            return;
        }
    }
}

/// Write queued messages to one connection until the server drops its outbox.
async fn write_frames(
    id: ConnectionId,
    mut sink: FramedWrite<OwnedWriteHalf, RelayCodec>,
    mut inbox: mpsc::Receiver<ServerMessage>,
) {
    while let Some(message) = inbox.recv().await {
        if let Err(e) = sink.send(message).await {
            // The reader sees the same failure and reports the close.
            tracing::warn!(connection = %id, error = %e, "write failed");
            return;
        }
    }
    if let Err(e) = sink.close().await {
        tracing::debug!(connection = %id, error = %e, "shutdown failed");
    }
}
