use prometheus::{IntCounter, IntGauge, Opts, Registry};

/// Relay-level prometheus metrics.
#[derive(Clone)]
pub struct ServerMetrics {
    /// Number of open connections.
    pub connections: IntGauge,
    /// Number of connections waiting for an opponent (0 or 1).
    pub waiting: IntGauge,
    /// Number of games in progress.
    pub games: IntGauge,
    /// Moves accepted by a rule engine, promotions included.
    pub moves_accepted: IntCounter,
    /// Moves refused, by the turn check or by a rule engine.
    pub moves_rejected: IntCounter,
}

impl ServerMetrics {
    /// Create metrics and register them with the given prometheus registry.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let metrics = Self::build()?;
        registry.register(Box::new(metrics.connections.clone()))?;
        registry.register(Box::new(metrics.waiting.clone()))?;
        registry.register(Box::new(metrics.games.clone()))?;
        registry.register(Box::new(metrics.moves_accepted.clone()))?;
        registry.register(Box::new(metrics.moves_rejected.clone()))?;
        Ok(metrics)
    }

    /// Create metrics without registering (for testing).
    pub fn unregistered() -> Self {
        Self::build().expect("valid metric names")
    }

    fn build() -> Result<Self, prometheus::Error> {
        Ok(Self {
            connections: IntGauge::with_opts(Opts::new(
                "relay_connections",
                "Number of open connections",
            ))?,
            waiting: IntGauge::with_opts(Opts::new(
                "relay_waiting",
                "Number of connections waiting for an opponent",
            ))?,
            games: IntGauge::with_opts(Opts::new("relay_games", "Number of games in progress"))?,
            moves_accepted: IntCounter::with_opts(Opts::new(
                "relay_moves_accepted",
                "Moves accepted by a rule engine",
            ))?,
            moves_rejected: IntCounter::with_opts(Opts::new(
                "relay_moves_rejected",
                "Moves refused by the turn check or a rule engine",
            ))?,
        })
    }
}
