use tracing_subscriber::{fmt, EnvFilter};

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[derive(Debug, Clone)]
pub struct TickMetrics {
    pub tick: u64,
    pub duration_us: u128,
    pub event_count: usize,
    pub player_count: usize,
    pub mob_count: usize,
}

impl TickMetrics {
    /// Log one tick. Budget is the tick interval; going over it means the
    /// simulation is falling behind wall-clock time.
    pub fn log(&self, budget_us: u128) {
        if self.duration_us > budget_us {
            tracing::warn!(
                tick = self.tick,
                duration_us = self.duration_us,
                events = self.event_count,
                players = self.player_count,
                mobs = self.mob_count,
                "tick exceeded budget ({}us > {}us)",
                self.duration_us,
                budget_us
            );
        } else {
            tracing::debug!(
                tick = self.tick,
                duration_us = self.duration_us,
                events = self.event_count,
                players = self.player_count,
                mobs = self.mob_count,
                "tick completed"
            );
        }
    }
}
