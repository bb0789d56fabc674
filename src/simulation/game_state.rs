//! Game state tracking for the APB mini-game
//!
//! This module tracks the player's coins, the cooldown between APB runs and
//! the run history. It is the reference economy behind `ApbEconomy`.

use super::apb::{self, ApbEconomy, ApbOutcome, ApbResult};
use super::events::SimEvent;

/// Seconds between the end of one run and the start of the next
pub const APB_COOLDOWN_SECS: f32 = 300.0;

/// Length of a run
pub const APB_RUN_SECS: f32 = 60.0;

/// Coins the player starts with
pub const STARTING_COINS: u32 = 0;

/// Game state that tracks player progress and resources
#[derive(Debug, Clone)]
pub struct GameState {
    /// Player's current coins
    pub coins: u32,

    /// Subscribers earn more per hit
    pub subscriber: bool,

    /// Seconds until the next run may start
    pub cooldown_remaining: f32,

    /// Cooldown applied after every run
    pub cooldown_seconds: f32,

    pub run_duration: f32,

    pub runs_caught: u32,
    pub runs_evaded: u32,

    /// Most hits in a single run
    pub best_hits: u32,

    /// Game time in seconds
    pub time: f32,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// Create a new game state with starting conditions
    pub fn new() -> Self {
        Self {
            coins: STARTING_COINS,
            subscriber: false,
            cooldown_remaining: 0.0,
            cooldown_seconds: APB_COOLDOWN_SECS,
            run_duration: APB_RUN_SECS,
            runs_caught: 0,
            runs_evaded: 0,
            best_hits: 0,
            time: 0.0,
        }
    }

    /// Add coins to the wallet
    pub fn earn(&mut self, amount: u32) {
        self.coins = self.coins.saturating_add(amount);
    }

    /// Update game time and count the cooldown down
    pub fn update(&mut self, delta_secs: f32) {
        self.time += delta_secs;
        self.cooldown_remaining = (self.cooldown_remaining - delta_secs).max(0.0);
    }

    /// Credit hits and settle resolved runs from one tick of events
    pub fn apply_events(&mut self, events: &[SimEvent]) {
        apb::apply_events(self, events);
    }

    pub fn total_runs(&self) -> u32 {
        self.runs_caught + self.runs_evaded
    }

    /// Get a summary string for display
    pub fn summary(&self) -> String {
        format!(
            "Coins: {} | Runs: {} evaded, {} caught | Best hits: {} | Cooldown: {:.0}s",
            self.coins, self.runs_evaded, self.runs_caught, self.best_hits, self.cooldown_remaining
        )
    }
}

impl ApbEconomy for GameState {
    fn can_run(&self) -> bool {
        self.cooldown_remaining <= 0.0
    }

    fn duration_seconds(&self) -> f32 {
        self.run_duration
    }

    fn is_subscriber(&self) -> bool {
        self.subscriber
    }

    fn credit_hit(&mut self, coins: u32) {
        self.earn(coins);
    }

    /// Hit coins were already paid as they happened; only the bonuses are
    /// added here.
    fn settle(&mut self, result: &ApbResult) {
        self.earn(result.bonus + result.evasion);
        match result.result {
            ApbOutcome::Caught => self.runs_caught += 1,
            ApbOutcome::Evaded => self.runs_evaded += 1,
        }
        self.best_hits = self.best_hits.max(result.hits);
        self.cooldown_remaining = self.cooldown_seconds;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_pays_bonuses_and_rearms_cooldown() {
        let mut state = GameState::new();
        assert!(state.can_run());

        let result = ApbResult::score(ApbOutcome::Evaded, 60.0, 12, 60);
        state.apply_events(&[SimEvent::RunResolved(result)]);

        assert_eq!(state.coins, 50 + 100);
        assert_eq!(state.runs_evaded, 1);
        assert_eq!(state.best_hits, 12);
        assert!(!state.can_run());

        state.update(APB_COOLDOWN_SECS);
        assert!(state.can_run());
    }
}
