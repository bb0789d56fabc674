//! APB run state machine
//!
//! A run goes Idle -> Active -> Caught | Evaded -> Idle. The economy
//! collaborator decides whether a run may start, how long it lasts and
//! whether the player is a subscriber; the run itself only tracks hits,
//! the timer and the traffic spawn ramp.

use log::info;
use thiserror::Error;

use super::events::SimEvent;

/// Coins per hit for regular players and for subscribers
pub const HIT_COINS: u32 = 5;
pub const SUBSCRIBER_HIT_COINS: u32 = 10;

/// Bonus for every started block of ten hits on an evaded run
pub const BONUS_PER_TEN_HITS: u32 = 25;

pub const EVASION_BONUS: u32 = 100;

/// Extra spawns per second at the start of a run, and its growth per
/// elapsed second
pub const RAMP_BASE: f32 = 0.2;
pub const RAMP_GROWTH: f32 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApbState {
    Idle,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApbOutcome {
    Caught,
    Evaded,
}

/// Final score of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApbResult {
    pub result: ApbOutcome,
    /// How long the run lasted
    pub duration_seconds: f32,
    pub hits: u32,
    pub hit_coins: u32,
    pub bonus: u32,
    pub evasion: u32,
    pub total: u32,
}

impl ApbResult {
    /// Score a finished run. Caught runs keep only the hit coins.
    pub fn score(result: ApbOutcome, duration_seconds: f32, hits: u32, hit_coins: u32) -> Self {
        let (bonus, evasion) = match result {
            ApbOutcome::Caught => (0, 0),
            ApbOutcome::Evaded => (hits.div_ceil(10) * BONUS_PER_TEN_HITS, EVASION_BONUS),
        };
        Self {
            result,
            duration_seconds,
            hits,
            hit_coins,
            bonus,
            evasion,
            total: hit_coins + bonus + evasion,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ApbError {
    #[error("APB is cooling down")]
    CooldownActive,
    #[error("an APB run is already active")]
    AlreadyActive,
}

/// Host-side wallet and cooldown the run reports to
pub trait ApbEconomy {
    /// False while the cooldown between runs is still running
    fn can_run(&self) -> bool;
    fn duration_seconds(&self) -> f32;
    fn is_subscriber(&self) -> bool;
    /// Coins earned by a single hit, paid out immediately
    fn credit_hit(&mut self, coins: u32);
    /// Pay out the end-of-run bonuses and re-arm the cooldown
    fn settle(&mut self, result: &ApbResult);
}

/// Route the economic events of one tick to `economy`
pub fn apply_events(economy: &mut dyn ApbEconomy, events: &[SimEvent]) {
    for event in events {
        match event {
            SimEvent::HitCredited { coins, .. } => economy.credit_hit(*coins),
            SimEvent::RunResolved(result) => economy.settle(result),
            _ => {}
        }
    }
}

/// What the world has to do after advancing an active run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ApbTick {
    /// Ramp spawns owed this tick
    pub extra_spawns: u32,
    pub resolved: Option<ApbResult>,
}

#[derive(Debug, Clone)]
pub struct ApbRun {
    state: ApbState,
    duration: f32,
    remaining: f32,
    elapsed: f32,
    hits: u32,
    /// Per-hit reward, frozen when the run starts
    hit_reward: u32,
    hit_coins: u32,
    spawn_carry: f32,
    ramp_base: f32,
    ramp_growth: f32,
}

impl Default for ApbRun {
    fn default() -> Self {
        Self::new(RAMP_BASE, RAMP_GROWTH)
    }
}

impl ApbRun {
    pub fn new(ramp_base: f32, ramp_growth: f32) -> Self {
        Self {
            state: ApbState::Idle,
            duration: 0.0,
            remaining: 0.0,
            elapsed: 0.0,
            hits: 0,
            hit_reward: HIT_COINS,
            hit_coins: 0,
            spawn_carry: 0.0,
            ramp_base,
            ramp_growth,
        }
    }

    pub fn state(&self) -> ApbState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ApbState::Active
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn hit_reward(&self) -> u32 {
        self.hit_reward
    }

    pub fn hit_coins(&self) -> u32 {
        self.hit_coins
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn start(&mut self, economy: &dyn ApbEconomy) -> Result<(), ApbError> {
        if self.is_active() {
            return Err(ApbError::AlreadyActive);
        }
        if !economy.can_run() {
            return Err(ApbError::CooldownActive);
        }

        self.duration = economy.duration_seconds().max(0.0);
        self.remaining = self.duration;
        self.elapsed = 0.0;
        self.hits = 0;
        self.hit_coins = 0;
        self.spawn_carry = 0.0;
        self.hit_reward = if economy.is_subscriber() {
            SUBSCRIBER_HIT_COINS
        } else {
            HIT_COINS
        };
        self.state = ApbState::Active;

        info!(
            "APB run started: {:.0}s, {} coins per hit",
            self.duration, self.hit_reward
        );
        Ok(())
    }

    /// Count a hit; returns the coins it earned
    pub fn record_hit(&mut self) -> Option<u32> {
        if !self.is_active() {
            return None;
        }
        self.hits += 1;
        self.hit_coins += self.hit_reward;
        Some(self.hit_reward)
    }

    /// Run the timer and the spawn ramp. The timer running out is the only
    /// way a run is evaded.
    pub fn advance(&mut self, delta: f32) -> ApbTick {
        if !self.is_active() {
            return ApbTick::default();
        }

        self.elapsed += delta;
        self.remaining = (self.remaining - delta).max(0.0);

        self.spawn_carry += (self.ramp_base + self.ramp_growth * self.elapsed) * delta;
        let extra_spawns = self.spawn_carry.floor();
        self.spawn_carry -= extra_spawns;

        let resolved = if self.remaining <= 0.0 {
            Some(self.resolve(ApbOutcome::Evaded))
        } else {
            None
        };

        ApbTick {
            extra_spawns: extra_spawns as u32,
            resolved,
        }
    }

    /// The pursuer reached the player. The only way a run is caught.
    pub fn on_capture(&mut self) -> Option<ApbResult> {
        if !self.is_active() {
            return None;
        }
        Some(self.resolve(ApbOutcome::Caught))
    }

    fn resolve(&mut self, outcome: ApbOutcome) -> ApbResult {
        self.state = ApbState::Idle;
        // Caught runs report how long the player actually lasted
        let lasted = match outcome {
            ApbOutcome::Caught => self.elapsed.min(self.duration),
            ApbOutcome::Evaded => self.duration,
        };
        let result = ApbResult::score(outcome, lasted, self.hits, self.hit_coins);
        info!(
            "APB run {:?}: {} hits, {} coins",
            result.result, result.hits, result.total
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaded_score_rounds_bonus_up() {
        let result = ApbResult::score(ApbOutcome::Evaded, 60.0, 25, 125);
        assert_eq!(result.bonus, 75);
        assert_eq!(result.evasion, 100);
        assert_eq!(result.total, 300);

        let none = ApbResult::score(ApbOutcome::Evaded, 60.0, 0, 0);
        assert_eq!(none.total, EVASION_BONUS);
    }

    #[test]
    fn caught_score_is_hit_coins_only() {
        let result = ApbResult::score(ApbOutcome::Caught, 60.0, 25, 125);
        assert_eq!(result.bonus, 0);
        assert_eq!(result.evasion, 0);
        assert_eq!(result.total, 125);
    }

    #[test]
    fn idle_run_ignores_hits_and_time() {
        let mut run = ApbRun::default();
        assert_eq!(run.record_hit(), None);
        assert_eq!(run.advance(100.0), ApbTick::default());
        assert_eq!(run.on_capture(), None);
    }
}
