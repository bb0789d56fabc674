//! Lane reservation table
//!
//! Every moving agent passes a two-part gate before entering a lane: the
//! spacing check (time since the last pass-through) and the reservation
//! check (no other agent mid-turn into the lane). The table is owned by the
//! simulation instance and only touched inside the per-tick update.

use rand::Rng;
use std::collections::HashMap;

use super::types::{CarId, LaneKey};

/// Default minimum time between two entries into the same lane
pub const MIN_LANE_GAP: f32 = 0.6;

/// Time a destination lane stays reserved while a turn is in flight
pub const TURN_RESERVATION_SECS: f32 = 1.2;

/// Result of running the lane gate for one agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Both checks passed
    Clear,
    /// A check failed but the agent ignored it
    Forced,
    /// A check failed; the agent must wait
    Blocked,
}

impl GateOutcome {
    pub fn admits(self) -> bool {
        !matches!(self, GateOutcome::Blocked)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct LaneSlot {
    last_pass: Option<f32>,
    reserved_until: f32,
    reserved_by: Option<CarId>,
}

/// Per-lane pass timestamps and reservations
#[derive(Debug, Clone)]
pub struct LaneTable {
    slots: HashMap<LaneKey, LaneSlot>,
    min_gap: f32,
}

impl Default for LaneTable {
    fn default() -> Self {
        Self::new(MIN_LANE_GAP)
    }
}

impl LaneTable {
    pub fn new(min_gap: f32) -> Self {
        Self {
            slots: HashMap::new(),
            min_gap,
        }
    }

    pub fn min_gap(&self) -> f32 {
        self.min_gap
    }

    /// Spacing and reservation checks, without side effects
    pub fn is_clear(&self, lane: LaneKey, now: f32) -> bool {
        match self.slots.get(&lane) {
            None => true,
            Some(slot) => {
                let spaced = slot
                    .last_pass
                    .map_or(true, |last| now - last >= self.min_gap);
                spaced && now >= slot.reserved_until
            }
        }
    }

    /// Run the gate for an agent that ignores a failed check with
    /// probability `ignore_chance`. Nothing is recorded.
    pub fn check<R: Rng>(
        &self,
        lane: LaneKey,
        now: f32,
        ignore_chance: f32,
        rng: &mut R,
    ) -> GateOutcome {
        if self.is_clear(lane, now) {
            GateOutcome::Clear
        } else if ignore_chance > 0.0 && rng.random::<f32>() < ignore_chance {
            GateOutcome::Forced
        } else {
            GateOutcome::Blocked
        }
    }

    /// Run the gate and, when admitted, record the pass-through
    pub fn try_enter<R: Rng>(
        &mut self,
        lane: LaneKey,
        now: f32,
        ignore_chance: f32,
        rng: &mut R,
    ) -> GateOutcome {
        let outcome = self.check(lane, now, ignore_chance, rng);
        if outcome.admits() {
            self.mark_pass(lane, now);
        }
        outcome
    }

    pub fn mark_pass(&mut self, lane: LaneKey, now: f32) {
        self.slots.entry(lane).or_default().last_pass = Some(now);
    }

    /// Claim `lane` for `car` until `until`
    pub fn reserve(&mut self, lane: LaneKey, car: CarId, until: f32) {
        let slot = self.slots.entry(lane).or_default();
        slot.reserved_until = slot.reserved_until.max(until);
        slot.reserved_by = Some(car);
    }

    /// Release a reservation held by `car`
    pub fn release(&mut self, lane: LaneKey, car: CarId, now: f32) {
        if let Some(slot) = self.slots.get_mut(&lane) {
            if slot.reserved_by == Some(car) {
                slot.reserved_until = slot.reserved_until.min(now);
                slot.reserved_by = None;
            }
        }
    }

    pub fn last_pass(&self, lane: LaneKey) -> Option<f32> {
        self.slots.get(&lane).and_then(|slot| slot.last_pass)
    }

    pub fn reserved_until(&self, lane: LaneKey) -> f32 {
        self.slots
            .get(&lane)
            .map(|slot| slot.reserved_until)
            .unwrap_or(0.0)
    }

    /// Drop lanes whose pass and reservation are both long expired
    pub fn prune(&mut self, now: f32) {
        let horizon = self.min_gap.max(TURN_RESERVATION_SECS) * 4.0;
        self.slots.retain(|_, slot| {
            let recent_pass = slot.last_pass.is_some_and(|last| now - last < horizon);
            recent_pass || slot.reserved_until > now
        });
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::types::{CellCoord, Heading, SimId};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn lane() -> LaneKey {
        LaneKey::new(CellCoord::new(2, 3), Heading::East)
    }

    #[test]
    fn spacing_gap_is_enforced_for_careful_agents() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut table = LaneTable::new(0.6);
        let mut entries = Vec::new();

        let mut now = 0.0;
        while now < 10.0 {
            if table.try_enter(lane(), now, 0.0, &mut rng).admits() {
                entries.push(now);
            }
            now += 0.05;
        }

        assert!(entries.len() > 5);
        for pair in entries.windows(2) {
            assert!(pair[1] - pair[0] >= 0.6 - 1e-4, "entries {:?}", pair);
        }
    }

    #[test]
    fn reservation_blocks_until_expiry_or_release() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut table = LaneTable::default();
        let car = CarId(SimId(7));
        let other = CarId(SimId(8));

        table.reserve(lane(), car, 2.0);
        assert_eq!(table.check(lane(), 1.0, 0.0, &mut rng), GateOutcome::Blocked);

        // Only the holder can release
        table.release(lane(), other, 1.0);
        assert!(!table.is_clear(lane(), 1.5));

        table.release(lane(), car, 1.5);
        assert!(table.is_clear(lane(), 1.5));
    }

    #[test]
    fn reckless_agents_force_their_way_in() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut table = LaneTable::default();
        table.mark_pass(lane(), 0.0);

        assert_eq!(table.try_enter(lane(), 0.1, 1.0, &mut rng), GateOutcome::Forced);
        assert_eq!(table.last_pass(lane()), Some(0.1));
    }

    #[test]
    fn prune_keeps_recent_lanes() {
        let mut table = LaneTable::default();
        table.mark_pass(lane(), 0.0);
        table.mark_pass(lane().next(), 9.5);
        table.prune(10.0);
        assert_eq!(table.len(), 1);
        assert!(table.last_pass(lane()).is_none());
    }
}
