//! Driver personas
//!
//! A persona is drawn once per vehicle at spawn time and fixes how fast and
//! how recklessly that vehicle drives.

use rand::seq::IndexedRandom;
use rand::Rng;

/// Slack past a driver's own following distance inside which it may
/// rear-end the car ahead
pub const REAR_END_MARGIN: f32 = 4.0;

/// Behavior profile shared by every vehicle of a persona
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersonaProfile {
    /// Multiplier on the base cruising speed
    pub speed_multiplier: f32,
    /// Probability of ignoring a failed lane gate
    pub yield_ignore_chance: f32,
    /// Minimum seconds between two U-turns
    pub uturn_cooldown: f32,
    /// Probability that a chaos swerve ends in a crash
    pub chaos_crash_bias: f32,
    /// Distance kept to the vehicle ahead, in world units
    pub follow_gap: f32,
    /// Rear-end hazard rate (per second) while inside `rear_end_distance`
    pub rear_end_rate: f32,
    /// Relative weight when drawing a persona at spawn time
    pub spawn_weight: u32,
}

static AGGRESSIVE: PersonaProfile = PersonaProfile {
    speed_multiplier: 1.35,
    yield_ignore_chance: 0.18,
    uturn_cooldown: 3.0,
    chaos_crash_bias: 0.35,
    follow_gap: 9.0,
    rear_end_rate: 0.3,
    spawn_weight: 15,
};

static FAST: PersonaProfile = PersonaProfile {
    speed_multiplier: 1.2,
    yield_ignore_chance: 0.08,
    uturn_cooldown: 4.0,
    chaos_crash_bias: 0.2,
    follow_gap: 16.0,
    rear_end_rate: 0.15,
    spawn_weight: 25,
};

static NEUTRAL: PersonaProfile = PersonaProfile {
    speed_multiplier: 1.0,
    yield_ignore_chance: 0.03,
    uturn_cooldown: 5.0,
    chaos_crash_bias: 0.1,
    follow_gap: 22.0,
    rear_end_rate: 0.06,
    spawn_weight: 45,
};

static SLOW: PersonaProfile = PersonaProfile {
    speed_multiplier: 0.8,
    yield_ignore_chance: 0.01,
    uturn_cooldown: 6.0,
    chaos_crash_bias: 0.05,
    follow_gap: 28.0,
    rear_end_rate: 0.02,
    spawn_weight: 15,
};

impl PersonaProfile {
    /// Gap to the car ahead below which a rear-end can happen. Covers a car
    /// holding its own following distance.
    pub fn rear_end_distance(&self) -> f32 {
        self.follow_gap + REAR_END_MARGIN
    }
}

/// Named driver persona
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Persona {
    Aggressive,
    Fast,
    Neutral,
    Slow,
}

impl Persona {
    pub const ALL: [Persona; 4] = [
        Persona::Aggressive,
        Persona::Fast,
        Persona::Neutral,
        Persona::Slow,
    ];

    pub fn profile(self) -> &'static PersonaProfile {
        match self {
            Persona::Aggressive => &AGGRESSIVE,
            Persona::Fast => &FAST,
            Persona::Neutral => &NEUTRAL,
            Persona::Slow => &SLOW,
        }
    }

    /// Weighted draw; neutral drivers are the most common
    pub fn draw<R: Rng>(rng: &mut R) -> Persona {
        Persona::ALL
            .choose_weighted(rng, |p| p.profile().spawn_weight)
            .copied()
            .unwrap_or(Persona::Neutral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn neutral_is_the_most_common_draw() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts: HashMap<Persona, u32> = HashMap::new();
        for _ in 0..4000 {
            *counts.entry(Persona::draw(&mut rng)).or_default() += 1;
        }

        let neutral = counts[&Persona::Neutral];
        for persona in [Persona::Aggressive, Persona::Fast, Persona::Slow] {
            assert!(counts[&persona] > 0);
            assert!(neutral > counts[&persona]);
        }
    }

    #[test]
    fn aggressive_drivers_are_the_most_reckless() {
        let aggressive = Persona::Aggressive.profile();
        for persona in [Persona::Fast, Persona::Neutral, Persona::Slow] {
            let other = persona.profile();
            assert!(aggressive.yield_ignore_chance > other.yield_ignore_chance);
            assert!(aggressive.follow_gap < other.follow_gap);
            assert!(aggressive.rear_end_rate > other.rear_end_rate);
        }
    }
}
