//! Events emitted by one simulation tick
//!
//! The world collects these into a list that the host drains after every
//! `tick`; nothing inside the simulation subscribes to them.

use super::apb::ApbResult;
use super::types::{CarId, Position};

/// Why a vehicle was destroyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrashCause {
    /// Closed in on the vehicle ahead
    RearEnd,
    /// A stochastic swerve went wrong
    Chaos,
    /// Drove past the end of a dead-end road
    DeadEnd,
    /// No legal move left
    Boxed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    VehicleSpawned {
        car: CarId,
    },
    /// Vehicle drove off the edge of the grid
    VehicleExited {
        car: CarId,
    },
    Crash {
        car: CarId,
        position: Position,
        cause: CrashCause,
    },
    UTurn {
        car: CarId,
    },
    RoundaboutExit {
        car: CarId,
        laps: u32,
    },
    RunStarted {
        duration_seconds: f32,
        hit_reward: u32,
    },
    /// The player hit a traffic vehicle during an active run
    HitCredited {
        car: CarId,
        coins: u32,
        hits: u32,
    },
    /// The pursuit agent reached the player
    Captured {
        position: Position,
    },
    RunResolved(ApbResult),
}
