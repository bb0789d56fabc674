//! Standalone traffic and pursuit simulation module
//!
//! This module contains all the simulation logic: the city grid and its road
//! graph, autonomous traffic, the pursuit agent and the APB run. It has no
//! rendering or input dependencies and can be driven from tests or the
//! console runner.

mod apb;
mod car;
mod car_manager;
mod config;
mod curve;
mod events;
mod game_state;
mod grid;
mod lanes;
mod persona;
mod pursuit;
mod road_network;
mod stats;
mod types;
mod world;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use apb::{
    apply_events, ApbEconomy, ApbError, ApbOutcome, ApbResult, ApbRun, ApbState, ApbTick,
    BONUS_PER_TEN_HITS, EVASION_BONUS, HIT_COINS, SUBSCRIBER_HIT_COINS,
};
#[allow(unused_imports)]
pub use car::{
    is_boxed, is_cul_de_sac, CarUpdateResult, DespawnReason, SimCar, Turn, TurnKind,
    ARCS_PER_LAP, BASE_CAR_SPEED, ROUNDABOUT_MAX_LAPS, ROUNDABOUT_MIN_LAPS, UTURN_MIN_PROGRESS,
};
#[allow(unused_imports)]
pub use car_manager::LaneOccupancy;
#[allow(unused_imports)]
pub use config::{ApbConfig, SimConfig};
#[allow(unused_imports)]
pub use curve::QuadCurve;
#[allow(unused_imports)]
pub use events::{CrashCause, SimEvent};
#[allow(unused_imports)]
pub use game_state::{GameState, APB_COOLDOWN_SECS, APB_RUN_SECS};
#[allow(unused_imports)]
pub use grid::{BuildingKind, CellClass, Layout, SimGrid};
#[allow(unused_imports)]
pub use lanes::{GateOutcome, LaneTable, MIN_LANE_GAP, TURN_RESERVATION_SECS};
#[allow(unused_imports)]
pub use persona::{Persona, PersonaProfile, REAR_END_MARGIN};
#[allow(unused_imports)]
pub use pursuit::{ChaseMode, PursuitAgent, PursuitUpdate, CATCH_DISTANCE, RETARGET_DISTANCE};
#[allow(unused_imports)]
pub use road_network::{SimRoadNetwork, PATH_EXPANSION_BUDGET};
#[allow(unused_imports)]
pub use stats::SimulationStats;
#[allow(unused_imports)]
pub use types::{CarId, CellCoord, Heading, LaneKey, Position, SimId, CELL_SIZE, LANE_OFFSET};
pub use world::{SimWorld, HIT_RADIUS};
