//! Car spawning and management for the traffic simulation
//!
//! This module contains functions for spawning, despawning, and updating vehicles,
//! including car following and rear-end crashes between vehicles in the same lane.
//! It separates car management logic from the main world coordination.

use anyhow::{bail, Result};
use log::debug;
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::car::{CarContext, CarUpdateResult, DespawnReason, SimCar};
use super::events::{CrashCause, SimEvent};
use super::grid::SimGrid;
use super::lanes::LaneTable;
use super::persona::Persona;
use super::types::{CarId, LaneKey, CELL_SIZE};

/// Cells past the current one that are scanned for a car ahead
pub const FOLLOW_SCAN_CELLS: usize = 2;

/// Lane progress at which spawned vehicles appear
pub const SPAWN_PROGRESS: f32 = 0.05;

/// Time and hazard settings for one traffic update
#[derive(Debug, Clone, Copy)]
pub struct TrafficClock {
    pub now: f32,
    pub delta: f32,
    pub chaos_intensity: f32,
}

/// Snapshot of lane occupants, ordered by distance along each lane.
/// Turning cars belong to no lane until they finish the maneuver.
#[derive(Debug, Default)]
pub struct LaneOccupancy {
    lanes: HashMap<LaneKey, BTreeSet<(OrderedFloat<f32>, CarId)>>,
}

impl LaneOccupancy {
    pub fn build(cars: &BTreeMap<CarId, SimCar>, grid: &SimGrid) -> Self {
        let mut occupancy = Self::default();
        for car in cars.values().filter(|car| !car.is_turning()) {
            occupancy
                .lanes
                .entry(car.lane)
                .or_default()
                .insert((OrderedFloat(car.lane_distance(grid)), car.id));
        }
        occupancy
    }

    /// Nearest car ahead of `car` in its lane and the gap to it
    pub fn find_car_ahead(
        &self,
        car: &SimCar,
        grid: &SimGrid,
        skip: &HashSet<CarId>,
    ) -> Option<(CarId, f32)> {
        let own = car.lane_distance(grid);
        let mut lane = car.lane;

        for step in 0..=FOLLOW_SCAN_CELLS {
            if let Some(occupants) = self.lanes.get(&lane) {
                let ahead = occupants.iter().find(|(distance, id)| {
                    *id != car.id
                        && !skip.contains(id)
                        && (step > 0 || distance.0 > own || (distance.0 == own && *id > car.id))
                });
                if let Some((distance, id)) = ahead {
                    let gap = step as f32 * CELL_SIZE + distance.0 - own;
                    return Some((*id, gap.max(0.0)));
                }
            }
            lane = lane.next();
        }

        None
    }

    pub fn occupants(&self, lane: LaneKey) -> usize {
        self.lanes.get(&lane).map(|cars| cars.len()).unwrap_or(0)
    }
}

/// Spawn a vehicle on a random entry lane that passes the gate
///
/// Entry lanes are border cells heading inward; layouts without any fall
/// back to interior lanes. Returns `None` when every candidate lane is busy.
pub fn spawn_vehicle(
    car_id: CarId,
    grid: &SimGrid,
    lanes: &mut LaneTable,
    rng: &mut StdRng,
    now: f32,
) -> Option<SimCar> {
    let mut candidates = grid.entry_points();
    if candidates.is_empty() {
        candidates = grid.interior_lanes();
    }
    candidates.retain(|lane| lanes.is_clear(*lane, now));

    let lane = *candidates.choose(rng)?;
    lanes.mark_pass(lane, now);
    let persona = Persona::draw(rng);
    debug!("Spawned car {:?} ({:?}) at {:?}", car_id.0, persona, lane);
    Some(SimCar::new(car_id, persona, lane, SPAWN_PROGRESS, grid))
}

/// Place a vehicle at an exact lane position, bypassing the spawn gate
pub fn place_vehicle(
    car_id: CarId,
    lane: LaneKey,
    progress: f32,
    persona: Persona,
    grid: &SimGrid,
    lanes: &mut LaneTable,
    now: f32,
) -> Result<SimCar> {
    if !grid.is_driveable(lane.cell) {
        bail!("Cell {:?} is not driveable", lane.cell);
    }
    if !(0.0..1.0).contains(&progress) {
        bail!("Lane progress {} is outside the cell", progress);
    }
    lanes.mark_pass(lane, now);
    Ok(SimCar::new(car_id, persona, lane, progress, grid))
}

/// Remove a car and release any lane it had reserved for a turn
pub fn despawn_car(
    car_id: CarId,
    cars: &mut BTreeMap<CarId, SimCar>,
    lanes: &mut LaneTable,
    now: f32,
) -> Option<SimCar> {
    let car = cars.remove(&car_id)?;
    if let Some(turn) = car.turn {
        lanes.release(turn.target, car_id, now);
    }
    Some(car)
}

/// Update all cars in the simulation
///
/// Cars are updated in id order. Cars that must leave the simulation stay in
/// the map; returns a list of (car_id, result) tuples for them so the world
/// can read their info before despawning.
pub fn update_cars(
    clock: TrafficClock,
    cars: &mut BTreeMap<CarId, SimCar>,
    grid: &SimGrid,
    lanes: &mut LaneTable,
    rng: &mut StdRng,
    events: &mut Vec<SimEvent>,
) -> Vec<(CarId, CarUpdateResult)> {
    let occupancy = LaneOccupancy::build(cars, grid);
    let mut gone: HashSet<CarId> = HashSet::new();
    let mut results = Vec::new();

    // Collect car IDs to avoid borrow issues
    let car_ids: Vec<CarId> = cars.keys().copied().collect();

    for car_id in car_ids {
        if gone.contains(&car_id) {
            continue;
        }
        let Some(mut car) = cars.remove(&car_id) else {
            continue;
        };

        let ahead = if car.is_turning() {
            None
        } else {
            occupancy.find_car_ahead(&car, grid, &gone)
        };

        if let Some((other, gap)) = ahead {
            if gap < car.profile().rear_end_distance() {
                let chance = 1.0 - (-car.profile().rear_end_rate * clock.delta).exp();
                if rng.random::<f32>() < chance {
                    debug!("Car {:?} rear-ended car {:?}", car_id.0, other.0);
                    cars.insert(car_id, car);
                    let crash = CarUpdateResult::Despawn(DespawnReason::Crashed(CrashCause::RearEnd));
                    for id in [car_id, other] {
                        gone.insert(id);
                        results.push((id, crash));
                    }
                    continue;
                }
            }
        }

        let mut ctx = CarContext {
            grid,
            lanes: &mut *lanes,
            rng: &mut *rng,
            events: &mut *events,
            now: clock.now,
            delta: clock.delta,
            chaos_intensity: clock.chaos_intensity,
            ahead_gap: ahead.map(|(_, gap)| gap),
        };
        let result = car.update(&mut ctx);
        cars.insert(car_id, car);

        if let CarUpdateResult::Despawn(_) = result {
            gone.insert(car_id);
            results.push((car_id, result));
        }
    }

    results
}
