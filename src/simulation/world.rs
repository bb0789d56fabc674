//! Main simulation world that ties everything together
//!
//! This is the entry point for running the traffic and pursuit simulation.
//! The world owns every piece of state; one `tick` advances all of it in a
//! fixed order and returns the events it produced.

use anyhow::Result;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::mem;

use super::apb::{ApbEconomy, ApbError, ApbResult, ApbRun};
use super::car::{CarUpdateResult, DespawnReason, SimCar};
use super::car_manager::{self, TrafficClock};
use super::config::SimConfig;
use super::events::SimEvent;
use super::grid::{Layout, SimGrid};
use super::lanes::LaneTable;
use super::persona::Persona;
use super::pursuit::{PursuitAgent, PursuitUpdate};
use super::road_network::SimRoadNetwork;
use super::types::{CarId, CellCoord, Heading, LaneKey, Position, SimId};

/// Distance at which the player's avatar hits a vehicle during a run
pub const HIT_RADIUS: f32 = 20.0;

/// Lower bound on the base spawn interval
const MIN_SPAWN_INTERVAL: f32 = 0.05;

/// The main simulation world
pub struct SimWorld {
    pub grid: SimGrid,

    /// Road graph for pathfinding
    pub road_network: SimRoadNetwork,

    pub lanes: LaneTable,

    /// All vehicles, updated in id order
    pub cars: BTreeMap<CarId, SimCar>,

    pub pursuit: PursuitAgent,

    pub apb: ApbRun,

    pub config: SimConfig,

    /// Simulation time
    pub time: f32,

    spawn_timer: f32,

    /// Events raised between ticks, handed out by the next tick
    pending_events: Vec<SimEvent>,

    /// Next ID to assign
    next_id: usize,

    rng: StdRng,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new(&Layout::default_city(), SimConfig::default())
    }
}

impl SimWorld {
    pub fn new(layout: &Layout, config: SimConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let grid = SimGrid::from_layout(layout);
        let road_network = SimRoadNetwork::from_grid(&grid);
        info!(
            "World loaded: {}x{} grid, {} road cells, {} links",
            grid.width(),
            grid.height(),
            road_network.cell_count(),
            road_network.edge_count()
        );

        let mut pursuit = PursuitAgent::new();
        pursuit.set_speed(config.apb.pursuit_speed_tier);

        Self {
            grid,
            road_network,
            lanes: LaneTable::new(config.lane_min_gap),
            cars: BTreeMap::new(),
            pursuit,
            apb: ApbRun::new(config.apb.ramp_base, config.apb.ramp_growth),
            config,
            time: 0.0,
            spawn_timer: 0.0,
            pending_events: Vec::new(),
            next_id: 0,
            rng,
        }
    }

    /// Create a new SimWorld with a seeded RNG for reproducible simulations
    pub fn new_with_seed(layout: &Layout, seed: u64) -> Self {
        Self::new(
            layout,
            SimConfig {
                seed: Some(seed),
                ..SimConfig::default()
            },
        )
    }

    /// Swap in a new city layout. Traffic is cleared; a running APB keeps
    /// going with the pursuer moved back onto the road.
    pub fn reload_layout(&mut self, layout: &Layout) {
        self.grid = SimGrid::from_layout(layout);
        self.road_network.rebuild(&self.grid);
        self.lanes.clear();
        self.cars.clear();
        self.pursuit.relocate(&self.grid);
        info!(
            "Layout reloaded: {} road cells",
            self.road_network.cell_count()
        );
    }

    fn vehicle_cap(&self) -> usize {
        if self.apb.is_active() {
            self.config.apb.max_vehicles
        } else {
            self.config.max_vehicles
        }
    }

    pub fn is_apb_active(&self) -> bool {
        self.apb.is_active()
    }

    /// Spawn one vehicle on a free entry lane
    pub fn spawn_car(&mut self) -> Option<CarId> {
        let mut events = Vec::new();
        let spawned = self.spawn_into(&mut events);
        self.pending_events.append(&mut events);
        spawned
    }

    /// Place a vehicle at an exact lane position
    pub fn spawn_car_at(
        &mut self,
        cell: CellCoord,
        heading: Heading,
        progress: f32,
        persona: Persona,
    ) -> Result<CarId> {
        let id = CarId(SimId(self.next_id));
        let mut car = car_manager::place_vehicle(
            id,
            LaneKey::new(cell, heading),
            progress,
            persona,
            &self.grid,
            &mut self.lanes,
            self.time,
        )?;
        self.next_id += 1;
        car.apb_flag = self.apb.is_active();
        self.cars.insert(id, car);
        self.pending_events.push(SimEvent::VehicleSpawned { car: id });
        Ok(id)
    }

    fn spawn_into(&mut self, events: &mut Vec<SimEvent>) -> Option<CarId> {
        let id = CarId(SimId(self.next_id));
        let mut car =
            car_manager::spawn_vehicle(id, &self.grid, &mut self.lanes, &mut self.rng, self.time)?;
        self.next_id += 1;
        car.apb_flag = self.apb.is_active();
        self.cars.insert(id, car);
        events.push(SimEvent::VehicleSpawned { car: id });
        Some(id)
    }

    /// Start an APB run against the player at `player`
    pub fn start_apb(&mut self, economy: &dyn ApbEconomy, player: Position) -> Result<(), ApbError> {
        self.apb.start(economy)?;

        self.pursuit.set_speed(self.config.apb.pursuit_speed_tier);
        self.pursuit.spawn(self.time, None, player, &self.grid);
        for car in self.cars.values_mut() {
            car.apb_flag = true;
        }
        self.pending_events.push(SimEvent::RunStarted {
            duration_seconds: self.apb.remaining(),
            hit_reward: self.apb.hit_reward(),
        });
        Ok(())
    }

    fn finish_run(&mut self, result: ApbResult, events: &mut Vec<SimEvent>) {
        self.pursuit.hide();
        for car in self.cars.values_mut() {
            car.apb_flag = false;
        }
        events.push(SimEvent::RunResolved(result));
    }

    /// Advance the simulation by one step and return what happened
    pub fn tick(&mut self, delta_secs: f32, player: Position) -> Vec<SimEvent> {
        let delta = delta_secs.min(self.config.max_tick_delta).max(0.0);
        self.time += delta;
        let mut events = mem::take(&mut self.pending_events);

        // Base traffic
        let interval = self.config.spawn_interval.max(MIN_SPAWN_INTERVAL);
        self.spawn_timer += delta;
        while self.spawn_timer >= interval {
            self.spawn_timer -= interval;
            if self.cars.len() < self.vehicle_cap() {
                self.spawn_into(&mut events);
            }
        }

        self.update_cars(delta, &mut events);

        if self.apb.is_active() {
            self.check_player_hits(player, &mut events);
        }

        if self.pursuit.update(self.time, delta, player, &self.grid, &mut self.road_network)
            == PursuitUpdate::Captured
        {
            if let Some(result) = self.apb.on_capture() {
                events.push(SimEvent::Captured { position: player });
                self.finish_run(result, &mut events);
            }
        }

        let apb_tick = self.apb.advance(delta);
        for _ in 0..apb_tick.extra_spawns {
            if self.cars.len() < self.config.apb.max_vehicles {
                self.spawn_into(&mut events);
            }
        }
        if let Some(result) = apb_tick.resolved {
            self.finish_run(result, &mut events);
        }

        self.lanes.prune(self.time);
        events
    }

    fn update_cars(&mut self, delta: f32, events: &mut Vec<SimEvent>) {
        let clock = TrafficClock {
            now: self.time,
            delta,
            chaos_intensity: if self.apb.is_active() {
                self.config.apb.chaos_multiplier
            } else {
                1.0
            },
        };
        let results = car_manager::update_cars(
            clock,
            &mut self.cars,
            &self.grid,
            &mut self.lanes,
            &mut self.rng,
            events,
        );

        for (car_id, result) in results {
            let CarUpdateResult::Despawn(reason) = result else {
                continue;
            };
            let Some(car) = car_manager::despawn_car(car_id, &mut self.cars, &mut self.lanes, self.time)
            else {
                continue;
            };
            match reason {
                DespawnReason::ExitedWorld => events.push(SimEvent::VehicleExited { car: car_id }),
                DespawnReason::Crashed(cause) => {
                    debug!("Car {:?} crashed ({:?}) at {:?}", car_id.0, cause, car.lane.cell);
                    events.push(SimEvent::Crash {
                        car: car_id,
                        position: car.position,
                        cause,
                    });
                }
            }
        }
    }

    fn check_player_hits(&mut self, player: Position, events: &mut Vec<SimEvent>) {
        let hit: Vec<CarId> = self
            .cars
            .values()
            .filter(|car| car.position.distance(&player) < HIT_RADIUS)
            .map(|car| car.id)
            .collect();

        for car_id in hit {
            let Some(coins) = self.apb.record_hit() else {
                break;
            };
            car_manager::despawn_car(car_id, &mut self.cars, &mut self.lanes, self.time);
            events.push(SimEvent::HitCredited {
                car: car_id,
                coins,
                hits: self.apb.hits(),
            });
        }
    }

    pub fn print_summary(&self) {
        println!("=== Traffic Simulation Summary ===");
        println!("Time: {:.2}s", self.time);
        println!(
            "Grid: {}x{}, Road cells: {}, Links: {}",
            self.grid.width(),
            self.grid.height(),
            self.road_network.cell_count(),
            self.road_network.edge_count()
        );
        println!("Cars: {}", self.cars.len());
        println!();

        if !self.cars.is_empty() {
            println!("--- Active Cars ---");
            for car in self.cars.values() {
                println!(
                    "  Car {:?}: {:?} at {:?} heading {:?}{}",
                    car.id.0,
                    car.persona,
                    car.lane.cell,
                    car.heading,
                    if car.is_turning() { " (turning)" } else { "" }
                );
            }
            println!();
        }

        println!("--- APB ---");
        if self.apb.is_active() {
            println!(
                "  Active: {:.1}s left, hits={}, coins={}",
                self.apb.remaining(),
                self.apb.hits(),
                self.apb.hit_coins()
            );
            println!(
                "  Pursuer at ({:.0}, {:.0}), {:?} mode, {} plans",
                self.pursuit.position.x,
                self.pursuit.position.y,
                self.pursuit.mode(),
                self.pursuit.plans()
            );
        } else {
            println!("  Idle");
        }
    }

    /// Print the grid with vehicles, the player and the pursuer on top
    pub fn draw_map(&self, player: Option<Position>) {
        let mut rows = self.grid.render_rows();

        let mut plot = |position: Position, glyph: char| {
            let cell = self.grid.cell_of(position);
            if self.grid.in_bounds(cell) {
                rows[cell.y as usize][cell.x as usize] = glyph;
            }
        };

        for car in self.cars.values() {
            plot(car.position, if car.apb_flag { '!' } else { 'c' });
        }
        if let Some(player) = player {
            plot(player, '@');
        }
        if self.pursuit.is_visible() {
            plot(self.pursuit.position, 'P');
        }

        println!("\n=== World Map ===");
        println!("Legend: ·=Road, ==Avenue, O=Roundabout, S=Start, h/H=House/Home, $=Shop, \"=Park, #=HQ, c=Car, !=Flagged car, @=Player, P=Pursuer");
        println!();
        for row in &rows {
            let line: String = row.iter().collect();
            println!("{}", line);
        }
        println!();
    }
}
