//! Vehicle behavior for the traffic simulation
//!
//! Each `SimCar` is a small state machine evaluated once per tick: an
//! in-flight turn, a yield pause, roundabout circulation, a turn decision
//! inside the cell, or straight motion along the lane centerline.

use log::debug;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::curve::QuadCurve;
use super::events::{CrashCause, SimEvent};
use super::grid::{CellClass, SimGrid};
use super::lanes::{LaneTable, TURN_RESERVATION_SECS};
use super::persona::{Persona, PersonaProfile};
use super::types::{CarId, CellCoord, Heading, LaneKey, Position, CELL_SIZE};

/// Cruising speed of a neutral driver, world units per second
pub const BASE_CAR_SPEED: f32 = 72.0;

/// In-cell progress window in which turns are evaluated
pub const TURN_WINDOW_START: f32 = 0.2;
pub const TURN_WINDOW_END: f32 = 0.92;

/// Minimum in-cell progress before a U-turn may start
pub const UTURN_MIN_PROGRESS: f32 = 0.45;

/// How long a car waits after a failed lane gate before trying again
pub const YIELD_PAUSE_SECS: f32 = 0.25;

/// Base hazard rate (per second) of a chaos swerve
pub const CHAOS_RATE: f32 = 0.04;

/// Progress into a roundabout cell at which circulation decisions start
pub const ROUNDABOUT_DECISION_PROGRESS: f32 = 0.3;

/// Full circuits before a car may leave a roundabout, and the most it will
/// ever drive
pub const ROUNDABOUT_MIN_LAPS: u32 = 1;
pub const ROUNDABOUT_MAX_LAPS: u32 = 3;

/// Quarter arcs in one full circuit of a roundabout
pub const ARCS_PER_LAP: u32 = 4;

/// Circulation side for right-hand traffic
const CIRCULATION: TurnKind = TurnKind::Left;

/// Where a left or right turn lands inside the destination cell
const TURN_ENTRY_PROGRESS: f32 = 0.1;

const BOUNDARY_EPSILON: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Left,
    Right,
    UTurn,
    /// One quarter arc around a roundabout island
    Circulate,
}

/// An in-flight turning maneuver
#[derive(Debug, Clone, Copy)]
pub struct Turn {
    pub kind: TurnKind,
    pub curve: QuadCurve,
    pub length: f32,
    pub progress: f32,
    /// Lane the car ends up in; reserved while the turn is in flight
    pub target: LaneKey,
}

/// A chaos swerve decided for one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChaosHold {
    pub cell: CellCoord,
    pub kind: TurnKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DespawnReason {
    ExitedWorld,
    Crashed(CrashCause),
}

/// Result of a car update indicating what action should be taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarUpdateResult {
    Continue,
    Despawn(DespawnReason),
}

/// Shared simulation state a car reads and writes during its update
pub struct CarContext<'a> {
    pub grid: &'a SimGrid,
    pub lanes: &'a mut LaneTable,
    pub rng: &'a mut StdRng,
    pub events: &'a mut Vec<SimEvent>,
    pub now: f32,
    pub delta: f32,
    /// Chaos hazard multiplier; raised while an APB run is active
    pub chaos_intensity: f32,
    /// Distance to the nearest car ahead in the same lane
    pub ahead_gap: Option<f32>,
}

/// An autonomous vehicle
#[derive(Debug, Clone)]
pub struct SimCar {
    pub id: CarId,
    pub persona: Persona,
    pub position: Position,
    pub heading: Heading,
    /// Lane the car currently occupies
    pub lane: LaneKey,
    pub turn: Option<Turn>,
    /// Quarter arcs driven in the current roundabout
    pub roundabout_arcs: u32,
    pub last_uturn_at: Option<f32>,
    pub chaos_hold: Option<ChaosHold>,
    pub yield_until: f32,
    pub exiting_roundabout: bool,
    /// Set while an APB run is active so the host can tint the car
    pub apb_flag: bool,
}

impl SimCar {
    pub fn new(id: CarId, persona: Persona, lane: LaneKey, progress: f32, grid: &SimGrid) -> Self {
        Self {
            id,
            persona,
            position: grid.lane_point(lane.cell, lane.heading, progress),
            heading: lane.heading,
            lane,
            turn: None,
            roundabout_arcs: 0,
            last_uturn_at: None,
            chaos_hold: None,
            yield_until: 0.0,
            exiting_roundabout: false,
            apb_flag: false,
        }
    }

    pub fn profile(&self) -> &'static PersonaProfile {
        self.persona.profile()
    }

    pub fn speed(&self) -> f32 {
        BASE_CAR_SPEED * self.profile().speed_multiplier
    }

    /// Completed full circuits of the current roundabout
    pub fn roundabout_laps(&self) -> u32 {
        self.roundabout_arcs / ARCS_PER_LAP
    }

    pub fn is_turning(&self) -> bool {
        self.turn.is_some()
    }

    /// How far through its current cell the car is
    pub fn progress(&self, grid: &SimGrid) -> f32 {
        grid.progress_in_cell(self.position, self.lane.cell, self.heading)
    }

    /// Distance travelled along the current lane
    pub fn lane_distance(&self, grid: &SimGrid) -> f32 {
        self.progress(grid) * CELL_SIZE
    }

    /// Update car movement logic
    /// Returns CarUpdateResult indicating what action should be taken with the car
    pub fn update(&mut self, ctx: &mut CarContext<'_>) -> CarUpdateResult {
        if self.turn.is_some() {
            self.advance_turn(ctx);
            return CarUpdateResult::Continue;
        }

        if ctx.now < self.yield_until {
            return CarUpdateResult::Continue;
        }

        let grid = ctx.grid;
        if is_boxed(grid, self.lane.cell, self.heading) {
            return CarUpdateResult::Despawn(DespawnReason::Crashed(CrashCause::Boxed));
        }

        let progress = self.progress(grid);
        if grid.cell_class(self.lane.cell) == CellClass::Roundabout {
            return self.update_roundabout(ctx, progress);
        }

        if (TURN_WINDOW_START..=TURN_WINDOW_END).contains(&progress) {
            if let Some(result) = self.consider_turn(ctx, progress) {
                return result;
            }
        }

        self.advance_straight(ctx)
    }

    fn turn_heading(&self, kind: TurnKind) -> Heading {
        match kind {
            TurnKind::Left => self.heading.left(),
            TurnKind::Right => self.heading.right(),
            TurnKind::UTurn => self.heading.reverse(),
            TurnKind::Circulate => match CIRCULATION {
                TurnKind::Right => self.heading.right(),
                _ => self.heading.left(),
            },
        }
    }

    fn uturn_ready(&self, now: f32) -> bool {
        self.last_uturn_at
            .map_or(true, |at| now - at >= self.profile().uturn_cooldown)
    }

    /// Turn decisions inside a non-roundabout cell. `None` means keep
    /// driving straight.
    fn consider_turn(&mut self, ctx: &mut CarContext<'_>, progress: f32) -> Option<CarUpdateResult> {
        let grid = ctx.grid;
        let cell = self.lane.cell;
        let forward = cell.step(self.heading);
        let forward_open = !grid.in_bounds(forward) || grid.is_driveable(forward);

        let sides: Vec<TurnKind> = [TurnKind::Right, TurnKind::Left]
            .into_iter()
            .filter(|kind| grid.is_driveable(cell.step(self.turn_heading(*kind))))
            .collect();

        if !forward_open {
            if !sides.is_empty() {
                let mut order = sides;
                if order.len() == 2 && ctx.rng.random_bool(0.5) {
                    order.swap(0, 1);
                }
                for kind in order {
                    if self.start_turn(kind, ctx) {
                        return Some(CarUpdateResult::Continue);
                    }
                }
                self.yield_until = ctx.now + YIELD_PAUSE_SECS;
                return Some(CarUpdateResult::Continue);
            }

            if progress >= UTURN_MIN_PROGRESS
                && self.uturn_ready(ctx.now)
                && is_cul_de_sac(grid, cell, self.heading)
            {
                if self.start_turn(TurnKind::UTurn, ctx) {
                    debug!("Car {:?} U-turns at {:?}", self.id.0, cell);
                    ctx.events.push(SimEvent::UTurn { car: self.id });
                } else {
                    self.yield_until = ctx.now + YIELD_PAUSE_SECS;
                }
                return Some(CarUpdateResult::Continue);
            }

            return None;
        }

        if sides.is_empty() {
            return None;
        }

        if let Some(hold) = self.chaos_hold.filter(|hold| hold.cell == cell) {
            // The swerve stays decided for this cell; retry it until the gate opens
            if self.start_turn(hold.kind, ctx) {
                return Some(CarUpdateResult::Continue);
            }
            return None;
        }

        let chance = 1.0 - (-CHAOS_RATE * ctx.chaos_intensity * ctx.delta).exp();
        if ctx.rng.random::<f32>() >= chance {
            return None;
        }

        if ctx.rng.random::<f32>() < self.profile().chaos_crash_bias {
            return Some(CarUpdateResult::Despawn(DespawnReason::Crashed(
                CrashCause::Chaos,
            )));
        }

        let kind = *sides.choose(&mut *ctx.rng)?;
        self.chaos_hold = Some(ChaosHold { cell, kind });
        if self.start_turn(kind, ctx) {
            return Some(CarUpdateResult::Continue);
        }
        None
    }

    fn update_roundabout(&mut self, ctx: &mut CarContext<'_>, progress: f32) -> CarUpdateResult {
        if self.exiting_roundabout || progress < ROUNDABOUT_DECISION_PROGRESS {
            return self.advance_straight(ctx);
        }

        let grid = ctx.grid;
        let forward = self.lane.cell.step(self.heading);
        let exit_in_grid = grid.in_bounds(forward);
        let exit_open = !exit_in_grid || grid.is_driveable(forward);

        let laps = self.roundabout_laps();
        if laps >= ROUNDABOUT_MAX_LAPS {
            if exit_open {
                // Must leave now; the lane gate at the boundary decides when
                self.exiting_roundabout = true;
                return self.advance_straight(ctx);
            }
            // One more arc would start a lap past the limit
            if (self.roundabout_arcs + 1) / ARCS_PER_LAP > ROUNDABOUT_MAX_LAPS {
                return CarUpdateResult::Despawn(DespawnReason::Crashed(CrashCause::Boxed));
            }
        } else {
            let exit_clear = !exit_in_grid
                || ctx
                    .lanes
                    .is_clear(LaneKey::new(forward, self.heading), ctx.now);
            if laps >= ROUNDABOUT_MIN_LAPS && exit_open && exit_clear {
                self.exiting_roundabout = true;
                return self.advance_straight(ctx);
            }
        }

        if !self.start_turn(TurnKind::Circulate, ctx) {
            self.yield_until = ctx.now + YIELD_PAUSE_SECS;
        }
        CarUpdateResult::Continue
    }

    /// Reserve the destination lane and start the maneuver. Returns false
    /// when the lane gate turned the car away.
    fn start_turn(&mut self, kind: TurnKind, ctx: &mut CarContext<'_>) -> bool {
        let (target, curve) = self.plan_turn(kind, ctx.grid);
        let outcome = ctx.lanes.check(
            target,
            ctx.now,
            self.profile().yield_ignore_chance,
            &mut *ctx.rng,
        );
        if !outcome.admits() {
            return false;
        }

        ctx.lanes
            .reserve(target, self.id, ctx.now + TURN_RESERVATION_SECS);
        self.turn = Some(Turn {
            kind,
            curve,
            length: curve.length().max(1.0),
            progress: 0.0,
            target,
        });
        true
    }

    fn plan_turn(&self, kind: TurnKind, grid: &SimGrid) -> (LaneKey, QuadCurve) {
        let cell = self.lane.cell;
        let to = self.turn_heading(kind);
        let start = self.position;
        let progress = grid.progress_in_cell(start, cell, self.heading);

        match kind {
            TurnKind::Left | TurnKind::Right => {
                let dest = cell.step(to);
                let end = grid.lane_point(dest, to, TURN_ENTRY_PROGRESS);
                let corner = lane_corner(grid, cell, self.heading, to);
                let control = if grid.progress_in_cell(corner, cell, self.heading) > progress + 0.05 {
                    corner
                } else {
                    start.lerp(&end, 0.5).lerp(&grid.cell_center(cell), 0.5)
                };
                (LaneKey::new(dest, to), QuadCurve::new(start, control, end))
            }
            TurnKind::UTurn => {
                let ahead = (progress + 0.3).min(0.98);
                let control = grid
                    .lane_point(cell, self.heading, ahead)
                    .lerp(&grid.lane_point(cell, to, 1.0 - ahead), 0.5);
                let end = grid.lane_point(cell, to, 1.0 - progress);
                (LaneKey::new(cell, to), QuadCurve::new(start, control, end))
            }
            TurnKind::Circulate => {
                let control = lane_corner(grid, cell, self.heading, to)
                    .lerp(&grid.cell_center(cell), 0.5);
                let end = grid.lane_point(cell, to, 0.5);
                (LaneKey::new(cell, to), QuadCurve::new(start, control, end))
            }
        }
    }

    fn advance_turn(&mut self, ctx: &mut CarContext<'_>) {
        let speed = self.speed();
        let Some(mut turn) = self.turn else {
            return;
        };

        turn.progress = (turn.progress + speed * ctx.delta / turn.length).min(1.0);
        self.position = turn.curve.point_at(turn.progress);
        if turn.progress < 1.0 {
            self.turn = Some(turn);
            return;
        }

        self.turn = None;
        self.heading = turn.target.heading;
        self.enter_lane(turn.target, ctx);
        ctx.lanes.release(turn.target, self.id, ctx.now);
        ctx.lanes.mark_pass(turn.target, ctx.now);

        match turn.kind {
            TurnKind::UTurn => self.last_uturn_at = Some(ctx.now),
            TurnKind::Circulate => self.roundabout_arcs += 1,
            TurnKind::Left | TurnKind::Right => {}
        }
    }

    /// Straight motion along the lane, gated at every cell boundary
    fn advance_straight(&mut self, ctx: &mut CarContext<'_>) -> CarUpdateResult {
        let grid = ctx.grid;
        let cell = self.lane.cell;
        let progress = self.progress(grid);

        let mut travel = self.speed() * ctx.delta;
        if let Some(gap) = ctx.ahead_gap {
            travel = travel.min((gap - self.profile().follow_gap).max(0.0));
        }
        let next_progress = progress + travel / CELL_SIZE;

        let forward = cell.step(self.heading);
        let forward_in_grid = grid.in_bounds(forward);

        if forward_in_grid && !grid.is_driveable(forward) && next_progress > TURN_WINDOW_END {
            return CarUpdateResult::Despawn(DespawnReason::Crashed(CrashCause::DeadEnd));
        }

        if next_progress < 1.0 {
            self.position = grid.lane_point(cell, self.heading, next_progress);
            return CarUpdateResult::Continue;
        }

        if !forward_in_grid {
            self.leave_cell(ctx, grid);
            return CarUpdateResult::Despawn(DespawnReason::ExitedWorld);
        }

        let next_lane = LaneKey::new(forward, self.heading);
        let outcome = ctx.lanes.try_enter(
            next_lane,
            ctx.now,
            self.profile().yield_ignore_chance,
            &mut *ctx.rng,
        );
        if !outcome.admits() {
            self.position = grid.lane_point(cell, self.heading, 1.0 - BOUNDARY_EPSILON);
            self.yield_until = ctx.now + YIELD_PAUSE_SECS;
            return CarUpdateResult::Continue;
        }

        self.enter_lane(next_lane, ctx);
        self.position = grid.lane_point(forward, self.heading, (next_progress - 1.0).min(0.99));
        CarUpdateResult::Continue
    }

    /// Switch to a new lane, handling per-cell state when the cell changes
    fn enter_lane(&mut self, lane: LaneKey, ctx: &mut CarContext<'_>) {
        if lane.cell != self.lane.cell {
            let grid = ctx.grid;
            self.leave_cell(ctx, grid);
            self.chaos_hold = None;
            self.exiting_roundabout = false;
            if grid.cell_class(lane.cell) == CellClass::Roundabout {
                self.roundabout_arcs = 0;
            }
        }
        self.lane = lane;
    }

    fn leave_cell(&mut self, ctx: &mut CarContext<'_>, grid: &SimGrid) {
        if grid.cell_class(self.lane.cell) == CellClass::Roundabout {
            ctx.events.push(SimEvent::RoundaboutExit {
                car: self.id,
                laps: self.roundabout_laps(),
            });
        }
    }
}

/// Corner where the lane for `from` crosses the lane for `to` inside `cell`
fn lane_corner(grid: &SimGrid, cell: CellCoord, from: Heading, to: Heading) -> Position {
    let current = grid.lane_point(cell, from, 0.5);
    let next = grid.lane_point(cell, to, 0.5);
    if from.is_horizontal() {
        Position::new(next.x, current.y)
    } else {
        Position::new(current.x, next.y)
    }
}

/// No driveable neighbor at all and no way off the edge of the grid
pub fn is_boxed(grid: &SimGrid, cell: CellCoord, heading: Heading) -> bool {
    let can_leave_grid = !grid.in_bounds(cell.step(heading));
    !can_leave_grid && grid.neighbors(cell).next().is_none()
}

/// A true cul-de-sac: nothing ahead, no side road in this cell or the one
/// behind it, and no roundabout next door to turn around on.
pub fn is_cul_de_sac(grid: &SimGrid, cell: CellCoord, heading: Heading) -> bool {
    let forward = cell.step(heading);
    if !grid.in_bounds(forward) || grid.is_driveable(forward) {
        return false;
    }

    let has_side_road = |c: CellCoord| {
        grid.is_driveable(c.step(heading.left())) || grid.is_driveable(c.step(heading.right()))
    };
    let behind = cell.step(heading.reverse());
    if has_side_road(cell) || has_side_road(behind) {
        return false;
    }

    let near_roundabout = Heading::ALL
        .into_iter()
        .any(|h| grid.cell_class(cell.step(h)) == CellClass::Roundabout);
    !near_roundabout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::grid::Layout;
    use crate::simulation::types::SimId;
    use rand::SeedableRng;

    const DELTA: f32 = 0.05;

    #[test]
    fn cul_de_sac_detection() {
        let grid = SimGrid::from_layout(&Layout::from_rows(&[
            "h h h h h",
            "r r r r h",
            "h h h h h",
        ]));
        assert!(is_cul_de_sac(&grid, CellCoord::new(3, 1), Heading::East));
        // Driving out towards the edge is not a dead end
        assert!(!is_cul_de_sac(&grid, CellCoord::new(0, 1), Heading::West));
        assert!(!is_boxed(&grid, CellCoord::new(3, 1), Heading::East));
    }

    #[test]
    fn side_road_one_cell_back_is_not_a_cul_de_sac() {
        let grid = SimGrid::from_layout(&Layout::from_rows(&[
            "h h r h h",
            "r r r r h",
            "h h h h h",
        ]));
        assert!(!is_cul_de_sac(&grid, CellCoord::new(3, 1), Heading::East));
    }

    #[test]
    fn isolated_cell_is_boxed() {
        let grid = SimGrid::from_layout(&Layout::from_rows(&["h h h", "h r h", "h h h"]));
        assert!(is_boxed(&grid, CellCoord::new(1, 1), Heading::North));
    }

    #[test]
    fn turn_heading_follows_right_hand_circulation() {
        let grid = SimGrid::from_layout(&Layout::from_rows(&["r r r", "r o r", "r r r"]));
        let car = SimCar::new(
            CarId(crate::simulation::types::SimId(0)),
            Persona::Neutral,
            LaneKey::new(CellCoord::new(1, 1), Heading::East),
            0.3,
            &grid,
        );
        assert_eq!(car.turn_heading(TurnKind::Circulate), Heading::North);
        assert_eq!(car.turn_heading(TurnKind::Right), Heading::South);
        assert_eq!(car.turn_heading(TurnKind::UTurn), Heading::West);
    }

    #[test]
    fn last_lap_without_an_exit_is_boxed() {
        let grid = SimGrid::from_layout(&Layout::from_rows(&["h h h", "r o h", "h h h"]));
        let lane = LaneKey::new(CellCoord::new(1, 1), Heading::North);
        let mut rng = StdRng::seed_from_u64(1);
        let mut lanes = LaneTable::default();
        let mut events = Vec::new();

        let mut update_with_arcs = |arcs: u32| {
            let mut car = SimCar::new(CarId(SimId(0)), Persona::Neutral, lane, 0.5, &grid);
            car.roundabout_arcs = arcs;
            let mut ctx = CarContext {
                grid: &grid,
                lanes: &mut lanes,
                rng: &mut rng,
                events: &mut events,
                now: 1.0,
                delta: DELTA,
                chaos_intensity: 0.0,
                ahead_gap: None,
            };
            let result = car.update(&mut ctx);
            (car, result)
        };

        // Still inside the third lap: keep circulating towards the open exit
        let (car, result) = update_with_arcs(ROUNDABOUT_MAX_LAPS * ARCS_PER_LAP + 1);
        assert_eq!(result, CarUpdateResult::Continue);
        assert_eq!(car.turn.map(|turn| turn.kind), Some(TurnKind::Circulate));

        let (_, result) = update_with_arcs((ROUNDABOUT_MAX_LAPS + 1) * ARCS_PER_LAP - 1);
        assert_eq!(
            result,
            CarUpdateResult::Despawn(DespawnReason::Crashed(CrashCause::Boxed))
        );
    }

    #[test]
    fn chaos_swerve_is_held_for_the_rest_of_the_cell() {
        let grid = SimGrid::from_layout(&Layout::from_rows(&[
            "h r h h h",
            "r r r r r",
            "h r h h h",
        ]));
        let cell = CellCoord::new(1, 1);
        let blocker = CarId(SimId(99));

        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut lanes = LaneTable::default();
            // Both side lanes stay reserved, so the swerve can only be retried
            lanes.reserve(LaneKey::new(CellCoord::new(1, 0), Heading::North), blocker, 1000.0);
            lanes.reserve(LaneKey::new(CellCoord::new(1, 2), Heading::South), blocker, 1000.0);
            let mut events = Vec::new();
            let mut car = SimCar::new(
                CarId(SimId(0)),
                Persona::Slow,
                LaneKey::new(cell, Heading::East),
                TURN_WINDOW_START,
                &grid,
            );

            let mut held: Option<ChaosHold> = None;
            let mut now = 0.0;
            while car.lane.cell == cell && !car.is_turning() {
                now += DELTA;
                let mut ctx = CarContext {
                    grid: &grid,
                    lanes: &mut lanes,
                    rng: &mut rng,
                    events: &mut events,
                    now,
                    delta: DELTA,
                    chaos_intensity: 10_000.0,
                    ahead_gap: None,
                };
                let result = car.update(&mut ctx);
                match held {
                    None => {
                        if result != CarUpdateResult::Continue {
                            // This seed rolled a chaos crash
                            break;
                        }
                        held = car.chaos_hold;
                        assert!(held.is_some());
                    }
                    Some(hold) => {
                        // No fresh roll, so no chaos crash either
                        assert_eq!(result, CarUpdateResult::Continue);
                        if car.lane.cell == cell {
                            assert_eq!(car.chaos_hold, Some(hold));
                        }
                    }
                }
            }

            if let Some(hold) = held {
                assert_eq!(hold.cell, cell);
                if let Some(turn) = car.turn {
                    assert_eq!(turn.kind, hold.kind);
                } else {
                    // Drove on into the next cell, which drops the hold
                    assert_ne!(car.lane.cell, cell);
                    assert!(car.chaos_hold.is_none());
                }
                return;
            }
        }
        panic!("no seed held a swerve");
    }

    #[test]
    fn forced_entry_overwrites_the_last_pass() {
        let grid = SimGrid::from_layout(&Layout::from_rows(&["h h h h", "r r r r", "h h h h"]));
        let here = LaneKey::new(CellCoord::new(1, 1), Heading::East);
        let next = LaneKey::new(CellCoord::new(2, 1), Heading::East);
        let now = 1.0;

        let (mut forced, mut blocked) = (0, 0);
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut lanes = LaneTable::default();
            lanes.mark_pass(next, now - 0.1);
            let mut events = Vec::new();
            let mut car = SimCar::new(CarId(SimId(0)), Persona::Aggressive, here, 0.99, &grid);

            let result = {
                let mut ctx = CarContext {
                    grid: &grid,
                    lanes: &mut lanes,
                    rng: &mut rng,
                    events: &mut events,
                    now,
                    delta: DELTA,
                    chaos_intensity: 0.0,
                    ahead_gap: None,
                };
                car.update(&mut ctx)
            };
            assert_eq!(result, CarUpdateResult::Continue);

            if car.lane == next {
                forced += 1;
                assert_eq!(lanes.last_pass(next), Some(now));
            } else {
                blocked += 1;
                assert_eq!(car.lane, here);
                assert_eq!(lanes.last_pass(next), Some(now - 0.1));
                assert!(car.yield_until > now);
            }
        }
        assert!(forced > 0, "aggressive drivers never forced the gate");
        assert!(blocked > forced);
    }
}
