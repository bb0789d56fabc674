//! Pursuit agent for APB runs
//!
//! The agent follows breadth-first routes through the road graph towards the
//! player, re-planning on a fixed cadence, when the player has moved far from
//! the last planned goal, or when it stops closing in. Without any route it
//! chases in a straight line while staying on driveable ground.

use log::{debug, info};

use super::grid::SimGrid;
use super::road_network::SimRoadNetwork;
use super::types::{CellCoord, Position};

/// Straight-line distance at which the player counts as caught
pub const CATCH_DISTANCE: f32 = 22.0;

/// Required improvement of the best distance within `STALL_SECS`
pub const STALL_PROGRESS: f32 = 4.0;
pub const STALL_SECS: f32 = 1.5;

pub const REPLAN_INTERVAL: f32 = 2.0;

/// Target movement since the last plan that forces a new one
pub const RETARGET_DISTANCE: f32 = 96.0;

pub const WAYPOINT_RADIUS: f32 = 8.0;

/// Closer than this to the final goal counts as standing on it
const ARRIVAL_EPSILON: f32 = 0.01;

pub const PURSUIT_BASE_SPEED: f32 = 78.0;
pub const MAX_SPEED_TIER: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChaseMode {
    /// Following a planned route
    Route,
    /// No route exists; straight-line chase
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PursuitUpdate {
    /// Agent is hidden
    Idle,
    Chasing,
    Captured,
}

#[derive(Debug, Clone)]
pub struct PursuitAgent {
    pub position: Position,
    visible: bool,
    route: Vec<CellCoord>,
    /// Lane-centered points for every route cell after the first
    waypoints: Vec<Position>,
    route_index: usize,
    plan_target: Option<Position>,
    last_seen_target: Option<Position>,
    best_distance: f32,
    stall_timer: f32,
    next_replan_at: f32,
    needs_plan: bool,
    failed_plans: u32,
    mode: ChaseMode,
    speed_tier: u8,
    plans: u32,
}

impl Default for PursuitAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl PursuitAgent {
    pub fn new() -> Self {
        Self {
            position: Position::new(0.0, 0.0),
            visible: false,
            route: Vec::new(),
            waypoints: Vec::new(),
            route_index: 0,
            plan_target: None,
            last_seen_target: None,
            best_distance: f32::INFINITY,
            stall_timer: 0.0,
            next_replan_at: 0.0,
            needs_plan: false,
            failed_plans: 0,
            mode: ChaseMode::Route,
            speed_tier: 0,
            plans: 0,
        }
    }

    /// Show the agent and reset its chase state
    ///
    /// Without an explicit position the agent appears at the grid corner
    /// farthest from the target. Either way it is moved to the nearest
    /// driveable cell.
    pub fn spawn(&mut self, now: f32, position: Option<Position>, target: Position, grid: &SimGrid) {
        let requested = match position {
            Some(position) => grid.cell_of(position),
            None => farthest_corner(grid, grid.cell_of(target)),
        };
        let cell = grid.nearest_driveable(requested).unwrap_or(requested);

        self.position = grid.cell_center(cell);
        self.visible = true;
        self.route.clear();
        self.waypoints.clear();
        self.route_index = 0;
        self.plan_target = None;
        self.last_seen_target = Some(target);
        self.best_distance = self.position.distance(&target);
        self.stall_timer = 0.0;
        self.next_replan_at = now;
        self.needs_plan = true;
        self.failed_plans = 0;
        self.mode = ChaseMode::Route;
        self.plans = 0;

        info!("Pursuit agent deployed at {:?}", cell);
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.route.clear();
        self.waypoints.clear();
        self.needs_plan = false;
    }

    /// Put a visible agent back on the road after the layout changed under
    /// it and force a new plan
    pub fn relocate(&mut self, grid: &SimGrid) {
        if !self.visible {
            return;
        }
        if !grid.is_driveable_at(self.position) {
            if let Some(cell) = grid.nearest_driveable(grid.cell_of(self.position)) {
                self.position = grid.cell_center(cell);
            }
        }
        self.route.clear();
        self.waypoints.clear();
        self.route_index = 0;
        self.needs_plan = true;
    }

    /// Speed tier 0..=5, each tier adding 10% to the base speed
    pub fn set_speed(&mut self, tier: u8) {
        self.speed_tier = tier.min(MAX_SPEED_TIER);
    }

    pub fn speed(&self) -> f32 {
        PURSUIT_BASE_SPEED * (1.0 + 0.1 * self.speed_tier as f32)
    }

    pub fn speed_tier(&self) -> u8 {
        self.speed_tier
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn mode(&self) -> ChaseMode {
        self.mode
    }

    pub fn route(&self) -> &[CellCoord] {
        &self.route
    }

    /// Number of plans made since the last spawn
    pub fn plans(&self) -> u32 {
        self.plans
    }

    pub fn failed_plans(&self) -> u32 {
        self.failed_plans
    }

    pub fn last_seen_target(&self) -> Option<Position> {
        self.last_seen_target
    }

    pub fn update(
        &mut self,
        now: f32,
        delta: f32,
        target: Position,
        grid: &SimGrid,
        network: &mut SimRoadNetwork,
    ) -> PursuitUpdate {
        if !self.visible {
            return PursuitUpdate::Idle;
        }

        let distance = self.position.distance(&target);
        if distance < CATCH_DISTANCE {
            return PursuitUpdate::Captured;
        }

        if distance <= self.best_distance - STALL_PROGRESS {
            self.best_distance = distance;
            self.stall_timer = 0.0;
        } else {
            self.stall_timer += delta;
        }

        let stalled = self.stall_timer >= STALL_SECS;
        let retargeted = self
            .plan_target
            .map_or(true, |planned| planned.distance(&target) > RETARGET_DISTANCE);
        if self.needs_plan || stalled || retargeted || now >= self.next_replan_at {
            self.plan(now, target, grid, network);
        }
        self.last_seen_target = Some(target);

        let step = self.speed() * delta;
        match self.mode {
            ChaseMode::Route => self.follow_route(step, target),
            ChaseMode::Direct => self.direct_step(step, target, grid),
        }

        if self.position.distance(&target) < CATCH_DISTANCE {
            PursuitUpdate::Captured
        } else {
            PursuitUpdate::Chasing
        }
    }

    fn plan(&mut self, now: f32, target: Position, grid: &SimGrid, network: &mut SimRoadNetwork) {
        self.plans += 1;
        self.needs_plan = false;
        self.plan_target = Some(target);
        self.next_replan_at = now + REPLAN_INTERVAL;
        self.stall_timer = 0.0;
        self.best_distance = self.position.distance(&target);

        let from = grid.nearest_driveable(grid.cell_of(self.position));
        let to = grid.nearest_driveable(grid.cell_of(target));
        let path = match (from, to) {
            (Some(from), Some(to)) => network.find_path(from, to),
            _ => None,
        };

        match path {
            Some(path) => {
                debug!("Pursuit route planned: {} cells", path.len());
                self.waypoints = route_waypoints(&path, grid);
                self.route = path;
                self.route_index = 0;
                self.mode = ChaseMode::Route;
                self.failed_plans = 0;
            }
            None => {
                if self.mode == ChaseMode::Route {
                    debug!("No pursuit route, switching to direct chase");
                }
                self.route.clear();
                self.waypoints.clear();
                self.route_index = 0;
                self.mode = ChaseMode::Direct;
                self.failed_plans += 1;
            }
        }
    }

    fn follow_route(&mut self, step: f32, target: Position) {
        let mut remaining = step;
        while remaining > 0.0 {
            let on_route = self.route_index < self.waypoints.len();
            let goal = if on_route {
                self.waypoints[self.route_index]
            } else {
                target
            };

            let offset = goal - self.position;
            let distance = offset.length();
            if on_route && distance <= WAYPOINT_RADIUS {
                self.route_index += 1;
                continue;
            }
            if distance <= ARRIVAL_EPSILON {
                break;
            }

            let advance = remaining.min(distance);
            self.position = self.position + offset * (advance / distance);
            remaining -= advance;
        }
    }

    /// Straight-line step that never leaves driveable ground: the full step
    /// first, then its horizontal part, then its vertical part.
    fn direct_step(&mut self, step: f32, target: Position, grid: &SimGrid) {
        let offset = target - self.position;
        let distance = offset.length();
        if distance <= ARRIVAL_EPSILON {
            return;
        }

        let delta = offset * (step.min(distance) / distance);
        let candidates = [
            delta,
            Position::new(delta.x, 0.0),
            Position::new(0.0, delta.y),
        ];
        let here = self.position;
        let next = candidates
            .into_iter()
            .map(|candidate| here + candidate)
            .find(|next| grid.is_driveable_at(*next));
        if let Some(next) = next {
            self.position = next;
        }
    }
}

fn farthest_corner(grid: &SimGrid, from: CellCoord) -> CellCoord {
    let (w, h) = (grid.width() - 1, grid.height() - 1);
    [
        CellCoord::new(0, 0),
        CellCoord::new(w, 0),
        CellCoord::new(0, h),
        CellCoord::new(w, h),
    ]
    .into_iter()
    .max_by_key(|corner| corner.manhattan(from))
    .unwrap_or(from)
}

/// Lane-centered waypoint for each step of a cell route
fn route_waypoints(path: &[CellCoord], grid: &SimGrid) -> Vec<Position> {
    path.windows(2)
        .map(|pair| match pair[0].heading_to(pair[1]) {
            Some(heading) => grid.lane_point(pair[1], heading, 0.5),
            None => grid.cell_center(pair[1]),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::grid::Layout;

    #[test]
    fn spawns_in_the_far_corner_on_a_road() {
        let grid = SimGrid::from_layout(&Layout::default_city());
        let mut agent = PursuitAgent::new();
        let target = grid.cell_center(CellCoord::new(1, 1));
        agent.spawn(0.0, None, target, &grid);

        assert!(agent.is_visible());
        assert!(grid.is_driveable_at(agent.position));
        assert_eq!(grid.cell_of(agent.position), CellCoord::new(11, 9));
    }

    #[test]
    fn speed_tiers_are_capped() {
        let mut agent = PursuitAgent::new();
        agent.set_speed(9);
        assert_eq!(agent.speed_tier(), MAX_SPEED_TIER);
        assert!((agent.speed() - PURSUIT_BASE_SPEED * 1.5).abs() < 1e-3);
    }

    #[test]
    fn hidden_agent_is_idle() {
        let grid = SimGrid::from_layout(&Layout::default_city());
        let mut network = SimRoadNetwork::from_grid(&grid);
        let mut agent = PursuitAgent::new();
        let update = agent.update(0.0, 0.05, Position::new(0.0, 0.0), &grid, &mut network);
        assert_eq!(update, PursuitUpdate::Idle);
    }
}
