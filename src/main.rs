use anyhow::Result;
use apb_traffic::simulation::{
    ApbEconomy, CellClass, GameState, Layout, Position, SimConfig, SimGrid, SimWorld,
    SimulationStats,
};
use clap::Parser;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Speed of the scripted player, world units per second
const PLAYER_SPEED: f32 = 90.0;

const WAYPOINT_REACHED: f32 = 2.0;

#[derive(Parser)]
#[command(name = "apb_traffic")]
#[command(about = "Headless grid traffic and APB pursuit simulation")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "1200")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.05")]
    delta: f32,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// City layout JSON ({width, height, grid}); the built-in city otherwise
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Simulation config JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start an APB run whenever the cooldown allows
    #[arg(long)]
    apb: bool,

    /// Print the map after every simulated second
    #[arg(long)]
    map: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SimConfig::from_path(path)?,
        None => SimConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.delta > config.max_tick_delta {
        warn!(
            "Tick delta {}s is clamped to {}s",
            cli.delta, config.max_tick_delta
        );
    }

    let layout = load_layout(cli.layout.as_deref());
    run_headless(&cli, &layout, config);
    Ok(())
}

/// Read the layout file, falling back to the built-in city when it is
/// unreadable or has nowhere to drive
fn load_layout(path: Option<&Path>) -> Layout {
    let Some(path) = path else {
        return Layout::default_city();
    };
    match Layout::from_path(path) {
        Ok(layout) if SimGrid::from_layout(&layout).driveable_count() > 0 => layout,
        Ok(_) => {
            warn!(
                "Layout {} has no driveable cells, using the default city",
                path.display()
            );
            Layout::default_city()
        }
        Err(err) => {
            warn!("{:#}, using the default city", err);
            Layout::default_city()
        }
    }
}

/// Stand-in for player input: drives shortest routes between random road cells
struct ScriptedPlayer {
    position: Position,
    route: VecDeque<Position>,
    rng: StdRng,
}

impl ScriptedPlayer {
    fn new(world: &SimWorld, seed: Option<u64>) -> Self {
        let grid = &world.grid;
        let start = grid
            .driveable_cells()
            .find(|cell| grid.cell_class(*cell) == CellClass::Spawn)
            .or_else(|| grid.driveable_cells().next());
        let position = start
            .map(|cell| grid.cell_center(cell))
            .unwrap_or(Position::new(0.0, 0.0));
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        Self {
            position,
            route: VecDeque::new(),
            rng,
        }
    }

    fn update(&mut self, world: &mut SimWorld, delta: f32) {
        if self.route.is_empty() {
            self.plan(world);
        }

        let mut remaining = PLAYER_SPEED * delta;
        while remaining > 0.0 {
            let Some(&next) = self.route.front() else {
                break;
            };
            let offset = next - self.position;
            let distance = offset.length();
            if distance <= WAYPOINT_REACHED {
                self.route.pop_front();
                continue;
            }
            let advance = remaining.min(distance);
            self.position = self.position + offset * (advance / distance);
            remaining -= advance;
        }
    }

    fn plan(&mut self, world: &mut SimWorld) {
        let cells: Vec<_> = world.grid.driveable_cells().collect();
        let Some(&goal) = cells.choose(&mut self.rng) else {
            return;
        };
        let start = world.grid.cell_of(self.position);
        let Some(path) = world.road_network.find_path(start, goal) else {
            return;
        };

        self.route = path
            .windows(2)
            .map(|pair| match pair[0].heading_to(pair[1]) {
                Some(heading) => world.grid.lane_point(pair[1], heading, 0.5),
                None => world.grid.cell_center(pair[1]),
            })
            .collect();
    }
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(cli: &Cli, layout: &Layout, config: SimConfig) {
    println!("Running APB traffic simulation in headless mode...");
    println!("Ticks: {}, Delta: {}s", cli.ticks, cli.delta);

    // Calculate how many ticks equal 1 second of simulation time
    let ticks_per_second = (1.0 / cli.delta.max(f32::EPSILON)).ceil().max(1.0) as u32;
    println!();

    let seed = config.seed;
    let mut world = SimWorld::new(layout, config);
    let mut economy = GameState::new();
    let mut stats = SimulationStats::default();
    let mut player = ScriptedPlayer::new(&world, seed);

    println!("Initial state:");
    world.print_summary();
    world.draw_map(Some(player.position));

    for tick in 1..=cli.ticks {
        player.update(&mut world, cli.delta);

        if cli.apb && !world.is_apb_active() && economy.can_run() {
            if let Err(err) = world.start_apb(&economy, player.position) {
                warn!("APB refused: {}", err);
            }
        }

        let events = world.tick(cli.delta, player.position);
        economy.update(cli.delta);
        economy.apply_events(&events);
        stats.record(&events);

        if cli.map && tick % ticks_per_second == 0 {
            println!(
                "--- After tick {} ({:.1}s simulated time) ---",
                tick, world.time
            );
            world.print_summary();
            world.draw_map(Some(player.position));
        }
    }

    println!("=== Final State ===");
    world.print_summary();
    world.draw_map(Some(player.position));

    stats.active_cars = world.cars.len();
    stats.elapsed_time = world.time;
    info!("{}", economy.summary());
    stats.log_report();
}
