//! Grid model for the city layout
//!
//! Classifies layout cells and answers geometric questions (cell of a
//! position, lane centerlines, progress through a cell) for every moving
//! agent.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::path::Path;

use super::types::{CellCoord, Heading, LaneKey, Position, CELL_SIZE, LANE_OFFSET};

/// Kind of non-driveable building occupying a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildingKind {
    Home,
    House,
    Shop,
    Park,
    Hq,
}

/// Canonical classification of a layout cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellClass {
    Road,
    Avenue,
    Roundabout,
    /// The player's start cell; driveable like a road
    Spawn,
    Building(BuildingKind),
    Empty,
}

impl CellClass {
    /// Normalize a layout cell code. Codes may carry a variant suffix
    /// (`house:2`, `road-b`, `shop_blue`), which is ignored.
    pub fn from_code(code: &str) -> CellClass {
        let base = code
            .split([':', '-', '_'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match base.as_str() {
            "r" | "road" => CellClass::Road,
            "a" | "av" | "avenue" => CellClass::Avenue,
            "o" | "rb" | "roundabout" => CellClass::Roundabout,
            "st" | "start" | "spawn" => CellClass::Spawn,
            "home" => CellClass::Building(BuildingKind::Home),
            "h" | "house" => CellClass::Building(BuildingKind::House),
            "s" | "shop" => CellClass::Building(BuildingKind::Shop),
            "p" | "park" => CellClass::Building(BuildingKind::Park),
            "hq" => CellClass::Building(BuildingKind::Hq),
            _ => CellClass::Empty,
        }
    }

    pub fn is_driveable(self) -> bool {
        matches!(
            self,
            CellClass::Road | CellClass::Avenue | CellClass::Roundabout | CellClass::Spawn
        )
    }

    fn glyph(self) -> char {
        match self {
            CellClass::Road => '·',
            CellClass::Avenue => '=',
            CellClass::Roundabout => 'O',
            CellClass::Spawn => 'S',
            CellClass::Building(BuildingKind::Home) => 'H',
            CellClass::Building(BuildingKind::House) => 'h',
            CellClass::Building(BuildingKind::Shop) => '$',
            CellClass::Building(BuildingKind::Park) => '"',
            CellClass::Building(BuildingKind::Hq) => '#',
            CellClass::Empty => ' ',
        }
    }
}

/// City layout as handed over by the layout provider: `grid[y][x]` holds a
/// short cell code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    pub width: usize,
    pub height: usize,
    pub grid: Vec<Vec<String>>,
}

impl Layout {
    /// Build a layout from whitespace separated rows of cell codes
    pub fn from_rows(rows: &[&str]) -> Self {
        let grid: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.split_whitespace().map(str::to_string).collect())
            .collect();
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        Self {
            width,
            height: grid.len(),
            grid,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse layout JSON")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read layout file {}", path.display()))?;
        Self::from_json_str(&text)
    }

    /// The built-in 12x10 city. The start cell sits directly below the
    /// roundabout on the avenue.
    pub fn default_city() -> Self {
        Self::from_rows(&[
            "r r    r r  r  r  r  r r r r r",
            "r h    s .  r  p  p  r h h . r",
            "r h    h .  r  p  p  r h s . r",
            "a a    a a  o  a  a  a a a a a",
            "r home . .  st hq hq r . p . r",
            "r h    . .  r  h  h  r . p . r",
            "r r    r r  r  r  r  r r r r r",
            "r s    h .  r  p  p  r h h . r",
            "r h    h .  r  s  h  r . h h r",
            "r r    r r  r  r  r  r r r r r",
        ])
    }
}

/// Classified grid, immutable once built
#[derive(Debug, Clone)]
pub struct SimGrid {
    width: i32,
    height: i32,
    cells: Vec<CellClass>,
}

impl SimGrid {
    pub fn from_layout(layout: &Layout) -> Self {
        let width = layout.width as i32;
        let height = layout.height as i32;
        let mut cells = Vec::with_capacity(layout.width * layout.height);

        for y in 0..layout.height {
            let row = layout.grid.get(y);
            for x in 0..layout.width {
                let class = row
                    .and_then(|r| r.get(x))
                    .map(|code| CellClass::from_code(code))
                    .unwrap_or(CellClass::Empty);
                cells.push(class);
            }
        }

        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Size of the whole grid in world units
    pub fn world_size(&self) -> Position {
        Position::new(self.width as f32 * CELL_SIZE, self.height as f32 * CELL_SIZE)
    }

    pub fn in_bounds(&self, cell: CellCoord) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    /// Class of a cell; anything outside the grid is `Empty`
    pub fn cell_class(&self, cell: CellCoord) -> CellClass {
        if !self.in_bounds(cell) {
            return CellClass::Empty;
        }
        self.cells[(cell.y * self.width + cell.x) as usize]
    }

    pub fn is_driveable(&self, cell: CellCoord) -> bool {
        self.cell_class(cell).is_driveable()
    }

    pub fn is_driveable_at(&self, position: Position) -> bool {
        self.is_driveable(self.cell_of(position))
    }

    /// Driveable orthogonal neighbors, in `Heading::ALL` order
    pub fn neighbors(&self, cell: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        Heading::ALL
            .into_iter()
            .map(move |h| cell.step(h))
            .filter(move |n| self.is_driveable(*n))
    }

    pub fn driveable_cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        (0..self.height)
            .flat_map(move |y| (0..self.width).map(move |x| CellCoord::new(x, y)))
            .filter(move |c| self.is_driveable(*c))
    }

    pub fn driveable_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_driveable()).count()
    }

    pub fn cell_of(&self, position: Position) -> CellCoord {
        CellCoord::new(
            (position.x / CELL_SIZE).floor() as i32,
            (position.y / CELL_SIZE).floor() as i32,
        )
    }

    pub fn cell_center(&self, cell: CellCoord) -> Position {
        Position::new(
            (cell.x as f32 + 0.5) * CELL_SIZE,
            (cell.y as f32 + 0.5) * CELL_SIZE,
        )
    }

    /// Point on the right-hand lane centerline of `cell` for traffic moving
    /// in `heading`, `progress` (0..1) of the way through the cell.
    pub fn lane_point(&self, cell: CellCoord, heading: Heading, progress: f32) -> Position {
        self.cell_center(cell)
            + heading.right().vector() * LANE_OFFSET
            + heading.vector() * ((progress - 0.5) * CELL_SIZE)
    }

    /// How far (0..1) a position has travelled through `cell` along `heading`
    pub fn progress_in_cell(&self, position: Position, cell: CellCoord, heading: Heading) -> f32 {
        let local_x = position.x / CELL_SIZE - cell.x as f32;
        let local_y = position.y / CELL_SIZE - cell.y as f32;
        match heading {
            Heading::East => local_x,
            Heading::West => 1.0 - local_x,
            Heading::South => local_y,
            Heading::North => 1.0 - local_y,
        }
    }

    /// Lanes where traffic can enter from outside the grid: border cells
    /// whose road continues inward.
    pub fn entry_points(&self) -> Vec<LaneKey> {
        let mut entries = Vec::new();
        for cell in self.driveable_cells() {
            if self.cell_class(cell) == CellClass::Roundabout {
                continue;
            }
            for heading in Heading::ALL {
                let behind = cell.step(heading.reverse());
                if !self.in_bounds(behind) && self.is_driveable(cell.step(heading)) {
                    entries.push(LaneKey::new(cell, heading));
                }
            }
        }
        entries
    }

    /// Lanes inside the grid that lead into another driveable cell. Used
    /// when a layout has no road touching its border.
    pub fn interior_lanes(&self) -> Vec<LaneKey> {
        self.driveable_cells()
            .filter(|c| self.cell_class(*c) != CellClass::Roundabout)
            .flat_map(move |cell| {
                Heading::ALL
                    .into_iter()
                    .filter(move |h| self.is_driveable(cell.step(*h)))
                    .map(move |h| LaneKey::new(cell, h))
            })
            .collect()
    }

    /// Ring-expansion search outward from any cell (inside the grid or not)
    /// for the closest driveable cell.
    pub fn nearest_driveable(&self, from: CellCoord) -> Option<CellCoord> {
        if self.width <= 0 || self.height <= 0 {
            return None;
        }
        let start = CellCoord::new(
            from.x.clamp(0, self.width - 1),
            from.y.clamp(0, self.height - 1),
        );

        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(cell) = queue.pop_front() {
            if self.is_driveable(cell) {
                return Some(cell);
            }
            for heading in Heading::ALL {
                let next = cell.step(heading);
                if self.in_bounds(next) && visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        None
    }

    /// Render the grid as rows of glyphs for terminal output
    pub fn render_rows(&self) -> Vec<Vec<char>> {
        (0..self.height)
            .map(|y| {
                (0..self.width)
                    .map(|x| self.cell_class(CellCoord::new(x, y)).glyph())
                    .collect()
            })
            .collect()
    }
}
