//! Core types for the traffic simulation
//!
//! Plain data types shared by the grid, the vehicles and the pursuit agent.

use std::ops::{Add, Mul, Sub};

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimId(pub usize);

/// A wrapper type for car IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CarId(pub SimId);

/// Side length of one grid cell in world units (pixels)
pub const CELL_SIZE: f32 = 64.0;

/// Distance from a cell's center line to the centerline of a lane
pub const LANE_OFFSET: f32 = 12.0;

/// A continuous 2D position in world units. `y` grows downwards, matching
/// the row order of the layout grid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        (*other - *self).length()
    }

    pub fn lerp(&self, other: &Position, t: f32) -> Position {
        Position {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction, or zero for a zero vector
    pub fn normalized(&self) -> Position {
        let len = self.length();
        if len > f32::EPSILON {
            Position::new(self.x / len, self.y / len)
        } else {
            Position::default()
        }
    }

    pub fn dot(&self, other: &Position) -> f32 {
        self.x * other.x + self.y * other.y
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Position {
    type Output = Position;

    fn mul(self, rhs: f32) -> Position {
        Position::new(self.x * rhs, self.y * rhs)
    }
}

/// Integer grid coordinates of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The orthogonal neighbor in the given heading
    pub fn step(self, heading: Heading) -> CellCoord {
        let (dx, dy) = heading.offset();
        CellCoord::new(self.x + dx, self.y + dy)
    }

    pub fn manhattan(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn is_adjacent(self, other: CellCoord) -> bool {
        self.manhattan(other) == 1
    }

    /// Heading from this cell to an orthogonally adjacent cell
    pub fn heading_to(self, other: CellCoord) -> Option<Heading> {
        Heading::ALL.into_iter().find(|h| self.step(*h) == other)
    }
}

/// Travel direction on the grid (screen coordinates, north is up)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Heading {
    North,
    East,
    South,
    West,
}

impl Heading {
    pub const ALL: [Heading; 4] = [Heading::North, Heading::East, Heading::South, Heading::West];

    pub fn offset(self) -> (i32, i32) {
        match self {
            Heading::North => (0, -1),
            Heading::East => (1, 0),
            Heading::South => (0, 1),
            Heading::West => (-1, 0),
        }
    }

    /// Unit vector in world space
    pub fn vector(self) -> Position {
        let (dx, dy) = self.offset();
        Position::new(dx as f32, dy as f32)
    }

    pub fn reverse(self) -> Heading {
        match self {
            Heading::North => Heading::South,
            Heading::East => Heading::West,
            Heading::South => Heading::North,
            Heading::West => Heading::East,
        }
    }

    /// Heading after a quarter turn to the right (clockwise on screen)
    pub fn right(self) -> Heading {
        match self {
            Heading::North => Heading::East,
            Heading::East => Heading::South,
            Heading::South => Heading::West,
            Heading::West => Heading::North,
        }
    }

    pub fn left(self) -> Heading {
        self.right().reverse()
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Heading::East | Heading::West)
    }
}

/// A directional lane slot inside a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LaneKey {
    pub cell: CellCoord,
    pub heading: Heading,
}

impl LaneKey {
    pub const fn new(cell: CellCoord, heading: Heading) -> Self {
        Self { cell, heading }
    }

    /// The same lane one cell further along the heading
    pub fn next(self) -> LaneKey {
        LaneKey::new(self.cell.step(self.heading), self.heading)
    }
}
