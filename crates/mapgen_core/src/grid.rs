//! Map grids: terrain and building layers over a row-major cell buffer.
//!
//! A [`MapGrid`] owns two parallel [`Grid`]s of equal dimensions. Every
//! cell always holds exactly one [`Terrain`] and one [`Building`] value;
//! fresh grids are all [`Terrain::Grass`] with no buildings.

use serde::{Deserialize, Serialize};

/// A cell coordinate. Signed so neighbour arithmetic can step off-grid
/// and be rejected by bounds checks instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Pos {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Pos {
    /// Create a position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Position shifted by an offset.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Neighbouring position in `dir`.
    #[must_use]
    pub const fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        self.offset(dx, dy)
    }

    /// Chebyshev (king-move) distance.
    #[must_use]
    pub const fn chebyshev(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy {
            dx
        } else {
            dy
        }
    }

    /// Squared Euclidean distance.
    #[must_use]
    pub const fn distance_squared(self, other: Self) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }
}

/// The eight compass directions, clockwise from north. North is -y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// -y
    North,
    /// +x -y
    NorthEast,
    /// +x
    East,
    /// +x +y
    SouthEast,
    /// +y
    South,
    /// -x +y
    SouthWest,
    /// -x
    West,
    /// -x -y
    NorthWest,
}

impl Direction {
    /// All directions in clockwise order starting at north.
    pub const ALL: [Self; 8] = [
        Self::North,
        Self::NorthEast,
        Self::East,
        Self::SouthEast,
        Self::South,
        Self::SouthWest,
        Self::West,
        Self::NorthWest,
    ];

    /// The four edge-sharing directions.
    pub const CARDINAL: [Self; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Offset `(dx, dy)` of one step in this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::NorthEast => (1, -1),
            Self::East => (1, 0),
            Self::SouthEast => (1, 1),
            Self::South => (0, 1),
            Self::SouthWest => (-1, 1),
            Self::West => (-1, 0),
            Self::NorthWest => (-1, -1),
        }
    }

    /// Index into [`Direction::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Rotate clockwise by `steps` eighth-turns (negative is counter-clockwise).
    #[must_use]
    pub const fn rotate(self, steps: i32) -> Self {
        Self::ALL[(self as i32 + steps).rem_euclid(8) as usize]
    }

    /// True for the four diagonal directions.
    #[must_use]
    pub const fn is_diagonal(self) -> bool {
        (self as usize) % 2 == 1
    }
}

/// Ground cover of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Terrain {
    /// Open plains; the blank canvas every other terrain is painted onto.
    #[default]
    Grass,
    /// Lakes, rivers and sea.
    Water,
    /// Woodland.
    Forest,
    /// Rough but passable high ground.
    Hills,
    /// Impassable for land movement.
    Mountain,
    /// Marshland.
    Swamp,
}

impl Terrain {
    /// ASCII glyph used by fixtures and the CLI renderer.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Grass => '.',
            Self::Water => '~',
            Self::Forest => 'f',
            Self::Hills => 'h',
            Self::Mountain => 'M',
            Self::Swamp => 's',
        }
    }

    /// Parse an ASCII glyph.
    #[must_use]
    pub const fn from_glyph(c: char) -> Option<Self> {
        match c {
            '.' => Some(Self::Grass),
            '~' => Some(Self::Water),
            'f' => Some(Self::Forest),
            'h' => Some(Self::Hills),
            'M' => Some(Self::Mountain),
            's' => Some(Self::Swamp),
            _ => None,
        }
    }
}

/// What occupies a cell, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Building {
    /// Empty cell.
    #[default]
    None,
    /// Part of a city footprint.
    City,
    /// Part of a ruin footprint.
    Ruin,
    /// Part of a temple footprint.
    Temple,
    /// Signpost.
    Signpost,
    /// Road segment.
    Road,
    /// Bridge segment (always on water).
    Bridge,
    /// Harbour where land units may board ships.
    Port,
    /// Standing stone.
    Stone,
}

impl Building {
    /// Buildings that occupy a square footprint anchored at the top-left cell.
    #[must_use]
    pub const fn is_multi_tile(self) -> bool {
        matches!(self, Self::City | Self::Ruin | Self::Temple)
    }

    /// ASCII glyph used by fixtures and the CLI renderer.
    #[must_use]
    pub const fn glyph(self) -> Option<char> {
        match self {
            Self::None => None,
            Self::City => Some('C'),
            Self::Ruin => Some('R'),
            Self::Temple => Some('T'),
            Self::Signpost => Some('S'),
            Self::Road => Some('='),
            Self::Bridge => Some('B'),
            Self::Port => Some('P'),
            Self::Stone => Some('o'),
        }
    }

    /// Parse an ASCII glyph.
    #[must_use]
    pub const fn from_glyph(c: char) -> Option<Self> {
        match c {
            'C' => Some(Self::City),
            'R' => Some(Self::Ruin),
            'T' => Some(Self::Temple),
            'S' => Some(Self::Signpost),
            '=' => Some(Self::Road),
            'B' => Some(Self::Bridge),
            'P' => Some(Self::Port),
            'o' => Some(Self::Stone),
            _ => None,
        }
    }
}

/// Fixed-size 2D container stored in row-major order (`y * width + x`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid<T> {
    width: u32,
    height: u32,
    cells: Vec<T>,
}

impl<T: Copy> Grid<T> {
    /// Create a grid with every cell set to `fill`.
    #[must_use]
    pub fn new(width: u32, height: u32, fill: T) -> Self {
        Self {
            width,
            height,
            cells: vec![fill; width as usize * height as usize],
        }
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Check if a position is within grid bounds.
    #[must_use]
    pub const fn in_bounds(&self, pos: Pos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// Linear index of a position, `None` if out of bounds.
    #[inline]
    #[must_use]
    pub const fn index(&self, pos: Pos) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    /// Position of a linear index.
    #[inline]
    #[must_use]
    pub const fn pos_of(&self, index: usize) -> Pos {
        let w = self.width as usize;
        Pos::new((index % w) as i32, (index / w) as i32)
    }

    /// Value at a position, `None` if out of bounds.
    #[must_use]
    pub fn get(&self, pos: Pos) -> Option<T> {
        self.index(pos).map(|i| self.cells[i])
    }

    /// Set the value at a position. Returns `false` if out of bounds.
    pub fn set(&mut self, pos: Pos, value: T) -> bool {
        match self.index(pos) {
            Some(i) => {
                self.cells[i] = value;
                true
            }
            None => false,
        }
    }

    /// Overwrite every cell.
    pub fn fill(&mut self, value: T) {
        self.cells.fill(value);
    }

    /// Cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    /// Every position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Pos> {
        let (w, h) = (self.width as i32, self.height as i32);
        (0..h).flat_map(move |y| (0..w).map(move |x| Pos::new(x, y)))
    }

    /// Number of cells matching a predicate.
    pub fn count(&self, pred: impl Fn(T) -> bool) -> usize {
        self.cells.iter().filter(|&&c| pred(c)).count()
    }
}

/// Terrain and building layers of a map under construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapGrid {
    terrain: Grid<Terrain>,
    buildings: Grid<Building>,
}

impl MapGrid {
    /// Create an all-grass map without buildings.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            terrain: Grid::new(width, height, Terrain::Grass),
            buildings: Grid::new(width, height, Building::None),
        }
    }

    /// Parse a map from ASCII rows using the [`Terrain::glyph`] and
    /// [`Building::glyph`] alphabets. Buildings sit on grass, except
    /// bridges which sit on water. Returns `None` for ragged rows or
    /// unknown glyphs.
    #[must_use]
    pub fn from_ascii(rows: &[&str]) -> Option<Self> {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |r| r.chars().count()) as u32;
        let mut grid = Self::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() as u32 != width {
                return None;
            }
            for (x, c) in row.chars().enumerate() {
                let pos = Pos::new(x as i32, y as i32);
                if let Some(terrain) = Terrain::from_glyph(c) {
                    grid.set_terrain(pos, terrain);
                } else {
                    let building = Building::from_glyph(c)?;
                    if building == Building::Bridge {
                        grid.set_terrain(pos, Terrain::Water);
                    }
                    grid.set_building(pos, building);
                }
            }
        }
        Some(grid)
    }

    /// Render as ASCII rows; buildings take precedence over terrain.
    #[must_use]
    pub fn to_ascii(&self) -> Vec<String> {
        (0..self.height() as i32)
            .map(|y| {
                (0..self.width() as i32)
                    .map(|x| {
                        let pos = Pos::new(x, y);
                        self.building(pos)
                            .and_then(Building::glyph)
                            .or_else(|| self.terrain(pos).map(Terrain::glyph))
                            .unwrap_or(' ')
                    })
                    .collect()
            })
            .collect()
    }

    /// Map width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.terrain.width()
    }

    /// Map height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.terrain.height()
    }

    /// Total number of cells.
    #[must_use]
    pub const fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Check if a position is within map bounds.
    #[must_use]
    pub const fn in_bounds(&self, pos: Pos) -> bool {
        self.terrain.in_bounds(pos)
    }

    /// True if `pos` is at least `margin` cells away from every edge.
    #[must_use]
    pub const fn is_interior(&self, pos: Pos, margin: i32) -> bool {
        pos.x >= margin
            && pos.y >= margin
            && pos.x < self.width() as i32 - margin
            && pos.y < self.height() as i32 - margin
    }

    /// Terrain layer.
    #[must_use]
    pub const fn terrain_grid(&self) -> &Grid<Terrain> {
        &self.terrain
    }

    /// Building layer.
    #[must_use]
    pub const fn building_grid(&self) -> &Grid<Building> {
        &self.buildings
    }

    /// Terrain at a position, `None` if out of bounds.
    #[must_use]
    pub fn terrain(&self, pos: Pos) -> Option<Terrain> {
        self.terrain.get(pos)
    }

    /// Building at a position, `None` if out of bounds.
    #[must_use]
    pub fn building(&self, pos: Pos) -> Option<Building> {
        self.buildings.get(pos)
    }

    /// True if `pos` is in bounds and has terrain `t`.
    #[must_use]
    pub fn is(&self, pos: Pos, t: Terrain) -> bool {
        self.terrain(pos) == Some(t)
    }

    /// True if `pos` is in bounds and has building `b`.
    #[must_use]
    pub fn has(&self, pos: Pos, b: Building) -> bool {
        self.building(pos) == Some(b)
    }

    /// True if `pos` is in bounds and not water.
    #[must_use]
    pub fn is_land(&self, pos: Pos) -> bool {
        self.terrain(pos).is_some_and(|t| t != Terrain::Water)
    }

    /// Set terrain. Returns `false` if out of bounds.
    pub fn set_terrain(&mut self, pos: Pos, terrain: Terrain) -> bool {
        self.terrain.set(pos, terrain)
    }

    /// Set building. Returns `false` if out of bounds.
    pub fn set_building(&mut self, pos: Pos, building: Building) -> bool {
        self.buildings.set(pos, building)
    }

    /// Reset to all grass without buildings.
    pub fn reset(&mut self) {
        self.terrain.fill(Terrain::Grass);
        self.buildings.fill(Building::None);
    }

    /// Every position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Pos> {
        self.terrain.positions()
    }

    /// Number of the 8 neighbours of `pos` that have terrain `t`.
    /// Off-grid neighbours never match.
    #[must_use]
    pub fn count_neighbours(&self, pos: Pos, t: Terrain) -> usize {
        Direction::ALL
            .iter()
            .filter(|&&d| self.is(pos.step(d), t))
            .count()
    }

    /// True if any cell within Chebyshev `radius` of `pos` has a building.
    #[must_use]
    pub fn any_building_within(&self, pos: Pos, radius: i32) -> bool {
        (-radius..=radius).any(|dy| {
            (-radius..=radius).any(|dx| {
                self.building(pos.offset(dx, dy))
                    .is_some_and(|b| b != Building::None)
            })
        })
    }
}
