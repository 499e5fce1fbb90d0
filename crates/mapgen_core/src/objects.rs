//! Scratch object registry layered over the building grid.
//!
//! Phases that reason about whole objects (cities, ports, roads) rather
//! than cells build a [`MapObjects`] from the grid at the start of the
//! phase and drop it at the end. Nothing outlives the phase, so several
//! generators can run side by side.

use serde::{Deserialize, Serialize};

use crate::grid::{Building, Direction, MapGrid, Pos};

/// Object kinds that count as destinations for bridges and roads.
pub const LANDMARKS: [Building; 5] = [
    Building::City,
    Building::Ruin,
    Building::Temple,
    Building::Port,
    Building::Signpost,
];

/// A placed object: its kind, anchor (top-left cell) and footprint edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapObject {
    /// Building kind.
    pub kind: Building,
    /// Top-left cell of the footprint.
    pub pos: Pos,
    /// Footprint edge length in cells.
    pub size: u32,
}

impl MapObject {
    /// Create an object.
    #[must_use]
    pub const fn new(kind: Building, pos: Pos, size: u32) -> Self {
        Self { kind, pos, size }
    }

    /// True if `pos` lies inside the footprint.
    #[must_use]
    pub const fn contains(&self, pos: Pos) -> bool {
        let s = self.size as i32;
        pos.x >= self.pos.x && pos.x < self.pos.x + s && pos.y >= self.pos.y && pos.y < self.pos.y + s
    }

    /// Chebyshev distance from `pos` to the nearest footprint cell.
    #[must_use]
    pub fn distance_to(&self, pos: Pos) -> u32 {
        let s = self.size as i32 - 1;
        let nearest = Pos::new(
            pos.x.clamp(self.pos.x, self.pos.x + s),
            pos.y.clamp(self.pos.y, self.pos.y + s),
        );
        nearest.chebyshev(pos)
    }

    /// True if the anchor lies strictly on the `dir` side of `from`.
    #[must_use]
    pub fn lies_toward(&self, from: Pos, dir: Direction) -> bool {
        let (dx, dy) = dir.delta();
        let ok_x = match dx {
            0 => true,
            d if d > 0 => self.pos.x > from.x,
            _ => self.pos.x < from.x,
        };
        let ok_y = match dy {
            0 => true,
            d if d > 0 => self.pos.y > from.y,
            _ => self.pos.y < from.y,
        };
        ok_x && ok_y
    }
}

/// Registry of objects on a map.
#[derive(Debug, Clone, Default)]
pub struct MapObjects {
    objects: Vec<MapObject>,
}

impl MapObjects {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from every building on the grid, in row-major
    /// order of anchors. Multi-tile footprints are measured from the grid.
    #[must_use]
    pub fn scan(grid: &MapGrid) -> Self {
        let mut objects = Self::new();
        for pos in grid.positions() {
            let Some(kind) = grid.building(pos) else {
                continue;
            };
            if kind == Building::None {
                continue;
            }
            if !kind.is_multi_tile() {
                objects.add(MapObject::new(kind, pos, 1));
                continue;
            }
            let is_anchor = !grid.has(pos.offset(-1, 0), kind) && !grid.has(pos.offset(0, -1), kind);
            if is_anchor {
                let size = (0..)
                    .take_while(|&dx| grid.has(pos.offset(dx, 0), kind))
                    .count() as u32;
                objects.add(MapObject::new(kind, pos, size));
            }
        }
        objects
    }

    /// Register an object.
    pub fn add(&mut self, object: MapObject) {
        self.objects.push(object);
    }

    /// Number of objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True if no objects are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Every object in registration order.
    #[must_use]
    pub fn all(&self) -> &[MapObject] {
        &self.objects
    }

    /// Objects of one kind in registration order.
    pub fn of_kind(&self, kind: Building) -> impl Iterator<Item = &MapObject> {
        self.objects.iter().filter(move |o| o.kind == kind)
    }

    /// Object whose footprint covers `pos`.
    #[must_use]
    pub fn object_at(&self, pos: Pos) -> Option<&MapObject> {
        self.objects.iter().find(|o| o.contains(pos))
    }

    /// Nearest object of one of `kinds` to `pos`, optionally restricted to
    /// those lying toward `dir`. Ties go to the earliest registered.
    #[must_use]
    pub fn nearest_to(
        &self,
        pos: Pos,
        dir: Option<Direction>,
        kinds: &[Building],
    ) -> Option<&MapObject> {
        self.objects
            .iter()
            .filter(|o| kinds.contains(&o.kind))
            .filter(|o| dir.map_or(true, |d| o.lies_toward(pos, d)))
            .min_by_key(|o| o.distance_to(pos))
    }

    /// True if an object of `kind` lies within Chebyshev `radius` of `pos`.
    #[must_use]
    pub fn any_within(&self, pos: Pos, radius: u32, kind: Building) -> bool {
        self.of_kind(kind).any(|o| o.distance_to(pos) <= radius)
    }
}
