use crate::core_types::{TargetId, Vec3};
use rustc_hash::FxHashMap;

/// Hash grid for radius queries over scene objects
///
/// Cells are keyed by the Morton code of their integer coordinates, so
/// neighbouring cells land close together in key space.
#[derive(Debug, Clone)]
pub struct SpatialHashGrid {
    cells: FxHashMap<u64, Vec<(TargetId, Vec3)>>,
    cell_size: f32,
    origin: Vec3,
}

impl SpatialHashGrid {
    /// Create a new grid; `cell_size` should be close to the typical query radius
    pub fn new(origin: Vec3, cell_size: f32) -> Self {
        SpatialHashGrid {
            cells: FxHashMap::default(),
            cell_size: cell_size.max(f32::EPSILON),
            origin,
        }
    }

    fn cell_coords(&self, pos: Vec3) -> (i32, i32, i32) {
        let ix = ((pos.x - self.origin.x) / self.cell_size).floor() as i32;
        let iy = ((pos.y - self.origin.y) / self.cell_size).floor() as i32;
        let iz = ((pos.z - self.origin.z) / self.cell_size).floor() as i32;
        (ix, iy, iz)
    }

    fn hash_position(&self, pos: Vec3) -> u64 {
        let (ix, iy, iz) = self.cell_coords(pos);
        morton_encode(ix, iy, iz)
    }

    /// Insert an object at `position`
    pub fn insert(&mut self, id: TargetId, position: Vec3) {
        let hash = self.hash_position(position);
        self.cells.entry(hash).or_default().push((id, position));
    }

    /// Remove an object previously inserted at `position`
    pub fn remove(&mut self, id: TargetId, position: Vec3) {
        let hash = self.hash_position(position);
        if let Some(cell) = self.cells.get_mut(&hash) {
            cell.retain(|&(x, _)| x != id);
            if cell.is_empty() {
                self.cells.remove(&hash);
            }
        }
    }

    /// All objects whose position lies within `radius` of `pos`
    pub fn query_radius(&self, pos: Vec3, radius: f32) -> Vec<TargetId> {
        let cells_needed = (radius / self.cell_size).ceil() as i32;
        let (cx, cy, cz) = self.cell_coords(pos);
        let radius_sq = radius * radius;

        let mut results = Vec::new();
        for dx in -cells_needed..=cells_needed {
            for dy in -cells_needed..=cells_needed {
                for dz in -cells_needed..=cells_needed {
                    let hash = morton_encode(cx + dx, cy + dy, cz + dz);
                    if let Some(entries) = self.cells.get(&hash) {
                        results.extend(
                            entries
                                .iter()
                                .filter(|(_, p)| (p - pos).norm_squared() <= radius_sq)
                                .map(|&(id, _)| id),
                        );
                    }
                }
            }
        }

        results
    }

    /// Number of objects in the grid
    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Morton encode 3D coordinates into a single 64-bit integer
fn morton_encode(x: i32, y: i32, z: i32) -> u64 {
    // Reinterpret as unsigned so negative coordinates keep distinct codes
    let x = u64::from(x as u32);
    let y = u64::from(y as u32);
    let z = u64::from(z as u32);

    let mut result = 0u64;

    for i in 0..21 {
        // 21 bits per coordinate = 63 bits total
        result |= ((x & (1 << i)) << (2 * i))
            | ((y & (1 << i)) << (2 * i + 1))
            | ((z & (1 << i)) << (2 * i + 2));
    }

    result
}
