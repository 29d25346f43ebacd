//! Uniform spatial hash for enemy neighbor queries
//!
//! Rebuilt from scratch every tick: every enemy moves every frame, so an
//! incremental update would cost as much as the linear rebuild.

use std::collections::HashMap;

use glam::Vec2;

/// Buckets entity indices into square cells of `cell_size`
#[derive(Debug, Clone)]
pub struct SpatialHash {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<usize>>,
}

impl SpatialHash {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(1.0),
            cells: HashMap::new(),
        }
    }

    /// Replace the cell size; drops all buckets
    pub fn set_cell_size(&mut self, cell_size: f32) {
        self.cell_size = cell_size.max(1.0);
        self.cells.clear();
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cell key containing `pos`
    #[inline]
    pub fn cell_of(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    /// Empty every bucket, keeping their allocations
    pub fn clear(&mut self) {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
    }

    pub fn insert(&mut self, index: usize, pos: Vec2) {
        let key = self.cell_of(pos);
        self.cells.entry(key).or_default().push(index);
    }

    /// Clear and insert every `(index, position)` pair
    pub fn rebuild<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (usize, Vec2)>,
    {
        self.clear();
        for (index, pos) in entries {
            self.insert(index, pos);
        }
    }

    /// Indices stored in the 3×3 block of cells around `pos`
    pub fn neighbors(&self, pos: Vec2) -> impl Iterator<Item = usize> + '_ {
        let (cx, cy) = self.cell_of(pos);
        (-1..=1)
            .flat_map(move |dy| (-1..=1).map(move |dx| (cx + dx, cy + dy)))
            .filter_map(move |key| self.cells.get(&key))
            .flat_map(|bucket| bucket.iter().copied())
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(Vec::is_empty)
    }
}

impl Default for SpatialHash {
    fn default() -> Self {
        Self::new(64.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cell_of_negative_coordinates() {
        let grid = SpatialHash::new(50.0);
        assert_eq!(grid.cell_of(Vec2::new(0.0, 0.0)), (0, 0));
        assert_eq!(grid.cell_of(Vec2::new(49.9, 50.0)), (0, 1));
        assert_eq!(grid.cell_of(Vec2::new(-0.1, -50.1)), (-1, -2));
    }

    #[test]
    fn test_neighbors_only_visit_adjacent_cells() {
        let mut grid = SpatialHash::new(10.0);
        grid.insert(0, Vec2::new(5.0, 5.0)); // cell (0,0)
        grid.insert(1, Vec2::new(15.0, 15.0)); // cell (1,1)
        grid.insert(2, Vec2::new(25.0, 5.0)); // cell (2,0), two cells away
        let mut found: Vec<usize> = grid.neighbors(Vec2::new(5.0, 5.0)).collect();
        found.sort_unstable();
        assert_eq!(found, vec![0, 1]);
    }

    #[test]
    fn test_rebuild_drops_stale_entries() {
        let mut grid = SpatialHash::new(10.0);
        grid.rebuild([(0, Vec2::new(1.0, 1.0)), (1, Vec2::new(2.0, 2.0))]);
        assert_eq!(grid.len(), 2);
        grid.rebuild([(7, Vec2::new(100.0, 100.0))]);
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.neighbors(Vec2::new(1.0, 1.0)).count(), 0);
        assert_eq!(grid.neighbors(Vec2::new(101.0, 99.0)).collect::<Vec<_>>(), vec![7]);
    }

    proptest! {
        #[test]
        fn prop_neighbors_cover_everything_within_one_cell(
            points in proptest::collection::vec((-500.0f32..500.0, -500.0f32..500.0), 1..64),
            qx in -500.0f32..500.0,
            qy in -500.0f32..500.0,
        ) {
            let cell = 32.0;
            let mut grid = SpatialHash::new(cell);
            grid.rebuild(points.iter().enumerate().map(|(i, &(x, y))| (i, Vec2::new(x, y))));
            let query = Vec2::new(qx, qy);
            let found: Vec<usize> = grid.neighbors(query).collect();
            for (i, &(x, y)) in points.iter().enumerate() {
                let d = Vec2::new(x, y) - query;
                if d.x.abs() < cell && d.y.abs() < cell {
                    prop_assert!(found.contains(&i));
                }
            }
        }
    }
}
