//! Coarse zone aggregation: a fixed grid over a scalar map with a
//! damaged/safe flag per cell.

use crate::scalar_map::ScalarMap;
use serde::Serialize;

/// Cells per axis of the zone grid.
pub const GRID_SIZE: usize = 4;

/// Mean-intensity threshold above which a cell counts as damaged.
pub const DEFAULT_DAMAGE_THRESHOLD: f32 = 0.3;

/// Fixed NxN partition of a scalar map. Rows/columns beyond the largest
/// multiple of [`GRID_SIZE`] are ignored.
#[derive(Debug, Clone, Serialize)]
pub struct ZoneGrid {
    /// Row-major damaged flag per cell.
    pub damaged: [[bool; GRID_SIZE]; GRID_SIZE],
    pub damaged_count: usize,
    pub safe_count: usize,
}

/// Partition `map` into a [`GRID_SIZE`]² grid and flag each cell whose mean
/// intensity is strictly greater than `threshold`. A mean exactly equal to
/// the threshold counts as safe.
pub fn aggregate(map: &ScalarMap, threshold: f32) -> ZoneGrid {
    let (h, w) = map.dim();
    let tile_h = h / GRID_SIZE;
    let tile_w = w / GRID_SIZE;

    let mut damaged = [[false; GRID_SIZE]; GRID_SIZE];
    let mut damaged_count = 0;

    for (i, row) in damaged.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            let mut sum = 0.0f32;
            let mut count = 0usize;
            for y in i * tile_h..(i + 1) * tile_h {
                for x in j * tile_w..(j + 1) * tile_w {
                    sum += map[[y, x]];
                    count += 1;
                }
            }
            // Degenerate tiles (map smaller than the grid) count as safe.
            let is_damaged = count > 0 && sum / count as f32 > threshold;
            *cell = is_damaged;
            if is_damaged {
                damaged_count += 1;
            }
        }
    }

    ZoneGrid {
        damaged,
        damaged_count,
        safe_count: GRID_SIZE * GRID_SIZE - damaged_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn counts_always_sum_to_grid_size() {
        let map = Array2::from_shape_fn((256, 256), |(y, x)| ((y + x) % 7) as f32 / 7.0);
        let grid = aggregate(&map, DEFAULT_DAMAGE_THRESHOLD);
        assert_eq!(grid.damaged_count + grid.safe_count, GRID_SIZE * GRID_SIZE);
    }

    #[test]
    fn mean_equal_to_threshold_is_safe() {
        let map = Array2::from_elem((64, 64), DEFAULT_DAMAGE_THRESHOLD);
        let grid = aggregate(&map, DEFAULT_DAMAGE_THRESHOLD);
        assert_eq!(grid.damaged_count, 0);
        assert_eq!(grid.safe_count, 16);
    }

    #[test]
    fn hot_quadrant_flags_its_cells() {
        // Top-left 64x64 quadrant of a 256x256 map is fully damaged; that
        // quadrant spans exactly the four top-left cells.
        let map = Array2::from_shape_fn(
            (256, 256),
            |(y, x)| if y < 128 && x < 128 { 1.0 } else { 0.0 },
        );
        let grid = aggregate(&map, DEFAULT_DAMAGE_THRESHOLD);
        assert_eq!(grid.damaged_count, 4);
        assert!(grid.damaged[0][0] && grid.damaged[0][1]);
        assert!(grid.damaged[1][0] && grid.damaged[1][1]);
        assert!(!grid.damaged[3][3]);
    }

    #[test]
    fn truncates_non_divisible_maps() {
        // 65x67 truncates to 64x64 tiles of 16x16.
        let map = Array2::from_elem((65, 67), 1.0f32);
        let grid = aggregate(&map, DEFAULT_DAMAGE_THRESHOLD);
        assert_eq!(grid.damaged_count, 16);
    }

    #[test]
    fn tiny_map_counts_as_safe() {
        let map = Array2::from_elem((2, 2), 1.0f32);
        let grid = aggregate(&map, DEFAULT_DAMAGE_THRESHOLD);
        assert_eq!(grid.damaged_count, 0);
        assert_eq!(grid.safe_count, 16);
    }
}
