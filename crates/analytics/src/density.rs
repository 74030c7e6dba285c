//! Per-frame density scoring, spatial distribution analysis, and heatmap
//! generation from person bounding boxes.

use common::analysis::SpatialSummary;
use common::detections::BoundingBox;

use crate::config::DensityMethod;
use crate::stats;

/// Fraction of the frame dimension treated as "near the edge".
const EDGE_MARGIN: f64 = 0.1;

pub struct DensityEngine {
    method: DensityMethod,
    grid_rows: usize,
    grid_cols: usize,
}

impl DensityEngine {
    pub fn new(method: DensityMethod, grid_size: (usize, usize)) -> Self {
        Self {
            method,
            grid_rows: grid_size.0,
            grid_cols: grid_size.1,
        }
    }

    /// Density score in [0, 1]. Returns 0.0 when there are no boxes or the
    /// frame dimensions are unknown.
    pub fn density_score(&self, boxes: &[BoundingBox], dims: Option<(u32, u32)>) -> f64 {
        let Some((width, height)) = dims else {
            return 0.0;
        };
        if boxes.is_empty() || width == 0 || height == 0 {
            return 0.0;
        }
        match self.method {
            DensityMethod::BboxCoverage => Self::bbox_coverage(boxes, width, height),
            DensityMethod::SpatialDistribution => Self::spatial_distribution(boxes, width, height),
        }
    }

    /// Rasterize boxes onto a binary occupancy grid so overlap counts once,
    /// then take covered / total, capped at 1.0.
    fn bbox_coverage(boxes: &[BoundingBox], width: u32, height: u32) -> f64 {
        let w = width as usize;
        let h = height as usize;
        let mut mask = vec![false; w * h];

        for b in boxes {
            let x1 = (b.x1 as i64).clamp(0, w as i64 - 1) as usize;
            let y1 = (b.y1 as i64).clamp(0, h as i64 - 1) as usize;
            let x2 = (b.x2 as i64).clamp(0, w as i64 - 1) as usize;
            let y2 = (b.y2 as i64).clamp(0, h as i64 - 1) as usize;
            if x2 <= x1 || y2 <= y1 {
                continue;
            }
            for row in y1..y2 {
                mask[row * w + x1..row * w + x2].fill(true);
            }
        }

        let covered = mask.iter().filter(|&&cell| cell).count();
        (covered as f64 / (w * h) as f64).min(1.0)
    }

    /// Mean nearest-neighbour distance between box centers, normalized by
    /// the frame diagonal and inverted so tighter packing scores higher.
    /// Below two boxes there is no neighbour distance; fall back to a cheap
    /// count-based estimate.
    fn spatial_distribution(boxes: &[BoundingBox], width: u32, height: u32) -> f64 {
        if boxes.len() < 2 {
            return boxes.len() as f64 / 100.0;
        }

        let centers: Vec<(f64, f64)> = boxes.iter().map(|b| b.center()).collect();
        let mut nearest_sum = 0.0;
        for (i, a) in centers.iter().enumerate() {
            let mut nearest = f64::INFINITY;
            for (j, b) in centers.iter().enumerate() {
                if i == j {
                    continue;
                }
                nearest = nearest.min(distance(*a, *b));
            }
            nearest_sum += nearest;
        }
        let avg_min_distance = nearest_sum / centers.len() as f64;

        let diagonal = frame_diagonal(width, height);
        let normalized = avg_min_distance / diagonal;
        1.0 - normalized.min(1.0)
    }

    /// Spatial distribution summary; all-zero for an empty frame.
    pub fn spatial_summary(
        &self,
        boxes: &[BoundingBox],
        dims: Option<(u32, u32)>,
    ) -> SpatialSummary {
        if boxes.is_empty() {
            return SpatialSummary::default();
        }

        let centers: Vec<(f64, f64)> = boxes.iter().map(|b| b.center()).collect();
        let xs: Vec<f64> = centers.iter().map(|c| c.0).collect();
        let ys: Vec<f64> = centers.iter().map(|c| c.1).collect();

        let center_of_mass = (stats::mean(&xs), stats::mean(&ys));
        let spread = if centers.len() > 1 {
            (stats::std_dev(&xs) + stats::std_dev(&ys)) / 2.0
        } else {
            0.0
        };

        SpatialSummary {
            center_of_mass,
            spread,
            clustering_score: Self::clustering_score(&centers, dims),
            edge_density: Self::edge_density(&centers, dims),
        }
    }

    /// 1 - normalized mean pairwise distance; 0.0 below two points or with
    /// unknown frame dimensions.
    fn clustering_score(centers: &[(f64, f64)], dims: Option<(u32, u32)>) -> f64 {
        if centers.len() < 2 {
            return 0.0;
        }
        let Some((width, height)) = dims else {
            return 0.0;
        };

        let mut total = 0.0;
        let mut pairs = 0usize;
        for i in 0..centers.len() {
            for j in 0..centers.len() {
                if i == j {
                    continue;
                }
                total += distance(centers[i], centers[j]);
                pairs += 1;
            }
        }
        let avg_distance = total / pairs as f64;
        let normalized = avg_distance / frame_diagonal(width, height);
        1.0 - normalized.min(1.0)
    }

    /// Fraction of centers within 10% of the frame size from any edge.
    fn edge_density(centers: &[(f64, f64)], dims: Option<(u32, u32)>) -> f64 {
        let Some((width, height)) = dims else {
            return 0.0;
        };
        if centers.is_empty() {
            return 0.0;
        }

        let edge_x = f64::from(width) * EDGE_MARGIN;
        let edge_y = f64::from(height) * EDGE_MARGIN;
        let near_edge = centers
            .iter()
            .filter(|(x, y)| {
                *x < edge_x
                    || *x > f64::from(width) - edge_x
                    || *y < edge_y
                    || *y > f64::from(height) - edge_y
            })
            .count();

        near_edge as f64 / centers.len() as f64
    }

    /// Per-cell box-center counts on the configured grid. Centers on the far
    /// boundary are clamped into the last valid row/column.
    pub fn heatmap_counts(&self, boxes: &[BoundingBox], dims: Option<(u32, u32)>) -> Vec<Vec<u32>> {
        let mut grid = vec![vec![0u32; self.grid_cols]; self.grid_rows];
        let Some((width, height)) = dims else {
            return grid;
        };
        if boxes.is_empty() || width == 0 || height == 0 {
            return grid;
        }

        let cell_width = f64::from(width) / self.grid_cols as f64;
        let cell_height = f64::from(height) / self.grid_rows as f64;

        for b in boxes {
            let (cx, cy) = b.center();
            let col = ((cx / cell_width).floor() as i64).clamp(0, self.grid_cols as i64 - 1);
            let row = ((cy / cell_height).floor() as i64).clamp(0, self.grid_rows as i64 - 1);
            grid[row as usize][col as usize] += 1;
        }

        grid
    }

    /// Heatmap normalized by its maximum cell; stays all-zero when no cell
    /// received a count.
    pub fn heatmap(&self, boxes: &[BoundingBox], dims: Option<(u32, u32)>) -> Vec<Vec<f64>> {
        let counts = self.heatmap_counts(boxes, dims);
        let max = counts
            .iter()
            .flat_map(|row| row.iter())
            .copied()
            .max()
            .unwrap_or(0);

        counts
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| {
                        if max > 0 {
                            f64::from(cell) / f64::from(max)
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

fn frame_diagonal(width: u32, height: u32) -> f64 {
    (f64::from(width) * f64::from(width) + f64::from(height) * f64::from(height)).sqrt()
}
