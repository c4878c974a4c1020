//! Clustering of raw detections into final face boxes.
//!
//! Overlapping detections are grouped with a union-find partition: two
//! detections join the same component when their IoU exceeds the caller's
//! threshold. Each component collapses to a single representative whose
//! position and size are the score-weighted means of its members and whose
//! score is the member sum.

use crate::detector::Detection;

/// Disjoint-set forest over detection indices. Unions always attach the
/// higher root index under the lower one, so a component's root is its
/// earliest member in traversal order.
struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
        }
    }

    fn find(&mut self, mut i: u32) -> u32 {
        while self.parent[i as usize] != i {
            // path halving
            let grandparent = self.parent[self.parent[i as usize] as usize];
            self.parent[i as usize] = grandparent;
            i = grandparent;
        }
        i
    }

    fn union(&mut self, a: u32, b: u32) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi as usize] = lo;
        }
    }
}

/// Intersection over union of two axis-aligned squares centered at the
/// detections' `(row, col)` with side `scale`. A degenerate union reads
/// as no overlap.
fn iou(a: &Detection, b: &Detection) -> f32 {
    let (ar, ac, asz) = (a.row as f32, a.col as f32, a.scale as f32);
    let (br, bc, bsz) = (b.row as f32, b.col as f32, b.scale as f32);

    let left = (ac - asz / 2.0).max(bc - bsz / 2.0);
    let right = (ac + asz / 2.0).min(bc + bsz / 2.0);
    let top = (ar - asz / 2.0).max(br - bsz / 2.0);
    let bot = (ar + asz / 2.0).min(br + bsz / 2.0);

    let inter = (right - left).max(0.0) * (bot - top).max(0.0);
    let union = asz * asz + bsz * bsz - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

#[derive(Clone, Copy, Default)]
struct Accumulator {
    count: u32,
    q_sum: f32,
    weighted_row: f32,
    weighted_col: f32,
    weighted_scale: f32,
    row_sum: f32,
    col_sum: f32,
    scale_sum: f32,
}

/// Collapse overlapping detections into one representative per cluster.
///
/// Detections are joined when their pairwise IoU is strictly greater than
/// `iou_threshold` (clamped into `[0, 1]`); membership is transitive. The
/// representative carries the score-weighted mean center and size, rounded
/// to the nearest pixel, and the summed score of the cluster. Output
/// clusters appear in the order of their earliest member.
pub fn cluster_detections(detections: &[Detection], iou_threshold: f32) -> Vec<Detection> {
    if detections.is_empty() {
        return Vec::new();
    }
    let threshold = iou_threshold.clamp(0.0, 1.0);

    let mut sets = UnionFind::new(detections.len());
    for i in 0..detections.len() {
        for j in (i + 1)..detections.len() {
            if iou(&detections[i], &detections[j]) > threshold {
                sets.union(i as u32, j as u32);
            }
        }
    }

    let mut accumulators = vec![Accumulator::default(); detections.len()];
    let mut roots = Vec::new();
    for (i, d) in detections.iter().enumerate() {
        let root = sets.find(i as u32) as usize;
        if root == i {
            roots.push(i);
        }
        let acc = &mut accumulators[root];
        acc.count += 1;
        acc.q_sum += d.q;
        acc.weighted_row += d.q * d.row as f32;
        acc.weighted_col += d.q * d.col as f32;
        acc.weighted_scale += d.q * d.scale as f32;
        acc.row_sum += d.row as f32;
        acc.col_sum += d.col as f32;
        acc.scale_sum += d.scale as f32;
    }

    roots
        .iter()
        .map(|&root| {
            let acc = &accumulators[root];
            // a zero score sum has nothing to weight by; average plainly
            let (row, col, scale) = if acc.q_sum != 0.0 {
                (
                    acc.weighted_row / acc.q_sum,
                    acc.weighted_col / acc.q_sum,
                    acc.weighted_scale / acc.q_sum,
                )
            } else {
                let n = acc.count as f32;
                (acc.row_sum / n, acc.col_sum / n, acc.scale_sum / n)
            };
            Detection {
                row: row.round() as i32,
                col: col.round() as i32,
                scale: scale.round() as u32,
                q: acc.q_sum,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(row: i32, col: i32, scale: u32, q: f32) -> Detection {
        Detection { row, col, scale, q }
    }

    #[test]
    fn iou_of_identical_squares_is_one() {
        let a = det(50, 50, 40, 1.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_squares_is_zero() {
        let a = det(50, 50, 20, 1.0);
        let b = det(50, 100, 20, 1.0);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn iou_of_half_shifted_squares() {
        // 20-boxes offset by 10 columns: intersection 10x20 = 200,
        // union 400 + 400 - 200 = 600
        let a = det(50, 50, 20, 1.0);
        let b = det(50, 60, 20, 1.0);
        assert!((iou(&a, &b) - 200.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_zero_sized_squares_is_zero() {
        let a = det(10, 10, 0, 1.0);
        let b = det(10, 10, 0, 1.0);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(cluster_detections(&[], 0.2).is_empty());
    }

    #[test]
    fn far_apart_detections_stay_separate() {
        let input = [det(30, 30, 20, 2.0), det(30, 120, 20, 3.0)];
        let out = cluster_detections(&input, 0.2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], input[0]);
        assert_eq!(out[1], input[1]);
    }

    #[test]
    fn heavy_overlap_collapses_to_weighted_mean() {
        // ~80% overlapping pair; q 1.0 and 3.0 pull the center 3:1
        let input = [det(100, 100, 40, 1.0), det(100, 104, 40, 3.0)];
        let out = cluster_detections(&input, 0.2);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].row, 100);
        assert_eq!(out[0].col, 103); // (1*100 + 3*104) / 4
        assert_eq!(out[0].scale, 40);
        assert!((out[0].q - 4.0).abs() < 1e-6);
    }

    #[test]
    fn membership_is_transitive() {
        // a overlaps b, b overlaps c, a and c barely overlap: one cluster
        let input = [
            det(50, 50, 30, 1.0),
            det(50, 60, 30, 1.0),
            det(50, 70, 30, 1.0),
        ];
        let out = cluster_detections(&input, 0.2);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].col, 60);
        assert_eq!(out[0].q, 3.0);
    }

    #[test]
    fn threshold_at_or_above_one_keeps_everything() {
        let input = [
            det(50, 50, 30, 1.0),
            det(50, 50, 30, 2.0),
            det(52, 51, 30, 0.5),
        ];
        // even identical boxes (IoU exactly 1.0) are not joined
        let out = cluster_detections(&input, 1.0);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], input[0]);
        assert_eq!(out[1], input[1]);
        assert_eq!(out[2], input[2]);

        // out-of-range thresholds clamp to the nearest endpoint
        assert_eq!(cluster_detections(&input, 7.5), out);
    }

    #[test]
    fn threshold_at_or_below_zero_joins_any_overlap() {
        let input = [
            det(50, 50, 20, 1.0),
            det(55, 55, 20, 1.0),
            det(58, 52, 20, 1.0),
            // no overlap with the others
            det(50, 200, 20, 1.0),
        ];
        let out = cluster_detections(&input, 0.0);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], input[3]);

        assert_eq!(cluster_detections(&input, -3.0), out);
    }

    #[test]
    fn clustering_is_idempotent_on_separated_clusters() {
        let input = [
            det(40, 40, 30, 2.0),
            det(40, 44, 30, 1.0),
            det(150, 150, 30, 4.0),
            det(150, 146, 28, 1.0),
        ];
        let once = cluster_detections(&input, 0.2);
        assert_eq!(once.len(), 2);
        let twice = cluster_detections(&once, 0.2);
        assert_eq!(twice, once);
    }

    #[test]
    fn output_follows_earliest_member_order() {
        // the second raw detection belongs to the cluster rooted at the
        // first, so the far-away third one comes out second
        let input = [
            det(60, 60, 30, 1.0),
            det(200, 200, 30, 5.0),
            det(60, 64, 30, 1.0),
        ];
        let out = cluster_detections(&input, 0.2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].col, 62); // mean of 60 and 64
        assert_eq!(out[1], input[1]);
    }

    #[test]
    fn zero_weight_cluster_falls_back_to_plain_mean() {
        let input = [det(10, 20, 30, 0.0), det(10, 24, 30, 0.0)];
        let out = cluster_detections(&input, 0.2);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].col, 22);
        assert_eq!(out[0].q, 0.0);
    }
}
