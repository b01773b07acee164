//! Bounded 1-D k-means, used by the k-means binning strategy.

use crate::constants::KMEANS_MAX_ITERATIONS;

/// Clustering output: one cluster index per input point, and the final
/// centroid per cluster. Centroids are in initialization order, not
/// sorted — callers that need rating order sort by centroid value.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    pub assignments: Vec<usize>,
    pub centroids: Vec<f64>,
}

/// Cluster `data` into `k` groups along one dimension.
///
/// Centroids start evenly spaced across `[min, max]` (the midpoint for
/// k = 1), which makes the run deterministic — no random restarts.
/// An emptied cluster keeps its previous centroid instead of being
/// reinitialized; together with the iteration cap this guarantees
/// termination.
///
/// Contract: `k >= 1` and `data` non-empty. Callers validate sample
/// sizes before reaching this point.
pub fn kmeans_1d(data: &[f64], k: usize, max_iterations: usize) -> KMeansResult {
    assert!(k >= 1, "kmeans_1d requires at least one cluster");
    assert!(!data.is_empty(), "kmeans_1d requires at least one point");

    let min = data.iter().copied().fold(f64::INFINITY, f64::min);
    let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut centroids: Vec<f64> = if k == 1 {
        vec![(min + max) / 2.0]
    } else {
        (0..k)
            .map(|i| min + (max - min) * i as f64 / (k - 1) as f64)
            .collect()
    };

    let mut assignments = vec![0usize; data.len()];

    for _ in 0..max_iterations {
        // Assignment step: nearest centroid by absolute distance,
        // lowest index on ties.
        let mut changed = false;
        for (point_idx, &point) in data.iter().enumerate() {
            let mut best = 0;
            let mut best_dist = (point - centroids[0]).abs();
            for (cluster, &centroid) in centroids.iter().enumerate().skip(1) {
                let dist = (point - centroid).abs();
                if dist < best_dist {
                    best = cluster;
                    best_dist = dist;
                }
            }
            if assignments[point_idx] != best {
                assignments[point_idx] = best;
                changed = true;
            }
        }

        if !changed {
            break;
        }

        // Update step: each centroid moves to the mean of its points.
        let mut sums = vec![0.0f64; k];
        let mut counts = vec![0usize; k];
        for (point_idx, &point) in data.iter().enumerate() {
            sums[assignments[point_idx]] += point;
            counts[assignments[point_idx]] += 1;
        }
        for cluster in 0..k {
            if counts[cluster] > 0 {
                centroids[cluster] = sums[cluster] / counts[cluster] as f64;
            }
        }
    }

    KMeansResult {
        assignments,
        centroids,
    }
}

/// [`kmeans_1d`] with the default iteration cap.
pub fn kmeans_1d_capped(data: &[f64], k: usize) -> KMeansResult {
    kmeans_1d(data, k, KMEANS_MAX_ITERATIONS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_obvious_clusters() {
        let result = kmeans_1d(&[1.0, 2.0, 10.0, 11.0], 2, 100);
        assert_eq!(result.centroids.len(), 2);

        let mut sorted = result.centroids.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((sorted[0] - 1.5).abs() < 0.6);
        assert!((sorted[1] - 10.5).abs() < 0.6);

        // Points 0,1 together and 2,3 together.
        assert_eq!(result.assignments[0], result.assignments[1]);
        assert_eq!(result.assignments[2], result.assignments[3]);
        assert_ne!(result.assignments[0], result.assignments[2]);
    }

    #[test]
    fn single_cluster_uses_midpoint_start() {
        let result = kmeans_1d(&[0.0, 10.0], 1, 100);
        assert_eq!(result.centroids, vec![5.0]);
        assert_eq!(result.assignments, vec![0, 0]);
    }

    #[test]
    fn identical_points_terminate() {
        let result = kmeans_1d(&[3.0, 3.0, 3.0], 2, 100);
        assert_eq!(result.assignments.len(), 3);
        // All points land in one cluster; the other keeps its seed.
        let occupied = result.assignments[0];
        assert!(result.assignments.iter().all(|&a| a == occupied));
    }

    #[test]
    fn more_clusters_than_distinct_values() {
        let result = kmeans_1d(&[1.0, 1.0, 5.0], 3, 100);
        assert_eq!(result.centroids.len(), 3);
        assert_eq!(result.assignments.len(), 3);
    }

    #[test]
    fn iteration_cap_is_respected() {
        // Even with a cap of 1 the result is well-formed.
        let result = kmeans_1d(&[1.0, 2.0, 10.0, 11.0], 2, 1);
        assert_eq!(result.assignments.len(), 4);
        assert_eq!(result.centroids.len(), 2);
    }
}
