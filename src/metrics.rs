//! Clustering evaluation scores.
//!
//! The clustering algorithms never score their own output — the sweep
//! optimizer in [`crate::sweep`] takes an external callback. These free
//! functions are ready-made callbacks for it, plus supervised agreement
//! measures for evaluating against ground-truth labels.
//!
//! | Score | Needs truth | Better |
//! |-------|-------------|--------|
//! | [`wcss`] | no | lower |
//! | [`calinski_harabasz`] | no | higher |
//! | [`davies_bouldin`] | no | lower |
//! | [`xie_beni`] (fuzzy) | no | lower |
//! | [`purity`] | yes | higher |
//! | [`ari`] | yes | higher |
//!
//! Invalid input (length mismatch, empty slices) yields 0.0 rather than
//! panicking, so a sweep over odd candidates degrades instead of dying.

use std::collections::HashMap;

use ndarray::Array2;

/// Within-cluster sum of squares: total squared distance from each point
/// to its assigned centroid. The quantity K-means minimizes.
pub fn wcss(data: &[Vec<f32>], labels: &[usize], centroids: &Array2<f64>) -> f64 {
    if data.len() != labels.len() {
        return 0.0;
    }

    data.iter()
        .zip(labels.iter())
        .map(|(point, &label)| {
            point
                .iter()
                .zip(centroids.row(label).iter())
                .map(|(x, c)| {
                    let diff = *x as f64 - c;
                    diff * diff
                })
                .sum::<f64>()
        })
        .sum()
}

/// Calinski-Harabasz score (variance ratio criterion).
///
/// Ratio of between-cluster to within-cluster dispersion, scaled by
/// (n − k)/(k − 1). Higher means denser, better-separated clusters.
/// Returns 0.0 for fewer than 2 clusters or when within-cluster
/// dispersion vanishes.
pub fn calinski_harabasz(data: &[Vec<f32>], labels: &[usize]) -> f64 {
    let n = data.len();
    if n == 0 || n != labels.len() {
        return 0.0;
    }
    let d = data[0].len();

    let means = cluster_means(data, labels, d);
    let k = means.len();
    if k < 2 || n <= k {
        return 0.0;
    }

    // Overall mean.
    let mut overall = vec![0.0f64; d];
    for point in data {
        for (j, x) in point.iter().enumerate() {
            overall[j] += *x as f64;
        }
    }
    for v in overall.iter_mut() {
        *v /= n as f64;
    }

    let mut between = 0.0;
    for (mean, count) in means.values() {
        let sq: f64 = mean
            .iter()
            .zip(overall.iter())
            .map(|(m, o)| (m - o) * (m - o))
            .sum();
        between += *count as f64 * sq;
    }

    let mut within = 0.0;
    for (point, label) in data.iter().zip(labels.iter()) {
        let (mean, _) = &means[label];
        within += point
            .iter()
            .zip(mean.iter())
            .map(|(x, m)| {
                let diff = *x as f64 - m;
                diff * diff
            })
            .sum::<f64>();
    }

    if within == 0.0 {
        return 0.0;
    }

    (between / within) * ((n - k) as f64 / (k - 1) as f64)
}

/// Davies-Bouldin score.
///
/// For every cluster, the worst-case ratio of summed scatters to centroid
/// separation against any other cluster, averaged. Lower is better; 0 is
/// ideal. Returns 0.0 for fewer than 2 clusters.
pub fn davies_bouldin(data: &[Vec<f32>], labels: &[usize]) -> f64 {
    let n = data.len();
    if n == 0 || n != labels.len() {
        return 0.0;
    }
    let d = data[0].len();

    let means = cluster_means(data, labels, d);
    let ids: Vec<usize> = means.keys().copied().collect();
    let k = ids.len();
    if k < 2 {
        return 0.0;
    }

    // Mean distance of each cluster's points to its centroid.
    let mut scatter: HashMap<usize, f64> = ids.iter().map(|&id| (id, 0.0)).collect();
    for (point, label) in data.iter().zip(labels.iter()) {
        let (mean, _) = &means[label];
        let dist = point
            .iter()
            .zip(mean.iter())
            .map(|(x, m)| {
                let diff = *x as f64 - m;
                diff * diff
            })
            .sum::<f64>()
            .sqrt();
        if let Some(s) = scatter.get_mut(label) {
            *s += dist;
        }
    }
    for id in &ids {
        let count = means[id].1 as f64;
        if let Some(s) = scatter.get_mut(id) {
            *s /= count;
        }
    }

    let mut total = 0.0;
    for &i in &ids {
        let mut worst = 0.0f64;
        for &j in &ids {
            if i == j {
                continue;
            }
            let separation: f64 = means[&i]
                .0
                .iter()
                .zip(means[&j].0.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt();
            if separation > 0.0 {
                worst = worst.max((scatter[&i] + scatter[&j]) / separation);
            }
        }
        total += worst;
    }

    total / k as f64
}

/// Xie-Beni index for a fuzzy partition.
///
/// Compactness (the fuzzy objective with exponent `m`) over separation
/// (n times the minimum squared centroid distance). Lower is better.
/// Returns `f64::INFINITY` when two centroids coincide.
pub fn xie_beni(data: &[Vec<f32>], memberships: &Array2<f64>, centroids: &Array2<f64>, m: f64) -> f64 {
    let n = data.len();
    let k = centroids.nrows();
    if n == 0 || memberships.ncols() != n || memberships.nrows() != k {
        return 0.0;
    }

    let mut compactness = 0.0;
    for (i, point) in data.iter().enumerate() {
        for c in 0..k {
            let sq: f64 = point
                .iter()
                .zip(centroids.row(c).iter())
                .map(|(x, v)| {
                    let diff = *x as f64 - v;
                    diff * diff
                })
                .sum();
            compactness += memberships[[c, i]].powf(m) * sq;
        }
    }

    let mut min_sep = f64::MAX;
    for a in 0..k {
        for b in (a + 1)..k {
            let sq: f64 = centroids
                .row(a)
                .iter()
                .zip(centroids.row(b).iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum();
            min_sep = min_sep.min(sq);
        }
    }

    if min_sep == 0.0 || min_sep == f64::MAX {
        return f64::INFINITY;
    }

    compactness / (n as f64 * min_sep)
}

/// Purity: fraction of points whose cluster's majority class is their own.
///
/// Simple to read but biased toward many small clusters — purity 1.0 is
/// trivially reached with one cluster per point.
pub fn purity(pred: &[usize], truth: &[usize]) -> f64 {
    if pred.len() != truth.len() || pred.is_empty() {
        return 0.0;
    }

    let mut per_cluster: HashMap<usize, HashMap<usize, usize>> = HashMap::new();
    for (&p, &t) in pred.iter().zip(truth.iter()) {
        *per_cluster.entry(p).or_default().entry(t).or_insert(0) += 1;
    }

    let majority_total: usize = per_cluster
        .values()
        .map(|classes| classes.values().copied().max().unwrap_or(0))
        .sum();

    majority_total as f64 / pred.len() as f64
}

/// Adjusted Rand Index.
///
/// Pair-counting agreement between two clusterings, corrected for chance:
/// 1.0 for identical partitions (up to relabeling), ~0.0 for random ones,
/// negative for worse-than-random.
pub fn ari(pred: &[usize], truth: &[usize]) -> f64 {
    if pred.len() != truth.len() || pred.is_empty() {
        return 0.0;
    }

    let mut joint: HashMap<(usize, usize), u64> = HashMap::new();
    let mut rows: HashMap<usize, u64> = HashMap::new();
    let mut cols: HashMap<usize, u64> = HashMap::new();
    for (&p, &t) in pred.iter().zip(truth.iter()) {
        *joint.entry((p, t)).or_insert(0) += 1;
        *rows.entry(p).or_insert(0) += 1;
        *cols.entry(t).or_insert(0) += 1;
    }

    let sum_joint: f64 = joint.values().map(|&c| comb2(c)).sum();
    let sum_rows: f64 = rows.values().map(|&c| comb2(c)).sum();
    let sum_cols: f64 = cols.values().map(|&c| comb2(c)).sum();
    let total_pairs = comb2(pred.len() as u64);

    if total_pairs == 0.0 {
        return 0.0;
    }

    let expected = sum_rows * sum_cols / total_pairs;
    let max_index = 0.5 * (sum_rows + sum_cols);

    // Both partitions trivial (all singletons or all one cluster).
    if (max_index - expected).abs() < f64::EPSILON {
        return 1.0;
    }

    (sum_joint - expected) / (max_index - expected)
}

/// Number of unordered pairs from `x` items.
fn comb2(x: u64) -> f64 {
    x as f64 * (x as f64 - 1.0) / 2.0
}

/// Per-cluster mean vector and point count.
fn cluster_means(
    data: &[Vec<f32>],
    labels: &[usize],
    d: usize,
) -> HashMap<usize, (Vec<f64>, usize)> {
    let mut means: HashMap<usize, (Vec<f64>, usize)> = HashMap::new();
    for (point, &label) in data.iter().zip(labels.iter()) {
        let entry = means.entry(label).or_insert_with(|| (vec![0.0; d], 0));
        for (j, x) in point.iter().enumerate() {
            entry.0[j] += *x as f64;
        }
        entry.1 += 1;
    }
    for (mean, count) in means.values_mut() {
        for v in mean.iter_mut() {
            *v /= *count as f64;
        }
    }
    means
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_wcss_hand_computed() {
        let data = vec![vec![0.0, 0.0], vec![2.0, 0.0], vec![10.0, 0.0]];
        let labels = vec![0, 0, 1];
        let centroids = array![[1.0, 0.0], [10.0, 0.0]];

        // Two points at distance 1 from their centroid, one at 0.
        assert!((wcss(&data, &labels, &centroids) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_calinski_harabasz_prefers_true_split() {
        let data = vec![
            vec![0.0, 0.0],
            vec![0.2, 0.0],
            vec![0.0, 0.2],
            vec![10.0, 10.0],
            vec![10.2, 10.0],
            vec![10.0, 10.2],
        ];
        let good = vec![0, 0, 0, 1, 1, 1];
        let bad = vec![0, 1, 0, 1, 0, 1];

        assert!(calinski_harabasz(&data, &good) > calinski_harabasz(&data, &bad));
    }

    #[test]
    fn test_calinski_harabasz_single_cluster_is_zero() {
        let data = vec![vec![0.0], vec![1.0], vec![2.0]];
        assert_eq!(calinski_harabasz(&data, &[0, 0, 0]), 0.0);
    }

    #[test]
    fn test_davies_bouldin_prefers_true_split() {
        let data = vec![
            vec![0.0, 0.0],
            vec![0.2, 0.0],
            vec![10.0, 10.0],
            vec![10.2, 10.0],
        ];
        let good = vec![0, 0, 1, 1];
        let bad = vec![0, 1, 0, 1];

        assert!(davies_bouldin(&data, &good) < davies_bouldin(&data, &bad));
    }

    #[test]
    fn test_xie_beni_lower_for_crisp_fit() {
        let data = vec![vec![0.0, 0.0], vec![10.0, 10.0]];
        let centroids = array![[0.0, 0.0], [10.0, 10.0]];

        let crisp = array![[1.0, 0.0], [0.0, 1.0]];
        let vague = array![[0.6, 0.4], [0.4, 0.6]];

        let crisp_score = xie_beni(&data, &crisp, &centroids, 2.0);
        let vague_score = xie_beni(&data, &vague, &centroids, 2.0);
        assert!(crisp_score < vague_score);
        assert_eq!(crisp_score, 0.0);
    }

    #[test]
    fn test_xie_beni_coincident_centroids_is_infinite() {
        let data = vec![vec![0.0], vec![1.0]];
        let centroids = array![[0.5], [0.5]];
        let memberships = array![[0.5, 0.5], [0.5, 0.5]];

        assert_eq!(xie_beni(&data, &memberships, &centroids, 2.0), f64::INFINITY);
    }

    #[test]
    fn test_purity_perfect_and_mixed() {
        assert_eq!(purity(&[0, 0, 1, 1], &[1, 1, 0, 0]), 1.0);
        assert_eq!(purity(&[0, 0, 0, 0], &[0, 0, 1, 1]), 0.5);
    }

    #[test]
    fn test_ari_identical_up_to_relabeling() {
        assert!((ari(&[0, 0, 1, 1], &[1, 1, 0, 0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ari_disagreement_below_agreement() {
        let truth = [0, 0, 0, 1, 1, 1];
        let close = [0, 0, 1, 1, 1, 1];
        let far = [0, 1, 0, 1, 0, 1];

        assert!(ari(&close, &truth) > ari(&far, &truth));
    }

    #[test]
    fn test_length_mismatch_returns_zero() {
        assert_eq!(purity(&[0, 1], &[0]), 0.0);
        assert_eq!(ari(&[0, 1], &[0]), 0.0);
        assert_eq!(calinski_harabasz(&[vec![0.0]], &[0, 1]), 0.0);
    }
}
