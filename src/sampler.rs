//! # Quasi-random latent sampling by clustered normal draws
//!
//! Instead of drawing `k` independent standard-normal vectors, the
//! [`ClusteredNormalSampler`] draws a large pool of normal vectors, clusters it into
//! `k` groups with k-means, and returns the (shrunk) centroids. The `k` returned
//! points cover the normal distribution more evenly than `k` raw draws, which
//! stabilizes best-of-`k` evaluation.
//!
//! ## Caching
//! -----------------
//! Fitting k-means is expensive. With `fast_sample` enabled, every fitted centroid set
//! is appended to a cache; once the cache holds more than `capacity` sets, calls
//! return sets drawn uniformly with replacement from the first `capacity` cached ones
//! and no longer fit anything. The cache is tied to one `(k, d)` shape: asking for
//! another shape drops it.
//!
//! ## Example
//! -----------------
//! ```rust
//! use pedgraph::sampler::{ClusteredNormalSampler, LatentSampler};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut sampler = ClusteredNormalSampler::new(StdRng::seed_from_u64(42)).with_pool_size(200);
//! let z = sampler.randn(3, 20, 2).unwrap();
//! assert_eq!(z.shape(), &[3, 20, 2]);
//! ```
use ndarray::{Array2, Array3, ArrayView1, ArrayView2};
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::debug;

use crate::{
    constants::{KMEANS_MAX_ITER, KMEANS_TOL, SAMPLER_CAPACITY, SAMPLER_POOL_SIZE, SAMPLER_SCALE},
    pedgraph_errors::PedGraphError,
};

/// Source of latent draws `[n, k, d]`.
pub trait LatentSampler {
    /// Produce `n` sets of `k` points in dimension `d`.
    fn randn(&mut self, n: usize, k: usize, d: usize) -> Result<Array3<f64>, PedGraphError>;
}

/// K-means based latent sampler owning its random generator.
#[derive(Debug, Clone)]
pub struct ClusteredNormalSampler<R: Rng> {
    rng: R,
    capacity: usize,
    pool_size: usize,
    scale: f64,
    fast_sample: bool,
    cache: Vec<Array2<f64>>,
    cache_shape: Option<(usize, usize)>,
}

impl<R: Rng> ClusteredNormalSampler<R> {
    /// Sampler with the default settings: capacity 1000, pools of 1000 draws,
    /// centroids scaled by 0.8, caching enabled.
    pub fn new(rng: R) -> Self {
        ClusteredNormalSampler {
            rng,
            capacity: SAMPLER_CAPACITY,
            pool_size: SAMPLER_POOL_SIZE,
            scale: SAMPLER_SCALE,
            fast_sample: true,
            cache: Vec::new(),
            cache_shape: None,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn fast_sample(mut self, enabled: bool) -> Self {
        self.fast_sample = enabled;
        self
    }

    /// Number of centroid sets currently cached.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.cache_shape = None;
    }

    /// Fit centroid sets of shape `(k, d)` until the cache exceeds `capacity`.
    ///
    /// Does nothing when caching is disabled.
    pub fn refill(&mut self, k: usize, d: usize) -> Result<(), PedGraphError> {
        if !self.fast_sample {
            return Ok(());
        }
        self.prepare(k, d)?;
        let missing = (self.capacity + 1).saturating_sub(self.cache.len());
        for _ in 0..missing {
            let centroids = self.fit_centroids(k, d);
            self.cache.push(centroids);
        }
        debug!(k, d, cached = self.cache.len(), "sampler cache refilled");
        Ok(())
    }

    fn prepare(&mut self, k: usize, d: usize) -> Result<(), PedGraphError> {
        if k == 0 || d == 0 {
            return Err(PedGraphError::InvalidSamplerParameter(format!(
                "k and d must be >= 1 (got k={k}, d={d})"
            )));
        }
        if k > self.pool_size {
            return Err(PedGraphError::InvalidSamplerParameter(format!(
                "k={k} exceeds the pool size {}",
                self.pool_size
            )));
        }
        if self.cache_shape != Some((k, d)) {
            if !self.cache.is_empty() {
                debug!(k, d, dropped = self.cache.len(), "sampler shape changed, cache dropped");
            }
            self.cache.clear();
            self.cache_shape = Some((k, d));
        }
        Ok(())
    }

    fn fit_centroids(&mut self, k: usize, d: usize) -> Array2<f64> {
        let rng = &mut self.rng;
        let pool =
            Array2::from_shape_fn((self.pool_size, d), |_| rng.sample::<f64, _>(StandardNormal));
        let mut centroids = kmeans(pool.view(), k, &mut self.rng);
        centroids *= self.scale;
        centroids
    }
}

impl<R: Rng> LatentSampler for ClusteredNormalSampler<R> {
    fn randn(&mut self, n: usize, k: usize, d: usize) -> Result<Array3<f64>, PedGraphError> {
        self.prepare(k, d)?;
        let mut out = Array3::zeros((n, k, d));

        if self.fast_sample && self.cache.len() > self.capacity {
            let upper = self.capacity.max(1);
            for mut slot in out.outer_iter_mut() {
                let pick = self.rng.random_range(0..upper);
                slot.assign(&self.cache[pick]);
            }
            return Ok(out);
        }

        for mut slot in out.outer_iter_mut() {
            let centroids = self.fit_centroids(k, d);
            slot.assign(&centroids);
            if self.fast_sample {
                self.cache.push(centroids);
            }
        }
        Ok(out)
    }
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest_centroid(point: ArrayView1<'_, f64>, centroids: &Array2<f64>) -> (usize, f64) {
    centroids
        .outer_iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(point, c)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

/// k-means++ seeding: first center uniform, then proportional to the squared distance
/// to the closest chosen center.
fn kmeans_plus_plus_init<R: Rng>(
    points: ArrayView2<'_, f64>,
    k: usize,
    rng: &mut R,
) -> Array2<f64> {
    let (n, d) = points.dim();
    let mut centroids = Array2::zeros((k, d));
    let first = rng.random_range(0..n);
    centroids.row_mut(0).assign(&points.row(first));

    let mut closest: Vec<f64> = points
        .outer_iter()
        .map(|p| squared_distance(p, centroids.row(0)))
        .collect();

    for c in 1..k {
        let total: f64 = closest.iter().sum();
        let selected = if total > 0.0 {
            let target = rng.random_range(0.0..total);
            let mut cumsum = 0.0;
            closest
                .iter()
                .position(|&w| {
                    cumsum += w;
                    cumsum > target
                })
                .unwrap_or(n - 1)
        } else {
            rng.random_range(0..n)
        };
        centroids.row_mut(c).assign(&points.row(selected));

        for (dist, p) in closest.iter_mut().zip(points.outer_iter()) {
            *dist = dist.min(squared_distance(p, centroids.row(c)));
        }
    }
    centroids
}

/// Lloyd's algorithm from a k-means++ seeding.
///
/// Iterates until the total squared centroid shift falls below
/// [`KMEANS_TOL`] or [`KMEANS_MAX_ITER`] iterations. A cluster left empty keeps its
/// previous center.
///
/// Return
/// ----------
/// * The `[k, d]` centroids. Requires `1 <= k <= points.nrows()`.
pub fn kmeans<R: Rng>(points: ArrayView2<'_, f64>, k: usize, rng: &mut R) -> Array2<f64> {
    let d = points.ncols();
    let mut centroids = kmeans_plus_plus_init(points, k, rng);

    for _ in 0..KMEANS_MAX_ITER {
        let mut sums = Array2::<f64>::zeros((k, d));
        let mut counts = vec![0usize; k];
        for p in points.outer_iter() {
            let (cluster, _) = nearest_centroid(p, &centroids);
            let mut row = sums.row_mut(cluster);
            row += &p;
            counts[cluster] += 1;
        }

        let mut shift = 0.0;
        for (i, (mut center, sum)) in centroids
            .outer_iter_mut()
            .zip(sums.outer_iter())
            .enumerate()
        {
            if counts[i] == 0 {
                continue;
            }
            let updated = &sum / counts[i] as f64;
            shift += squared_distance(center.view(), updated.view());
            center.assign(&updated);
        }

        if shift <= KMEANS_TOL {
            break;
        }
    }
    centroids
}

#[cfg(test)]
mod sampler_test {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn small_sampler(seed: u64) -> ClusteredNormalSampler<StdRng> {
        ClusteredNormalSampler::new(StdRng::seed_from_u64(seed))
            .with_capacity(3)
            .with_pool_size(60)
    }

    #[test]
    fn test_shape_and_cache_growth() {
        let mut sampler = small_sampler(1);
        let z = sampler.randn(2, 5, 2).unwrap();
        assert_eq!(z.shape(), &[2, 5, 2]);
        assert_eq!(sampler.cached_len(), 2);
        assert!(z.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_fast_path_reuses_first_capacity_sets() {
        let mut sampler = small_sampler(2);
        sampler.refill(4, 2).unwrap();
        assert_eq!(sampler.cached_len(), 4);

        let z = sampler.randn(10, 4, 2).unwrap();
        assert_eq!(sampler.cached_len(), 4);
        for set in z.outer_iter() {
            assert!(sampler.cache[..3].iter().any(|c| c.view() == set));
        }
    }

    #[test]
    fn test_no_cache_without_fast_sample() {
        let mut sampler = small_sampler(3).fast_sample(false);
        sampler.randn(3, 2, 2).unwrap();
        sampler.refill(2, 2).unwrap();
        assert_eq!(sampler.cached_len(), 0);
    }

    #[test]
    fn test_shape_change_invalidates_cache() {
        let mut sampler = small_sampler(4);
        sampler.refill(3, 2).unwrap();
        assert_eq!(sampler.cached_len(), 4);
        let z = sampler.randn(1, 2, 3).unwrap();
        assert_eq!(z.shape(), &[1, 2, 3]);
        assert_eq!(sampler.cached_len(), 1);
        sampler.clear();
        assert_eq!(sampler.cached_len(), 0);
    }

    #[test]
    fn test_invalid_parameters() {
        let mut sampler = small_sampler(5);
        assert!(matches!(
            sampler.randn(1, 0, 2),
            Err(PedGraphError::InvalidSamplerParameter(_))
        ));
        assert!(sampler.randn(1, 2, 0).is_err());
        assert!(sampler.randn(1, 61, 2).is_err());
    }

    #[test]
    fn test_same_seed_same_draws() {
        let a = small_sampler(9).randn(2, 4, 2).unwrap();
        let b = small_sampler(9).randn(2, 4, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_kmeans_finds_separated_clusters() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut points = Array2::zeros((40, 2));
        for (i, mut p) in points.outer_iter_mut().enumerate() {
            let base = if i < 20 { -5.0 } else { 5.0 };
            p[0] = base + 0.01 * (i % 5) as f64;
            p[1] = base;
        }
        let mut centers: Vec<f64> = kmeans(points.view(), 2, &mut rng).column(0).to_vec();
        centers.sort_by(f64::total_cmp);
        assert!((centers[0] + 4.98).abs() < 1e-9);
        assert!((centers[1] - 5.02).abs() < 1e-9);
    }

    #[test]
    fn test_single_cluster_is_scaled_pool_mean() {
        let mut sampler = ClusteredNormalSampler::new(StdRng::seed_from_u64(11)).fast_sample(false);
        let z = sampler.randn(1, 1, 2).unwrap();
        // mean of 1000 standard normals, shrunk by 0.8
        assert!(z.iter().all(|v| v.abs() < 0.2));
    }
}
