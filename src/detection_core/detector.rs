//! Outlier flagging with a contamination threshold

use super::scorer::IsolationForest;
use super::window::TrafficBucket;

/// Added per unit of z-score so equally isolated buckets rank by volume
const DEVIATION_TIE_BREAK: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredBucket {
    pub bucket: TrafficBucket,
    pub score: f64,
    pub is_outlier: bool,
}

/// Result of one evaluation, tied to the traffic that was live at the time
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyEvent {
    pub bucket: TrafficBucket,
    pub is_outlier: bool,
    /// (src, dst) of the most recent externally routed record
    pub recent_external: Option<(String, String)>,
}

pub struct AnomalyDetector {
    contamination: f64,
    n_trees: usize,
    seed: u64,
}

impl AnomalyDetector {
    pub fn new(contamination: f64) -> Self {
        Self {
            contamination,
            n_trees: 100,
            seed: 42,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(0.10)
    }

    pub fn with_trees(mut self, n_trees: usize, seed: u64) -> Self {
        self.n_trees = n_trees;
        self.seed = seed;
        self
    }

    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    /// Score every bucket in the window against a freshly trained forest
    ///
    /// Returns an empty vec for fewer than two buckets. A window with no
    /// volume variation has no outliers.
    ///
    /// Buckets the forest isolates equally are ranked by signed deviation
    /// from the window mean, so the higher volume always wins the tie. In a
    /// two-bucket window the larger bucket is flagged whether the traffic
    /// rose or fell: `{50000, 200}` flags the older 50000 bucket, not the
    /// drop.
    pub fn score(&self, buckets: &[TrafficBucket]) -> Vec<ScoredBucket> {
        if buckets.len() < 2 {
            return Vec::new();
        }

        let volumes: Vec<f64> = buckets.iter().map(|b| b.bytes as f64).collect();
        let n = volumes.len() as f64;
        let mean = volumes.iter().sum::<f64>() / n;
        let std = (volumes.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();

        if std == 0.0 {
            return buckets
                .iter()
                .map(|bucket| ScoredBucket {
                    bucket: bucket.clone(),
                    score: 0.5,
                    is_outlier: false,
                })
                .collect();
        }

        let forest = IsolationForest::fit(&volumes, self.n_trees, self.seed);
        let scores: Vec<f64> = volumes
            .iter()
            .map(|v| forest.score(*v) + DEVIATION_TIE_BREAK * (v - mean) / std)
            .collect();

        let threshold = quantile(&scores, 1.0 - self.contamination);

        buckets
            .iter()
            .zip(scores)
            .map(|(bucket, score)| ScoredBucket {
                bucket: bucket.clone(),
                score,
                is_outlier: score > threshold,
            })
            .collect()
    }

    /// Buckets flagged in the current window, in key order
    pub fn outliers(&self, buckets: &[TrafficBucket]) -> Vec<TrafficBucket> {
        self.score(buckets)
            .into_iter()
            .filter(|scored| scored.is_outlier)
            .map(|scored| scored.bucket)
            .collect()
    }
}

/// Linearly interpolated quantile, `q` in [0, 1]
fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}
