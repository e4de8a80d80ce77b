//! Isolation forest over one-dimensional bucket volumes
//!
//! Each tree recursively partitions a random subsample at uniformly drawn
//! split points. Values that separate from the rest in few splits get short
//! path lengths and therefore high anomaly scores.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Largest subsample drawn per tree
pub const MAX_SAMPLES: usize = 256;

enum Node {
    Leaf {
        size: usize,
    },
    Split {
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn build(values: &[f64], depth: usize, depth_limit: usize, rng: &mut StdRng) -> Node {
        if depth >= depth_limit || values.len() <= 1 {
            return Node::Leaf { size: values.len() };
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max <= min {
            // Identical values cannot be separated
            return Node::Leaf { size: values.len() };
        }

        let threshold = rng.gen_range(min..max);
        let (left, right): (Vec<f64>, Vec<f64>) = values.iter().partition(|v| **v < threshold);

        Node::Split {
            threshold,
            left: Box::new(Node::build(&left, depth + 1, depth_limit, rng)),
            right: Box::new(Node::build(&right, depth + 1, depth_limit, rng)),
        }
    }

    fn path_length(&self, value: f64, depth: usize) -> f64 {
        match self {
            Node::Leaf { size } => depth as f64 + average_path_length(*size),
            Node::Split {
                threshold,
                left,
                right,
            } => {
                if value < *threshold {
                    left.path_length(value, depth + 1)
                } else {
                    right.path_length(value, depth + 1)
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

pub struct IsolationForest {
    trees: Vec<Node>,
    sample_size: usize,
}

impl IsolationForest {
    /// Train on `values` (needs at least one value to be meaningful)
    pub fn fit(values: &[f64], n_trees: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let sample_size = values.len().min(MAX_SAMPLES);
        let depth_limit = (sample_size.max(2) as f64).log2().ceil() as usize;

        let trees = (0..n_trees)
            .map(|_| {
                let sample: Vec<f64> = values
                    .choose_multiple(&mut rng, sample_size)
                    .copied()
                    .collect();
                Node::build(&sample, 0, depth_limit, &mut rng)
            })
            .collect();

        Self { trees, sample_size }
    }

    /// Anomaly score in (0, 1]; values near 1 are isolated quickly
    pub fn score(&self, value: f64) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }

        let mean_path = self
            .trees
            .iter()
            .map(|tree| tree.path_length(value, 0))
            .sum::<f64>()
            / self.trees.len() as f64;

        let normalizer = average_path_length(self.sample_size);
        if normalizer <= 0.0 {
            return 0.5;
        }

        2f64.powf(-mean_path / normalizer)
    }
}
