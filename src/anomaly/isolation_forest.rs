//! Isolation forest outlier model
//!
//! Random axis-aligned splits isolate unusual points in fewer steps than
//! typical ones. The anomaly score is `2^(-E[h(x)] / c(psi))` where `h` is
//! the path length in a tree grown on a sub-sample of size `psi`; scores
//! near 1 are anomalous, scores well below 0.5 are normal.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

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

#[derive(Debug)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn path_length<const D: usize>(&self, point: &[f64; D], depth: usize) -> f64 {
        match self {
            Node::Leaf { size } => depth as f64 + average_path_length(*size),
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if point[*feature] < *threshold {
                    left.path_length(point, depth + 1)
                } else {
                    right.path_length(point, depth + 1)
                }
            }
        }
    }
}

/// Model parameters
#[derive(Debug, Clone)]
pub struct IsolationForest {
    pub n_trees: usize,
    pub sample_size: usize,
    /// Expected fraction of outliers, in (0, 0.5]
    pub contamination: f64,
    pub seed: Option<u64>,
}

/// Per-point model output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub score: f64,
    pub outlier: bool,
}

struct Forest {
    trees: Vec<Node>,
    psi: usize,
}

impl IsolationForest {
    /// Fit on `data` and label every point of it.
    ///
    /// Fewer than two points cannot be scored; they come back as normal
    /// with a neutral score of 0.5.
    pub fn fit_predict<const D: usize>(&self, data: &[[f64; D]]) -> Vec<Prediction> {
        if data.len() < 2 {
            return data
                .iter()
                .map(|_| Prediction {
                    score: 0.5,
                    outlier: false,
                })
                .collect();
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let forest = self.fit(data, &mut rng);
        let scores: Vec<f64> = data.iter().map(|p| forest.score(p)).collect();
        let threshold = quantile(&scores, 1.0 - self.contamination);

        scores
            .into_iter()
            .map(|score| Prediction {
                score,
                outlier: score > threshold,
            })
            .collect()
    }

    fn fit<const D: usize>(&self, data: &[[f64; D]], rng: &mut StdRng) -> Forest {
        let psi = self.sample_size.min(data.len()).max(2);
        let height_limit = (psi as f64).log2().ceil() as usize;

        let trees = (0..self.n_trees.max(1))
            .map(|_| {
                let indices = sample(&mut *rng, data.len(), psi).into_vec();
                grow(data, indices, 0, height_limit, &mut *rng)
            })
            .collect();

        Forest { trees, psi }
    }
}

impl Forest {
    fn score<const D: usize>(&self, point: &[f64; D]) -> f64 {
        let mean_path = self
            .trees
            .iter()
            .map(|t| t.path_length(point, 0))
            .sum::<f64>()
            / self.trees.len() as f64;
        2f64.powf(-mean_path / average_path_length(self.psi))
    }
}

fn grow<const D: usize>(
    data: &[[f64; D]],
    indices: Vec<usize>,
    depth: usize,
    height_limit: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= height_limit || indices.len() <= 1 {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    // Only features that still vary inside this node can split it
    let mut splittable: Vec<(usize, f64, f64)> = Vec::with_capacity(D);
    for feature in 0..D {
        let (min, max) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
            let v = data[i][feature];
            (lo.min(v), hi.max(v))
        });
        if max > min {
            splittable.push((feature, min, max));
        }
    }

    if splittable.is_empty() {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let (feature, min, max) = splittable[rng.gen_range(0..splittable.len())];
    let threshold = rng.gen_range(min..max);

    let (left, right): (Vec<usize>, Vec<usize>) =
        indices.into_iter().partition(|&i| data[i][feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(data, left, depth + 1, height_limit, &mut *rng)),
        right: Box::new(grow(data, right, depth + 1, height_limit, rng)),
    }
}

/// Linear-interpolated quantile, `q` in [0, 1]
fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
