//! CART regression trees.
//!
//! Splits minimise the within-node sum of squared errors. Trees are the
//! building block of the forest and boosting families and are not exposed
//! as a family of their own.

use crate::error::{PipelineError, Result};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    pub max_depth: usize,
    /// Fewest rows a node needs to be split.
    pub min_samples_split: usize,
    /// Fewest rows allowed in each child.
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` uses all of them.
    pub max_features: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 15,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted regression tree stored as a flat node arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    n_features: usize,
    /// Total SSE reduction credited to each feature.
    importances: Vec<f64>,
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct Builder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    config: TreeConfig,
    rng: Option<&'a mut StdRng>,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl RegressionTree {
    /// Grow a tree on the rows listed in `indices` (repeats allowed, as in
    /// a bootstrap sample).
    ///
    /// `rng` drives per-split feature sub-sampling when
    /// `config.max_features` is set.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        indices: &[usize],
        config: TreeConfig,
        rng: Option<&mut StdRng>,
    ) -> Result<Self> {
        if indices.is_empty() {
            return Err(PipelineError::EmptyData);
        }
        let n_features = x.first().map_or(0, |r| r.len());
        if n_features == 0 {
            return Err(PipelineError::InvalidParameter("no feature columns".into()));
        }
        if config.min_samples_leaf == 0 {
            return Err(PipelineError::InvalidParameter(
                "min_samples_leaf must be at least 1".into(),
            ));
        }

        let mut builder = Builder {
            x,
            y,
            config,
            rng,
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };
        let mut idx = indices.to_vec();
        builder.grow(&mut idx, 0);

        Ok(Self {
            nodes: builder.nodes,
            n_features,
            importances: builder.importances,
        })
    }

    /// Predict a single row.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Unnormalised SSE reduction per feature.
    pub fn raw_importances(&self) -> &[f64] {
        &self.importances
    }

    /// Depth of the deepest leaf (a single leaf has depth 0).
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], at: usize) -> usize {
            match &nodes[at] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}

impl Builder<'_> {
    fn grow(&mut self, idx: &mut [usize], depth: usize) -> usize {
        let at = self.nodes.len();
        let mean = idx.iter().map(|&i| self.y[i]).sum::<f64>() / idx.len() as f64;
        self.nodes.push(Node::Leaf { value: mean });

        if depth >= self.config.max_depth
            || idx.len() < self.config.min_samples_split.max(2)
            || idx.len() < 2 * self.config.min_samples_leaf
        {
            return at;
        }

        let Some(split) = self.best_split(idx) else {
            return at;
        };

        let x = self.x;
        let mid = partition(idx, |i| x[i][split.feature] <= split.threshold);
        if mid == 0 || mid == idx.len() {
            return at;
        }
        self.importances[split.feature] += split.gain;
        let (left_idx, right_idx) = idx.split_at_mut(mid);
        let left = self.grow(left_idx, depth + 1);
        let right = self.grow(right_idx, depth + 1);
        self.nodes[at] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        at
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let k = self.importances.len();
        match (self.config.max_features, self.rng.as_deref_mut()) {
            (Some(m), Some(rng)) if m < k => {
                let mut picked = sample(rng, k, m.max(1)).into_vec();
                picked.sort_unstable();
                picked
            }
            _ => (0..k).collect(),
        }
    }

    fn best_split(&mut self, idx: &[usize]) -> Option<Split> {
        let n = idx.len();
        let min_leaf = self.config.min_samples_leaf;
        let total_sum: f64 = idx.iter().map(|&i| self.y[i]).sum();
        let total_sq: f64 = idx.iter().map(|&i| self.y[i] * self.y[i]).sum();
        let parent_sse = total_sq - total_sum * total_sum / n as f64;

        let mut best: Option<Split> = None;
        let mut order: Vec<usize> = idx.to_vec();

        for feature in self.candidate_features() {
            order.sort_by(|&a, &b| {
                self.x[a][feature]
                    .partial_cmp(&self.x[b][feature])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for pos in 0..n - 1 {
                let yi = self.y[order[pos]];
                left_sum += yi;
                left_sq += yi * yi;

                let left_n = pos + 1;
                let right_n = n - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }
                let here = self.x[order[pos]][feature];
                let next = self.x[order[pos + 1]][feature];
                if next <= here {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / left_n as f64)
                    + (right_sq - right_sum * right_sum / right_n as f64);
                let gain = parent_sse - sse;

                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(Split {
                        feature,
                        threshold: here + (next - here) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}

/// Reorder `idx` so rows matching `pred` come first; returns their count.
fn partition(idx: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut mid = 0;
    for j in 0..idx.len() {
        if pred(idx[j]) {
            idx.swap(mid, j);
            mid += 1;
        }
    }
    mid
}
