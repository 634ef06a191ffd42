//! Power Iteration
//!
//! Fixed-point iteration `t = (1 - a) * Cᵀ t + a * p` over a row-normalized
//! trust matrix, shared by EigenTrust and PowerTrust.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::topology::SensorId;

/// Dense square matrix indexed by sensor id.
#[derive(Debug, Clone, PartialEq)]
pub struct TrustMatrix {
    ids: Vec<SensorId>,
    index: HashMap<SensorId, usize>,
    rows: Vec<Vec<f64>>,
}

impl TrustMatrix {
    pub fn new(ids: Vec<SensorId>) -> Self {
        let n = ids.len();
        let index = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        Self {
            ids,
            index,
            rows: vec![vec![0.0; n]; n],
        }
    }

    pub fn size(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> &[SensorId] {
        &self.ids
    }

    pub fn index_of(&self, id: SensorId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn get(&self, from: SensorId, to: SensorId) -> f64 {
        match (self.index_of(from), self.index_of(to)) {
            (Some(i), Some(j)) => self.rows[i][j],
            _ => 0.0,
        }
    }

    /// Sets an entry. Unknown ids are ignored.
    pub fn set(&mut self, from: SensorId, to: SensorId, value: f64) {
        if let (Some(i), Some(j)) = (self.index_of(from), self.index_of(to)) {
            self.rows[i][j] = value;
        }
    }

    pub fn row(&self, id: SensorId) -> Option<&[f64]> {
        self.index_of(id).map(|i| self.rows[i].as_slice())
    }

    /// Replaces a row. Ignored for unknown ids or rows of the wrong length.
    pub fn set_row(&mut self, id: SensorId, row: Vec<f64>) {
        if let Some(i) = self.index_of(id) {
            if row.len() == self.size() {
                self.rows[i] = row;
            }
        }
    }

    /// Scales every row to sum to 1. Rows without positive mass are replaced
    /// by `fallback`.
    pub fn normalize_rows(&mut self, fallback: &[f64]) {
        for row in &mut self.rows {
            let sum: f64 = row.iter().sum();
            if sum > 0.0 {
                row.iter_mut().for_each(|v| *v /= sum);
            } else if fallback.len() == row.len() {
                row.copy_from_slice(fallback);
            }
        }
    }

    /// `Cᵀ v`
    pub fn transpose_mul(&self, v: &[f64]) -> Vec<f64> {
        let n = self.size();
        let mut out = vec![0.0; n];
        for (i, row) in self.rows.iter().enumerate() {
            let weight = v.get(i).copied().unwrap_or(0.0);
            if weight == 0.0 {
                continue;
            }
            for (j, value) in row.iter().enumerate() {
                out[j] += value * weight;
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationSettings {
    /// Weight of the prior in each step
    pub alpha: f64,
    pub epsilon: f64,
    pub max_iterations: usize,
}

/// How a power iteration ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Convergence {
    pub model: String,
    pub iterations: usize,
    /// L2 distance between the last two vectors
    pub delta: f64,
    pub converged: bool,
}

impl std::fmt::Display for Convergence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.converged {
            write!(
                f,
                "{} converged after {} iterations (delta {:.2e})",
                self.model, self.iterations, self.delta
            )
        } else {
            write!(
                f,
                "{} did not converge within {} iterations (delta {:.2e})",
                self.model, self.iterations, self.delta
            )
        }
    }
}

/// Uniform distribution over `n` entries.
pub fn uniform(n: usize) -> Vec<f64> {
    if n == 0 {
        Vec::new()
    } else {
        vec![1.0 / n as f64; n]
    }
}

/// Scales `v` to sum to 1, or returns the uniform vector when it has no
/// positive mass.
pub fn l1_normalize(v: Vec<f64>) -> Vec<f64> {
    let sum: f64 = v.iter().sum();
    if sum > 0.0 {
        v.into_iter().map(|x| x / sum).collect()
    } else {
        uniform(v.len())
    }
}

fn l2_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Iterates from `start` until successive vectors differ by less than
/// `epsilon` or the iteration bound is hit. Every intermediate vector is
/// L1-normalized. Hitting the bound is logged, not treated as an error.
pub fn power_iterate(
    matrix: &TrustMatrix,
    prior: &[f64],
    start: &[f64],
    settings: IterationSettings,
    model: &str,
) -> (Vec<f64>, Convergence) {
    let n = matrix.size();
    let mut current = if start.len() == n {
        l1_normalize(start.to_vec())
    } else {
        uniform(n)
    };
    let mut convergence = Convergence {
        model: model.to_string(),
        iterations: 0,
        delta: 0.0,
        converged: true,
    };
    if n == 0 {
        return (current, convergence);
    }

    let alpha = settings.alpha.clamp(0.0, 1.0);
    convergence.converged = false;
    while convergence.iterations < settings.max_iterations.max(1) {
        let propagated = matrix.transpose_mul(&current);
        let next: Vec<f64> = propagated
            .iter()
            .enumerate()
            .map(|(j, v)| (1.0 - alpha) * v + alpha * prior.get(j).copied().unwrap_or(0.0))
            .collect();
        let next = l1_normalize(next);

        convergence.iterations += 1;
        convergence.delta = l2_distance(&next, &current);
        current = next;
        if convergence.delta < settings.epsilon {
            convergence.converged = true;
            break;
        }
    }

    if !convergence.converged {
        tracing::warn!("{}", convergence);
    }
    (current, convergence)
}
