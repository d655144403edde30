//! Regression discontinuity in rating at the source-material cutoff.
//!
//! A single weighted regression `rating ~ 1 + D + x + D*x` is fit, with `x`
//! the episode index centred on the threshold and `D` the treatment dummy.
//! The coefficient on `D` is the jump between the two local lines. Weights
//! come from a triangular kernel and the standard error is HC1 robust.

use serde::Serialize;

use super::stats::{normal_two_sided, test_statistic, weighted_least_squares};
use super::ModelError;
use crate::models::EpisodeRecord;
use crate::tabulate::departed_from_source;

/// Fewest weighted observations needed on each side of the threshold.
const MIN_PER_SIDE: usize = 2;

/// A straight line in centred index units: `intercept + slope * (index - threshold)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Line {
    pub intercept: f64,
    pub slope: f64,
}

impl Line {
    pub fn at(&self, centred: f64) -> f64 {
        self.intercept + self.slope * centred
    }
}

/// Discontinuity estimate and the two fitted lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discontinuity {
    pub cutoff: u32,
    /// Midpoint between the last untreated and first treated index.
    pub threshold: f64,
    pub bandwidth: f64,
    pub estimate: f64,
    pub std_error: f64,
    pub z: f64,
    pub p_value: f64,
    pub n_left: usize,
    pub n_right: usize,
    pub left: Line,
    pub right: Line,
}

/// Estimate the jump in rating where `global_index` crosses `cutoff`.
///
/// With no bandwidth every rated episode gets a positive weight.
pub fn estimate(
    records: &[EpisodeRecord],
    cutoff: u32,
    bandwidth: Option<f64>,
) -> Result<Discontinuity, ModelError> {
    let threshold = cutoff as f64 + 0.5;
    let points: Vec<(f64, f64, bool)> = records
        .iter()
        .filter_map(|r| {
            r.rating.map(|rating| {
                (
                    r.global_index as f64 - threshold,
                    rating,
                    departed_from_source(r.global_index, cutoff),
                )
            })
        })
        .collect();

    let bandwidth = match bandwidth {
        Some(h) if h > 0.0 => h,
        Some(h) => {
            return Err(ModelError::DegeneratePredictor(format!(
                "bandwidth must be positive, got {}",
                h
            )))
        }
        None => points.iter().map(|(x, _, _)| x.abs()).fold(0.0, f64::max) + 1.0,
    };

    let mut y = Vec::new();
    let mut weights = Vec::new();
    let mut columns = vec![Vec::new(), Vec::new(), Vec::new()];
    let (mut n_left, mut n_right) = (0, 0);
    for &(x, rating, treated) in &points {
        let w = 1.0 - x.abs() / bandwidth;
        if w <= 0.0 {
            continue;
        }
        let d = if treated { 1.0 } else { 0.0 };
        if treated {
            n_right += 1;
        } else {
            n_left += 1;
        }
        y.push(rating);
        weights.push(w);
        columns[0].push(d);
        columns[1].push(x);
        columns[2].push(d * x);
    }

    for found in [n_left, n_right] {
        if found < MIN_PER_SIDE {
            return Err(ModelError::InsufficientData {
                needed: MIN_PER_SIDE,
                found,
            });
        }
    }
    let n = y.len();
    let k = columns.len() + 1;
    if n <= k {
        return Err(ModelError::InsufficientData {
            needed: k + 1,
            found: n,
        });
    }

    let fit = weighted_least_squares(&y, &columns, &weights)?;

    // HC1 sandwich: bread * (sum w^2 e^2 x x') * bread * n / (n - k)
    let mut meat = vec![vec![0.0; k]; k];
    for ((row, &w), &e) in fit.design.iter().zip(&weights).zip(&fit.residuals) {
        let scale = w * w * e * e;
        for a in 0..k {
            for b in 0..k {
                meat[a][b] += scale * row[a] * row[b];
            }
        }
    }
    let treatment = 1;
    let variance: f64 = (0..k)
        .flat_map(|a| (0..k).map(move |b| (a, b)))
        .map(|(a, b)| fit.bread[treatment][a] * meat[a][b] * fit.bread[b][treatment])
        .sum::<f64>()
        * n as f64
        / (n - k) as f64;

    let estimate = fit.beta[treatment];
    let std_error = variance.max(0.0).sqrt();
    let z = test_statistic(estimate, std_error);
    let p_value = normal_two_sided(z)?;

    let left = Line {
        intercept: fit.beta[0],
        slope: fit.beta[2],
    };
    let right = Line {
        intercept: fit.beta[0] + fit.beta[1],
        slope: fit.beta[2] + fit.beta[3],
    };

    Ok(Discontinuity {
        cutoff,
        threshold,
        bandwidth,
        estimate,
        std_error,
        z,
        p_value,
        n_left,
        n_right,
        left,
        right,
    })
}
