//! Group comparisons of rating.

use std::collections::BTreeMap;

use serde::Serialize;

use super::stats::{mean, student_t_two_sided, variance};
use super::ModelError;
use crate::models::EpisodeRecord;
use crate::tabulate::credit_mentions;

/// Welch two-sample t-test of rating, split by a predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupComparison {
    /// Human-readable predicate, e.g. `credit mentions "Neil Marshall"`.
    pub predicate: String,
    pub t: f64,
    pub df: f64,
    pub p_value: f64,
    pub mean_matching: f64,
    pub mean_other: f64,
    pub n_matching: usize,
    pub n_other: usize,
}

/// Mean rating for one director.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectorMean {
    pub director: String,
    pub mean_rating: f64,
    pub episodes: usize,
}

/// Welch's unequal-variance t-test.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Result<(f64, f64, f64), ModelError> {
    for group in [a, b] {
        if group.len() < 2 {
            return Err(ModelError::InsufficientData {
                needed: 2,
                found: group.len(),
            });
        }
    }

    let (va, vb) = (variance(a) / a.len() as f64, variance(b) / b.len() as f64);
    let se2 = va + vb;
    if se2 <= 0.0 {
        return Err(ModelError::DegeneratePredictor(
            "both groups have zero variance".to_string(),
        ));
    }

    let t = (mean(a) - mean(b)) / se2.sqrt();
    let df = se2.powi(2)
        / (va.powi(2) / (a.len() - 1) as f64 + vb.powi(2) / (b.len() - 1) as f64);
    let p = student_t_two_sided(t, df)?;
    Ok((t, df, p))
}

/// Compare ratings of episodes whose credit text mentions `director` against the rest.
///
/// Unrated episodes are excluded; episodes without credit text count as not matching.
pub fn compare_director(
    records: &[EpisodeRecord],
    director: &str,
) -> Result<GroupComparison, ModelError> {
    let mut matching = Vec::new();
    let mut other = Vec::new();
    for record in records {
        let Some(rating) = record.rating else {
            continue;
        };
        let credited = record
            .director_credit_text
            .as_deref()
            .is_some_and(|text| credit_mentions(text, director));
        if credited {
            matching.push(rating);
        } else {
            other.push(rating);
        }
    }

    let (t, df, p_value) = welch_t_test(&matching, &other)?;
    Ok(GroupComparison {
        predicate: format!("credit mentions {:?}", director),
        t,
        df,
        p_value,
        mean_matching: mean(&matching),
        mean_other: mean(&other),
        n_matching: matching.len(),
        n_other: other.len(),
    })
}

/// Mean rating per normalized director, highest first.
pub fn mean_rating_by_director(records: &[EpisodeRecord]) -> Vec<DirectorMean> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let (Some(director), Some(rating)) = (record.director.as_deref(), record.rating) {
            groups.entry(director).or_default().push(rating);
        }
    }

    let mut means: Vec<DirectorMean> = groups
        .into_iter()
        .map(|(director, ratings)| DirectorMean {
            director: director.to_string(),
            mean_rating: mean(&ratings),
            episodes: ratings.len(),
        })
        .collect();

    means.sort_by(|a, b| {
        b.mean_rating
            .total_cmp(&a.mean_rating)
            .then_with(|| a.director.cmp(&b.director))
    });
    means
}
