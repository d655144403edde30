//! Linear models of rating.

use serde::Serialize;

use super::stats::{ols, std_dev};
use super::ModelError;
use crate::models::EpisodeRecord;

/// Rating regressed on one predictor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleRegression {
    pub predictor: String,
    pub intercept: f64,
    pub coefficient: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
    pub r_squared: f64,
    pub n: usize,
}

/// One predictor of a multiple regression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
    /// Estimate scaled by sd(x) / sd(y).
    pub standardized: f64,
}

/// Rating regressed on the episode factors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultipleRegression {
    pub intercept: f64,
    pub coefficients: Vec<Coefficient>,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub n: usize,
    /// Predictor names by decreasing |standardized coefficient|.
    pub importance: Vec<String>,
}

/// OLS of rating on `character_score`, over rated episodes.
pub fn rating_on_character_score(
    records: &[EpisodeRecord],
) -> Result<SimpleRegression, ModelError> {
    let (y, x): (Vec<f64>, Vec<f64>) = records
        .iter()
        .filter_map(|r| r.rating.map(|rating| (rating, r.character_score as f64)))
        .unzip();

    simple_regression("character_score", &y, &x)
}

/// OLS of `y` on a single predictor `x`.
pub fn simple_regression(name: &str, y: &[f64], x: &[f64]) -> Result<SimpleRegression, ModelError> {
    ensure_varies(name, x)?;
    let fit = ols(y, &[x.to_vec()])?;

    Ok(SimpleRegression {
        predictor: name.to_string(),
        intercept: fit.coefficients[0],
        coefficient: fit.coefficients[1],
        std_error: fit.std_errors[1],
        t_value: fit.t_values[1],
        p_value: fit.p_values[1],
        r_squared: fit.r_squared,
        n: fit.n,
    })
}

/// OLS of rating on `departed_from_source`, `character_score`, and
/// `outside_director` (or its complement, named `showrunner_director`).
///
/// Episodes without a rating or without an `outside_director` value are excluded.
pub fn rating_on_factors(
    records: &[EpisodeRecord],
    complement_outside_director: bool,
) -> Result<MultipleRegression, ModelError> {
    let director_name = if complement_outside_director {
        "showrunner_director"
    } else {
        "outside_director"
    };
    let names = ["departed_from_source", "character_score", director_name];

    let mut y = Vec::new();
    let mut columns = vec![Vec::new(), Vec::new(), Vec::new()];
    for record in records {
        let (Some(rating), Some(outside)) = (record.rating, record.outside_director) else {
            continue;
        };
        let director_flag = outside != complement_outside_director;
        y.push(rating);
        columns[0].push(indicator(record.departed_from_source));
        columns[1].push(record.character_score as f64);
        columns[2].push(indicator(director_flag));
    }

    for (name, column) in names.iter().zip(&columns) {
        ensure_varies(name, column)?;
    }
    let fit = ols(&y, &columns)?;

    let sd_y = std_dev(&y);
    let coefficients: Vec<Coefficient> = names
        .iter()
        .zip(&columns)
        .enumerate()
        .map(|(j, (name, column))| {
            let estimate = fit.coefficients[j + 1];
            Coefficient {
                name: name.to_string(),
                estimate,
                std_error: fit.std_errors[j + 1],
                t_value: fit.t_values[j + 1],
                p_value: fit.p_values[j + 1],
                standardized: estimate * std_dev(column) / sd_y,
            }
        })
        .collect();

    let mut ranked: Vec<&Coefficient> = coefficients.iter().collect();
    ranked.sort_by(|a, b| {
        b.standardized
            .abs()
            .total_cmp(&a.standardized.abs())
            .then_with(|| a.name.cmp(&b.name))
    });
    let importance = ranked.iter().map(|c| c.name.clone()).collect();

    Ok(MultipleRegression {
        intercept: fit.coefficients[0],
        coefficients,
        r_squared: fit.r_squared,
        adj_r_squared: fit.adj_r_squared,
        n: fit.n,
        importance,
    })
}

fn indicator(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

fn ensure_varies(name: &str, column: &[f64]) -> Result<(), ModelError> {
    let Some(first) = column.first() else {
        return Err(ModelError::InsufficientData { needed: 3, found: 0 });
    };
    if column.iter().all(|v| v == first) {
        return Err(ModelError::DegeneratePredictor(format!(
            "{} is constant ({}) over {} rows",
            name,
            first,
            column.len()
        )));
    }
    Ok(())
}
