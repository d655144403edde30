//! Least squares and distribution helpers shared by the models.

use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

use super::ModelError;

/// Tolerance below which a pivot is treated as zero.
const PIVOT_EPSILON: f64 = 1e-10;

/// Weighted least squares solution with the pieces needed for standard errors.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    /// Coefficients, intercept first.
    pub beta: Vec<f64>,
    pub residuals: Vec<f64>,
    /// (X'WX)^-1
    pub bread: Vec<Vec<f64>>,
    /// Design matrix rows, intercept column included.
    pub design: Vec<Vec<f64>>,
}

/// Ordinary least squares fit with classical standard errors.
#[derive(Debug, Clone)]
pub struct OlsFit {
    /// Coefficients, intercept first.
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub t_values: Vec<f64>,
    pub p_values: Vec<f64>,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub n: usize,
    pub df_resid: usize,
}

/// Fit `y = b0 + b1*x1 + ...` where `columns[j]` holds predictor `j`.
pub fn ols(y: &[f64], columns: &[Vec<f64>]) -> Result<OlsFit, ModelError> {
    let n = y.len();
    let k = columns.len() + 1;
    if n <= k {
        return Err(ModelError::InsufficientData {
            needed: k + 1,
            found: n,
        });
    }

    let weights = vec![1.0; n];
    let fit = weighted_least_squares(y, columns, &weights)?;

    let ssr: f64 = fit.residuals.iter().map(|e| e * e).sum();
    let y_mean = mean(y);
    let sst: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    if sst <= 0.0 {
        return Err(ModelError::ConstantResponse);
    }

    let df_resid = n - k;
    let sigma2 = ssr / df_resid as f64;
    let std_errors: Vec<f64> = (0..k).map(|j| (sigma2 * fit.bread[j][j]).sqrt()).collect();
    let t_values: Vec<f64> = fit
        .beta
        .iter()
        .zip(&std_errors)
        .map(|(b, se)| test_statistic(*b, *se))
        .collect();
    let p_values = t_values
        .iter()
        .map(|t| student_t_two_sided(*t, df_resid as f64))
        .collect::<Result<Vec<_>, _>>()?;

    let r_squared = 1.0 - ssr / sst;
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n - 1) as f64 / df_resid as f64;

    Ok(OlsFit {
        coefficients: fit.beta,
        std_errors,
        t_values,
        p_values,
        r_squared,
        adj_r_squared,
        n,
        df_resid,
    })
}

/// Solve `(X'WX) b = X'Wy` with an intercept column prepended to `columns`.
pub fn weighted_least_squares(
    y: &[f64],
    columns: &[Vec<f64>],
    weights: &[f64],
) -> Result<LeastSquares, ModelError> {
    let n = y.len();
    let k = columns.len() + 1;
    if let Some(col) = columns.iter().position(|col| col.len() != n) {
        return Err(ModelError::DegeneratePredictor(format!(
            "predictor {} has {} values for {} responses",
            col,
            columns[col].len(),
            n
        )));
    }
    if weights.len() != n {
        return Err(ModelError::DegeneratePredictor(format!(
            "{} weights for {} responses",
            weights.len(),
            n
        )));
    }

    let design: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let mut row = Vec::with_capacity(k);
            row.push(1.0);
            row.extend(columns.iter().map(|col| col[i]));
            row
        })
        .collect();

    let mut xtwx = vec![vec![0.0; k]; k];
    let mut xtwy = vec![0.0; k];
    for ((row, &w), &yi) in design.iter().zip(weights).zip(y) {
        for a in 0..k {
            xtwy[a] += w * row[a] * yi;
            for b in 0..k {
                xtwx[a][b] += w * row[a] * row[b];
            }
        }
    }

    let bread = invert(&xtwx)?;
    let beta: Vec<f64> = (0..k)
        .map(|a| (0..k).map(|b| bread[a][b] * xtwy[b]).sum())
        .collect();

    let residuals = design
        .iter()
        .zip(y)
        .map(|(row, yi)| yi - dot(row, &beta))
        .collect();

    Ok(LeastSquares {
        beta,
        residuals,
        bread,
        design,
    })
}

/// Gauss-Jordan inversion with partial pivoting.
pub fn invert(matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ModelError> {
    let k = matrix.len();
    let scale = matrix
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()))
        .max(1.0);

    let mut a: Vec<Vec<f64>> = matrix.to_vec();
    let mut inv: Vec<Vec<f64>> = (0..k)
        .map(|i| (0..k).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..k {
        let pivot = (col..k)
            .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < PIVOT_EPSILON * scale {
            return Err(ModelError::Singular);
        }
        a.swap(col, pivot);
        inv.swap(col, pivot);

        let p = a[col][col];
        for j in 0..k {
            a[col][j] /= p;
            inv[col][j] /= p;
        }

        for row in 0..k {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..k {
                a[row][j] -= factor * a[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }

    Ok(inv)
}

/// Estimate over its standard error. An exact fit leaves both at zero for a
/// null coefficient, which is a zero statistic rather than 0/0.
pub fn test_statistic(estimate: f64, std_error: f64) -> f64 {
    if estimate == 0.0 && std_error == 0.0 {
        0.0
    } else {
        estimate / std_error
    }
}

/// Two-sided p-value of a t statistic.
pub fn student_t_two_sided(t: f64, df: f64) -> Result<f64, ModelError> {
    if t.is_nan() {
        return Err(ModelError::Distribution(format!("t statistic is NaN (df {})", df)));
    }
    if t.is_infinite() {
        return Ok(0.0);
    }
    let dist = StudentsT::new(0.0, 1.0, df).map_err(|e| ModelError::Distribution(e.to_string()))?;
    Ok((2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0))
}

/// Two-sided p-value of a standard normal statistic.
pub fn normal_two_sided(z: f64) -> Result<f64, ModelError> {
    if z.is_nan() {
        return Err(ModelError::Distribution("z statistic is NaN".to_string()));
    }
    if z.is_infinite() {
        return Ok(0.0);
    }
    let dist = Normal::new(0.0, 1.0).map_err(|e| ModelError::Distribution(e.to_string()))?;
    Ok((2.0 * (1.0 - dist.cdf(z.abs()))).clamp(0.0, 1.0))
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
