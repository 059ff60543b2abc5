//! Ordinary least squares regression

use crate::error::{CostError, Result};
use super::models::Regressor;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Relative pivot below which a column is treated as linearly dependent
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Solve `A x = b` for symmetric positive semi-definite `A`.
///
/// Columns whose Cholesky pivot collapses are aliased to earlier columns;
/// their coefficient is fixed at zero. Fitted values are unaffected, which is
/// what a full one-hot block plus intercept needs.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let max_diag = a.diag().iter().fold(0.0f64, |m, v| m.max(v.abs()));
    let tol = PIVOT_TOLERANCE * max_diag.max(f64::MIN_POSITIVE);

    let mut l = Array2::<f64>::zeros((n, n));
    let mut active = vec![true; n];

    for i in 0..n {
        for j in 0..=i {
            if !active[j] {
                continue;
            }
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= tol {
                    active[i] = false;
                } else {
                    l[[i, i]] = diag.sqrt();
                }
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
        if !active[i] {
            // Dropped column must not feed later rows
            for k in 0..i {
                l[[i, k]] = 0.0;
            }
        }
    }

    if !active.iter().any(|&a| a) {
        // Every column collapsed: intercept-only fit
        return Some(Array1::zeros(n));
    }

    // Forward substitution: L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        if !active[i] {
            continue;
        }
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * z[j];
        }
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        if !active[i] {
            continue;
        }
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (z[i] - sum) / l[[i, i]];
    }

    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// Linear regression fitted by least squares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// Whether to fit an intercept
    pub fit_intercept: bool,
    /// Optional L2 penalty (0 is plain OLS)
    pub alpha: f64,
    pub is_fitted: bool,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            fit_intercept: true,
            alpha: 0.0,
            is_fitted: false,
        }
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha.max(0.0);
        self
    }

    /// Fit by solving the normal equations on centered data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(CostError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(CostError::DataError(
                "cannot fit linear regression on zero samples".to_string(),
            ));
        }

        let (x_work, y_work, x_mean, y_mean) = if self.fit_intercept {
            let x_mean = x
                .mean_axis(Axis(0))
                .ok_or_else(|| CostError::DataError("empty feature matrix".to_string()))?;
            let y_mean = y.mean().unwrap_or(0.0);
            let x_centered = x - &x_mean.view().insert_axis(Axis(0));
            let y_centered = y - y_mean;
            (x_centered, y_centered, x_mean, y_mean)
        } else {
            (x.clone(), y.clone(), Array1::zeros(n_features), 0.0)
        };

        let mut xtx = x_work.t().dot(&x_work);
        for i in 0..n_features {
            xtx[[i, i]] += self.alpha;
        }
        let xty = x_work.t().dot(&y_work);

        let coefficients = cholesky_solve(&xtx, &xty).ok_or_else(|| {
            CostError::DataError("normal equations have no usable solution".to_string())
        })?;
        let intercept = if self.fit_intercept {
            y_mean - coefficients.dot(&x_mean)
        } else {
            0.0
        };

        self.coefficients = Some(coefficients);
        self.intercept = Some(intercept);
        self.is_fitted = true;
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = match (&self.coefficients, self.is_fitted) {
            (Some(c), true) => c,
            _ => return Err(CostError::NotFitted("LinearRegression".to_string())),
        };
        if x.ncols() != coefficients.len() {
            return Err(CostError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(coefficients) + self.intercept.unwrap_or(0.0))
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        LinearRegression::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        LinearRegression::predict(self, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_recovers_exact_line() {
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 5.0], [4.0, 3.0], [5.0, 4.0]];
        let y = x.column(0).mapv(|v| 2.0 * v) + &x.column(1).mapv(|v| -3.0 * v) + 7.0;

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients.as_ref().unwrap();
        assert!((coef[0] - 2.0).abs() < 1e-8);
        assert!((coef[1] + 3.0).abs() < 1e-8);
        assert!((model.intercept.unwrap() - 7.0).abs() < 1e-8);
    }

    #[test]
    fn test_full_one_hot_block_is_handled() {
        // Indicator columns sum to one, so X^T X is singular after centering
        let x = array![
            [0.5, 1.0, 0.0],
            [1.5, 0.0, 1.0],
            [2.5, 1.0, 0.0],
            [3.5, 0.0, 1.0],
            [4.5, 1.0, 0.0],
            [5.5, 0.0, 1.0],
        ];
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|r| 10.0 * r[0] + if r[2] == 1.0 { 50.0 } else { 0.0 } + 3.0)
            .collect();

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&x).unwrap();
        for (p, t) in preds.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-6, "{} vs {}", p, t);
        }
        assert_eq!(model.coefficients.as_ref().unwrap()[2], 0.0);
    }

    #[test]
    fn test_constant_features_fall_back_to_mean() {
        let x = array![[3.0, 1.0], [3.0, 1.0], [3.0, 1.0]];
        let y = array![10.0, 20.0, 30.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.coefficients.as_ref().unwrap().to_vec(), vec![0.0, 0.0]);
        assert_eq!(model.predict(&x).unwrap().to_vec(), vec![20.0; 3]);

        let mut single = LinearRegression::new();
        single.fit(&array![[1.0, 2.0]], &array![7.0]).unwrap();
        assert_eq!(single.predict(&array![[5.0, 5.0]]).unwrap()[0], 7.0);
    }

    #[test]
    fn test_predict_before_fit() {
        let model = LinearRegression::new();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(CostError::NotFitted(_))
        ));
    }
}
