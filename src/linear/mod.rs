//! Closed-form linear regression
//!
//! One-shot ordinary least squares via the normal equations,
//! `beta = pinv(XᵀX + λI) · Xᵀy`. The pseudo-inverse comes from a Jacobi
//! eigendecomposition of the symmetric normal matrix, so a rank-deficient
//! or collinear feature set still yields the defined least-norm solution
//! instead of failing. No iteration, no convergence criteria: identical
//! inputs reproduce beta bit for bit.

use crate::error::{GridcastError, Result};
use crate::features::{FeatureMatrix, FeatureSchema};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

const JACOBI_MAX_SWEEPS: usize = 64;

/// A fitted linear model: coefficients, the schema they were fitted
/// against, and the ridge term used. Serialized as one unit so the
/// coefficient order can never drift from its column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    beta: Array1<f64>,
    schema: FeatureSchema,
    ridge_lambda: f64,
}

impl LinearModel {
    /// Fit on a feature matrix (intercept column included in X).
    ///
    /// `ridge_lambda` must be finite and non-negative; zero means plain
    /// OLS. The value is recorded on the model and logged for
    /// reproducibility.
    pub fn fit(matrix: &FeatureMatrix, ridge_lambda: f64) -> Result<Self> {
        Self::fit_arrays(&matrix.x, &matrix.y, matrix.schema.clone(), ridge_lambda)
    }

    pub fn fit_arrays(
        x: &Array2<f64>,
        y: &Array1<f64>,
        schema: FeatureSchema,
        ridge_lambda: f64,
    ) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(GridcastError::ShapeError {
                expected: format!("y of length {}", x.nrows()),
                actual: format!("y of length {}", y.len()),
            });
        }
        if x.nrows() == 0 {
            return Err(GridcastError::DataError(
                "cannot fit on an empty matrix".to_string(),
            ));
        }
        if x.ncols() != schema.width() {
            return Err(GridcastError::SchemaMismatch {
                expected: schema.describe(),
                actual: format!("{} columns", x.ncols()),
            });
        }
        if !(ridge_lambda.is_finite() && ridge_lambda >= 0.0) {
            return Err(GridcastError::ConfigError(format!(
                "ridge lambda must be finite and >= 0, got {}",
                ridge_lambda
            )));
        }

        let mut xtx = x.t().dot(x);
        if ridge_lambda > 0.0 {
            for i in 0..xtx.nrows() {
                xtx[[i, i]] += ridge_lambda;
            }
        }
        let xty = x.t().dot(y);
        let beta = pinv_symmetric(&xtx).dot(&xty);

        debug!(
            ridge_lambda,
            n_rows = x.nrows(),
            n_cols = x.ncols(),
            "linear model fitted"
        );

        Ok(Self {
            beta,
            schema,
            ridge_lambda,
        })
    }

    pub fn beta(&self) -> &Array1<f64> {
        &self.beta
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn ridge_lambda(&self) -> f64 {
        self.ridge_lambda
    }

    /// Predict against a matrix, refusing a schema that differs from the
    /// one the model was fitted on.
    pub fn predict(&self, matrix: &FeatureMatrix) -> Result<Array1<f64>> {
        if matrix.schema != self.schema {
            return Err(GridcastError::SchemaMismatch {
                expected: self.schema.describe(),
                actual: matrix.schema.describe(),
            });
        }
        self.predict_x(&matrix.x)
    }

    /// Predict from a raw design matrix of the fitted width.
    pub fn predict_x(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.beta.len() {
            return Err(GridcastError::ShapeError {
                expected: format!("{} columns", self.beta.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok(x.dot(&self.beta))
    }
}

/// Moore–Penrose pseudo-inverse of a symmetric matrix.
///
/// Eigenvalues with magnitude below `max|λ| · n · ε` are treated as zero,
/// which is what turns rank deficiency into a least-norm solution.
pub(crate) fn pinv_symmetric(a: &Array2<f64>) -> Array2<f64> {
    let n = a.nrows();
    let (eigenvalues, eigenvectors) = jacobi_eigh(a);

    let max_abs = eigenvalues.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    let tol = max_abs * n as f64 * f64::EPSILON;

    let mut pinv = Array2::zeros((n, n));
    for k in 0..n {
        let lambda = eigenvalues[k];
        if lambda.abs() <= tol {
            continue;
        }
        let inv = 1.0 / lambda;
        for i in 0..n {
            for j in 0..n {
                pinv[[i, j]] += inv * eigenvectors[[i, k]] * eigenvectors[[j, k]];
            }
        }
    }
    pinv
}

/// Cyclic Jacobi eigendecomposition of a symmetric matrix. Returns
/// (eigenvalues, eigenvectors-as-columns). Deterministic sweep order.
fn jacobi_eigh(a: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = a.nrows();
    let mut m = a.clone();
    let mut v = Array2::eye(n);

    let frobenius = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    if frobenius == 0.0 {
        return (Array1::zeros(n), v);
    }

    for _ in 0..JACOBI_MAX_SWEEPS {
        let mut off = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                off += m[[i, j]] * m[[i, j]];
            }
        }
        if off.sqrt() <= f64::EPSILON * frobenius {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                if m[[p, q]].abs() <= f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (m[[q, q]] - m[[p, p]]) / (2.0 * m[[p, q]]);
                let t = if theta >= 0.0 {
                    1.0 / (theta + (1.0 + theta * theta).sqrt())
                } else {
                    -1.0 / (-theta + (1.0 + theta * theta).sqrt())
                };
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = t * c;

                for k in 0..n {
                    let mkp = m[[k, p]];
                    let mkq = m[[k, q]];
                    m[[k, p]] = c * mkp - s * mkq;
                    m[[k, q]] = s * mkp + c * mkq;
                }
                for k in 0..n {
                    let mpk = m[[p, k]];
                    let mqk = m[[q, k]];
                    m[[p, k]] = c * mpk - s * mqk;
                    m[[q, k]] = s * mpk + c * mqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    let eigenvalues = Array1::from_iter((0..n).map(|i| m[[i, i]]));
    (eigenvalues, v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn schema(p: usize) -> FeatureSchema {
        FeatureSchema::new((0..p).map(|i| format!("x{}", i + 1)).collect())
    }

    #[test]
    fn test_recovers_exact_coefficients() {
        // y = 3 + 2*x1 - 1*x2, no noise.
        let n = 40;
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for i in 0..n {
            let x1 = (i as f64 * 0.37).sin() * 5.0;
            let x2 = (i as f64 * 0.11).cos() * 3.0 + i as f64 * 0.05;
            rows.extend([1.0, x1, x2]);
            targets.push(3.0 + 2.0 * x1 - x2);
        }
        let x = Array2::from_shape_vec((n, 3), rows).unwrap();
        let y = Array1::from_vec(targets);

        let model = LinearModel::fit_arrays(&x, &y, schema(2), 0.0).unwrap();
        let beta = model.beta();
        assert!((beta[0] - 3.0).abs() < 1e-8);
        assert!((beta[1] - 2.0).abs() < 1e-8);
        assert!((beta[2] + 1.0).abs() < 1e-8);

        let residual = &model.predict_x(&x).unwrap() - &y;
        let rmse = (residual.mapv(|r| r * r).sum() / n as f64).sqrt();
        assert!(rmse < 1e-8);
    }

    #[test]
    fn test_collinear_columns_still_solve() {
        // x2 = 2 * x1: rank-deficient normal matrix.
        let n = 20;
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for i in 0..n {
            let x1 = i as f64;
            rows.extend([1.0, x1, 2.0 * x1]);
            targets.push(1.0 + 5.0 * x1);
        }
        let x = Array2::from_shape_vec((n, 3), rows).unwrap();
        let y = Array1::from_vec(targets);

        let model = LinearModel::fit_arrays(&x, &y, schema(2), 0.0).unwrap();
        let pred = model.predict_x(&x).unwrap();
        for i in 0..n {
            assert!((pred[i] - y[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_fit_is_bit_reproducible() {
        let x = array![[1.0, 2.0], [1.0, 3.0], [1.0, 5.0], [1.0, 7.0]];
        let y = array![4.0, 6.0, 10.0, 14.0];
        let a = LinearModel::fit_arrays(&x, &y, schema(1), 0.0).unwrap();
        let b = LinearModel::fit_arrays(&x, &y, schema(1), 0.0).unwrap();
        assert_eq!(a.beta().to_vec(), b.beta().to_vec());
    }

    #[test]
    fn test_ridge_lambda_recorded() {
        let x = array![[1.0, 2.0], [1.0, 3.0], [1.0, 5.0]];
        let y = array![4.0, 6.0, 10.0];
        let model = LinearModel::fit_arrays(&x, &y, schema(1), 1e-5).unwrap();
        assert_eq!(model.ridge_lambda(), 1e-5);
    }

    #[test]
    fn test_negative_lambda_rejected() {
        let x = array![[1.0, 2.0], [1.0, 3.0]];
        let y = array![4.0, 6.0];
        assert!(LinearModel::fit_arrays(&x, &y, schema(1), -1.0).is_err());
    }

    #[test]
    fn test_predict_width_checked() {
        let x = array![[1.0, 2.0], [1.0, 3.0], [1.0, 5.0]];
        let y = array![4.0, 6.0, 10.0];
        let model = LinearModel::fit_arrays(&x, &y, schema(1), 0.0).unwrap();
        let wide = array![[1.0, 2.0, 9.0]];
        assert!(model.predict_x(&wide).is_err());
    }

    #[test]
    fn test_serialized_model_keeps_schema() {
        let x = array![[1.0, 2.0], [1.0, 3.0], [1.0, 5.0]];
        let y = array![4.0, 6.0, 10.0];
        let model = LinearModel::fit_arrays(&x, &y, schema(1), 0.0).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let restored: LinearModel = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, model);
        assert_eq!(restored.schema().columns()[0], "intercept");
    }

    #[test]
    fn test_pinv_of_identity() {
        let eye: Array2<f64> = Array2::eye(3);
        let pinv = pinv_symmetric(&eye);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((pinv[[i, j]] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_pinv_of_singular_matrix() {
        // rank-1 matrix [[1,1],[1,1]]; pinv is [[0.25,0.25],[0.25,0.25]].
        let a = array![[1.0, 1.0], [1.0, 1.0]];
        let pinv = pinv_symmetric(&a);
        for i in 0..2 {
            for j in 0..2 {
                assert!((pinv[[i, j]] - 0.25).abs() < 1e-10);
            }
        }
    }
}
