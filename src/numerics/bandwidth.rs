//! Offline discovery of the Jacobian sparsity pattern.
//!
//! Every `y_j` and `yp_j` is nudged on its own and the rows whose residual
//! changes are recorded. The combined pattern of `dF/dy` and `dF/dyp`
//! bounds the iteration matrix `dF/dy + c * dF/dyp` for any `c`.

use crate::physics::DaeModel;

#[derive(Clone, Debug, PartialEq)]
pub struct JacobianPattern {
    pub n: usize,
    /// Row-major nonzero flags.
    nonzero: Vec<bool>,
    /// Largest distance of a nonzero below the diagonal.
    pub lband: usize,
    /// Largest distance of a nonzero above the diagonal.
    pub uband: usize,
}

/// Deterministic perturbation of a value `v`.
pub fn perturbation(v: f64) -> f64 {
    (1e-6 * v.abs()).max(1e-6)
}

impl JacobianPattern {
    /// Pattern of a system without unknowns.
    pub fn empty() -> Self {
        Self {
            n: 0,
            nonzero: Vec::new(),
            lband: 0,
            uband: 0,
        }
    }

    /// Probe `model` around `(t, y, yp)`.
    pub fn analyze<M: DaeModel + ?Sized>(model: &M, t: f64, y: &[f64], yp: &[f64]) -> Self {
        let n = model.len();
        let mut base = vec![0.0; n];
        model.residual(t, y, yp, &mut base);

        let mut nonzero = vec![false; n * n];
        let mut res = vec![0.0; n];
        let mut y_work = y.to_vec();
        let mut yp_work = yp.to_vec();

        for j in 0..n {
            y_work[j] += perturbation(y[j]);
            model.residual(t, &y_work, yp, &mut res);
            y_work[j] = y[j];
            mark_changed(&mut nonzero, n, j, &base, &res);

            yp_work[j] += perturbation(yp[j]);
            model.residual(t, y, &yp_work, &mut res);
            yp_work[j] = yp[j];
            mark_changed(&mut nonzero, n, j, &base, &res);
        }

        let mut pattern = Self {
            n,
            nonzero,
            lband: 0,
            uband: 0,
        };
        pattern.update_bands();
        pattern
    }

    fn update_bands(&mut self) {
        let (mut lband, mut uband) = (0, 0);
        for i in 0..self.n {
            for j in 0..self.n {
                if self.nonzero[i * self.n + j] {
                    if i > j {
                        lband = lband.max(i - j);
                    } else {
                        uband = uband.max(j - i);
                    }
                }
            }
        }
        self.lband = lband;
        self.uband = uband;
    }

    pub fn is_nonzero(&self, row: usize, col: usize) -> bool {
        self.nonzero[row * self.n + col]
    }

    pub fn nnz(&self) -> usize {
        self.nonzero.iter().filter(|&&b| b).count()
    }

    /// Fraction of nonzero entries.
    pub fn density(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.nnz() as f64 / (self.n * self.n) as f64
        }
    }
}

fn mark_changed(nonzero: &mut [bool], n: usize, col: usize, base: &[f64], res: &[f64]) {
    for (i, (b, r)) in base.iter().zip(res).enumerate() {
        if b != r {
            nonzero[i * n + col] = true;
        }
    }
}
