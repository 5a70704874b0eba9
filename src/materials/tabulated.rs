//! Tabulated open-circuit data and the splines fitted through it.
//!
//! Tables are plain CSV with a header row, one column named `x` and any
//! number of value columns, e.g.
//!
//! ```text
//! x,V
//! 0.01,1.21
//! 0.05,0.43
//! ```

use std::fs;
use std::path::Path;

use nalgebra::{DMatrix, DVector};

use super::ActiveMaterial;
use crate::config::ConfigError;

/// Not-a-knot cubic spline through `(x, y)` samples.
///
/// Stores the second derivative at every knot.
#[derive(Clone, Debug)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    m: Vec<f64>,
}

impl CubicSpline {
    /// `x` must be strictly increasing with at least four knots.
    pub fn not_a_knot(x: &[f64], y: &[f64]) -> Result<Self, ConfigError> {
        let n = x.len();
        if n != y.len() {
            return Err(ConfigError::Table(format!(
                "{} abscissae for {} values",
                n,
                y.len()
            )));
        }
        if n < 4 {
            return Err(ConfigError::Table(format!("need at least 4 rows, got {n}")));
        }
        if x.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(ConfigError::Table("x must be strictly increasing".into()));
        }

        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let mut a = DMatrix::<f64>::zeros(n, n);
        let mut b = DVector::<f64>::zeros(n);

        // continuous third derivative across the second and second-to-last knots
        a[(0, 0)] = h[1];
        a[(0, 1)] = -(h[0] + h[1]);
        a[(0, 2)] = h[0];
        for i in 1..n - 1 {
            a[(i, i - 1)] = h[i - 1];
            a[(i, i)] = 2.0 * (h[i - 1] + h[i]);
            a[(i, i + 1)] = h[i];
            b[i] = 6.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
        }
        a[(n - 1, n - 3)] = h[n - 2];
        a[(n - 1, n - 2)] = -(h[n - 3] + h[n - 2]);
        a[(n - 1, n - 1)] = h[n - 3];

        let m = a
            .lu()
            .solve(&b)
            .ok_or_else(|| ConfigError::Table("singular spline system".into()))?;

        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            m: m.iter().copied().collect(),
        })
    }

    pub fn x_min(&self) -> f64 {
        self.x[0]
    }

    pub fn x_max(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    /// Evaluate at `x`. Outside the knots the end polynomials are continued.
    pub fn eval(&self, x: f64) -> f64 {
        let last = self.x.len() - 2;
        let i = self.x.partition_point(|&k| k <= x).saturating_sub(1).min(last);
        let h = self.x[i + 1] - self.x[i];
        let t = x - self.x[i];
        let (m0, m1) = (self.m[i], self.m[i + 1]);
        let slope = (self.y[i + 1] - self.y[i]) / h - h * (2.0 * m0 + m1) / 6.0;
        self.y[i] + t * (slope + t * (0.5 * m0 + t * (m1 - m0) / (6.0 * h)))
    }

    /// Evaluate at `x`, NaN outside `[x_min, x_max]`.
    pub fn eval_within(&self, x: f64) -> f64 {
        if x < self.x_min() || x > self.x_max() {
            f64::NAN
        } else {
            self.eval(x)
        }
    }
}

/// Columns of a CSV table, sorted by `x`.
#[derive(Clone, Debug)]
pub struct OcvTable {
    x: Vec<f64>,
    columns: Vec<(String, Vec<f64>)>,
}

impl OcvTable {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        Self::from_csv_str(&text).map_err(|e| match e {
            ConfigError::Table(reason) => ConfigError::Table(format!("{}: {reason}", path.display())),
            other => other,
        })
    }

    pub fn from_csv_str(text: &str) -> Result<Self, ConfigError> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));
        let header: Vec<String> = lines
            .next()
            .ok_or_else(|| ConfigError::Table("empty table".into()))?
            .split(',')
            .map(|h| h.trim().to_string())
            .collect();
        let x_col = header
            .iter()
            .position(|h| h == "x")
            .ok_or_else(|| ConfigError::Table("no `x` column".into()))?;

        let mut rows: Vec<Vec<f64>> = Vec::new();
        for (k, line) in lines.enumerate() {
            let row = line
                .split(',')
                .map(|v| v.trim().parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ConfigError::Table(format!("row {}: {e}", k + 1)))?;
            if row.len() != header.len() {
                return Err(ConfigError::Table(format!(
                    "row {} has {} fields, header has {}",
                    k + 1,
                    row.len(),
                    header.len()
                )));
            }
            rows.push(row);
        }
        rows.sort_by(|a, b| a[x_col].total_cmp(&b[x_col]));

        let x = rows.iter().map(|r| r[x_col]).collect();
        let columns = header
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != x_col)
            .map(|(j, name)| (name.clone(), rows.iter().map(|r| r[j]).collect()))
            .collect();
        Ok(Self { x, columns })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn column(&self, name: &str) -> Result<&[f64], ConfigError> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
            .ok_or_else(|| ConfigError::Table(format!("no `{name}` column")))
    }

    pub fn spline(&self, column: &str) -> Result<CubicSpline, ConfigError> {
        CubicSpline::not_a_knot(&self.x, self.column(column)?)
    }
}

/// What a tabulated potential does outside the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutOfRange {
    /// NaN, which the residual reports as an invalid state.
    Invalid,
    Extrapolate,
}

/// A material whose equilibrium potential is replaced by a spline through
/// the `V` column of a table. Everything else comes from `base`.
#[derive(Clone, Debug)]
pub struct TabulatedOcv<M> {
    base: M,
    eeq: CubicSpline,
    out_of_range: OutOfRange,
}

impl<M: ActiveMaterial> TabulatedOcv<M> {
    pub fn new(base: M, table: &OcvTable, out_of_range: OutOfRange) -> Result<Self, ConfigError> {
        Ok(Self {
            base,
            eeq: table.spline("V")?,
            out_of_range,
        })
    }
}

impl<M: ActiveMaterial> ActiveMaterial for TabulatedOcv<M> {
    fn diffusivity(&self, x: f64, temp: f64, fluxdir: f64) -> f64 {
        self.base.diffusivity(x, temp, fluxdir)
    }

    fn exchange_current(&self, x: f64, c_li: f64, temp: f64, fluxdir: f64) -> f64 {
        self.base.exchange_current(x, c_li, temp, fluxdir)
    }

    fn equilibrium_potential(&self, x: f64, _temp: f64) -> f64 {
        match self.out_of_range {
            OutOfRange::Invalid => self.eeq.eval_within(x),
            OutOfRange::Extrapolate => self.eeq.eval(x),
        }
    }

    fn hysteresis_magnitude(&self, x: f64) -> f64 {
        self.base.hysteresis_magnitude(x)
    }

    fn alpha_a(&self) -> f64 {
        self.base.alpha_a()
    }

    fn alpha_c(&self) -> f64 {
        self.base.alpha_c()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::GraphiteFast;
    use approx::assert_abs_diff_eq;

    fn cubic(x: f64) -> f64 {
        x * x * x - 2.0 * x * x + 0.5
    }

    #[test]
    fn not_a_knot_reproduces_cubics() {
        let x = [0.0, 0.1, 0.35, 0.5, 0.8, 1.0];
        let y: Vec<f64> = x.iter().map(|&v| cubic(v)).collect();
        let s = CubicSpline::not_a_knot(&x, &y).unwrap();
        for v in [0.0, 0.05, 0.42, 0.77, 1.0, -0.2, 1.3] {
            assert_abs_diff_eq!(s.eval(v), cubic(v), epsilon = 1e-10);
        }
        assert!(s.eval_within(1.3).is_nan());
        assert_abs_diff_eq!(s.eval_within(0.42), cubic(0.42), epsilon = 1e-10);
    }

    #[test]
    fn spline_interpolates_the_knots() {
        let x: Vec<f64> = (0..12).map(|k| k as f64 / 11.0).collect();
        let y: Vec<f64> = x.iter().map(|v| (3.0 * v).sin()).collect();
        let s = CubicSpline::not_a_knot(&x, &y).unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            assert_abs_diff_eq!(s.eval(*xi), *yi, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(s.eval(0.5), 1.5f64.sin(), epsilon = 1e-4);
    }

    #[test]
    fn short_or_unsorted_data_is_rejected() {
        assert!(CubicSpline::not_a_knot(&[0.0, 0.5, 1.0], &[1.0, 2.0, 3.0]).is_err());
        assert!(CubicSpline::not_a_knot(&[0.0, 0.5, 0.5, 1.0], &[1.0, 2.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn csv_rows_are_sorted_by_x() {
        let table = OcvTable::from_csv_str(
            "x, V, M_hyst\n# comment\n0.9,3.0,0.01\n0.1,4.0,0.02\n0.5,3.5,0.03\n0.3,3.8,0.02\n",
        )
        .unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.column("V").unwrap(), &[4.0, 3.8, 3.5, 3.0]);
        assert!(table.column("V_avg").is_err());
        assert!(OcvTable::from_csv_str("x,V\n0.1,abc\n").is_err());
        assert!(OcvTable::from_csv_str("y,V\n0.1,1.0\n").is_err());
    }

    #[test]
    fn tabulated_potential_keeps_base_kinetics() {
        let base = GraphiteFast::new(0.5, 0.5, 30.53);
        let rows: String = (1..=20)
            .map(|k| {
                let x = k as f64 / 21.0;
                format!("{x},{}\n", base.equilibrium_potential(x, 300.0))
            })
            .collect();
        let table = OcvTable::from_csv_str(&format!("x,V\n{rows}")).unwrap();

        let bounded = TabulatedOcv::new(base.clone(), &table, OutOfRange::Invalid).unwrap();
        let extended = TabulatedOcv::new(base.clone(), &table, OutOfRange::Extrapolate).unwrap();

        let x = 10.0 / 21.0;
        assert_abs_diff_eq!(
            bounded.equilibrium_potential(x, 300.0),
            base.equilibrium_potential(x, 300.0),
            epsilon = 1e-12
        );
        assert!(bounded.equilibrium_potential(0.99, 300.0).is_nan());
        assert!(extended.equilibrium_potential(0.99, 300.0).is_finite());
        assert_eq!(
            bounded.exchange_current(0.4, 1.2, 300.0, 1.0),
            base.exchange_current(0.4, 1.2, 300.0, 1.0)
        );
        assert_eq!(bounded.hysteresis_magnitude(0.4), 0.03);
    }
}
