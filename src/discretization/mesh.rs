/// A one-dimensional finite-volume grid.
///
/// Control volume `i` spans `[minus[i], plus[i]]` and is represented by its
/// center `centers[i]`. Neighboring volumes share interfaces, so
/// `plus[i] == minus[i + 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub minus: Vec<f64>,
    pub plus: Vec<f64>,
    pub centers: Vec<f64>,
}

impl Mesh {
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// Width of control volume `i`.
    pub fn width(&self, i: usize) -> f64 {
        self.plus[i] - self.minus[i]
    }

    pub fn widths(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.width(i)).collect()
    }

    /// First interface coordinate.
    pub fn start(&self) -> f64 {
        self.minus.first().copied().unwrap_or(0.0)
    }

    /// Last interface coordinate.
    pub fn end(&self) -> f64 {
        self.plus.last().copied().unwrap_or(0.0)
    }

    /// Concatenates meshes in order. Callers shift them so that each part
    /// starts where the previous one ends.
    pub fn concat(parts: &[&Mesh]) -> Self {
        let mut out = Mesh {
            minus: Vec::new(),
            plus: Vec::new(),
            centers: Vec::new(),
        };
        for part in parts {
            out.minus.extend_from_slice(&part.minus);
            out.plus.extend_from_slice(&part.plus);
            out.centers.extend_from_slice(&part.centers);
        }
        out
    }

    /// Interpolation weights between neighboring centers, one pair per
    /// interior interface.
    ///
    /// `wt_m[i]` belongs to volume `i` and `wt_p[i]` to volume `i + 1`. Each
    /// weight is the half-width of the volume divided by the center-to-center
    /// distance, so the pair sums to one on a stacked uniform grid.
    pub fn interface_weights(&self) -> (Vec<f64>, Vec<f64>) {
        let n = self.len().saturating_sub(1);
        let mut wt_m = Vec::with_capacity(n);
        let mut wt_p = Vec::with_capacity(n);
        for i in 0..n {
            let dist = self.centers[i + 1] - self.centers[i];
            wt_m.push(0.5 * self.width(i) / dist);
            wt_p.push(0.5 * self.width(i + 1) / dist);
        }
        (wt_m, wt_p)
    }
}
