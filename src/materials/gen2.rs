use super::ElectrolyteMaterial;

/// Gen2 carbonate electrolyte (LiPF6 in EC:EMC).
#[derive(Clone, Copy, Debug, Default)]
pub struct Gen2Electrolyte;

/// Conductivity coefficients: row k multiplies `c^(k+1)`, columns are T^4..T^0.
const KAPPA: [[f64; 5]; 4] = [
    [0.0, 0.0, 1.909446e-4, -8.038545e-2, 9.003410e+0],
    [-2.8875870e-8, 3.483638e-5, -1.583677e-2, 3.195295e+0, -2.414638e+2],
    [1.6537860e-8, -1.998760e-5, 9.071155e-3, -1.828064e+0, 1.380976e+2],
    [-2.7919650e-9, 3.377143e-6, -1.532707e-3, 3.090003e-1, -2.335671e+1],
];

impl ElectrolyteMaterial for Gen2Electrolyte {
    fn diffusivity(&self, c_li: f64, temp: f64) -> f64 {
        let tg = temp - (-24.83763 + 64.07366 * c_li);
        let exponent = (-0.568822600 - 1607.003 / tg)
            + (-0.810872100 + 475.291 / tg) * c_li
            + (-0.005192312 - 33.43827 / tg) * c_li * c_li;
        1e-4 * 10f64.powf(exponent)
    }

    fn transference(&self, c_li: f64, temp: f64) -> f64 {
        let t2 = temp * temp;
        (-0.0000002876102 * t2 + 0.0002077407 * temp - 0.03881203) * c_li * c_li
            + (0.0000011614630 * t2 - 0.0008682500 * temp + 0.17772660) * c_li
            + (-0.0000006766258 * t2 + 0.0006389189 * temp + 0.30917610)
    }

    fn conductivity(&self, c_li: f64, temp: f64) -> f64 {
        let mut c_pow = 1.0;
        KAPPA
            .iter()
            .map(|row| {
                c_pow *= c_li;
                super::polyval(row, temp) * c_pow
            })
            .sum()
    }

    fn thermodynamic_factor(&self, c_li: f64, temp: f64) -> f64 {
        0.540 * (329.0 / temp).exp() * c_li * c_li - 0.00225 * (1360.0 / temp).exp() * c_li
            + 0.341 * (261.0 / temp).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn properties_at_reference_concentration() {
        let el = Gen2Electrolyte;
        assert_abs_diff_eq!(el.diffusivity(1.2, 300.0), 1.190e-10, epsilon = 1e-12);
        assert_abs_diff_eq!(el.transference(1.2, 300.0), 0.463, epsilon = 1e-3);
        assert_abs_diff_eq!(el.conductivity(1.2, 300.0), 0.911, epsilon = 1e-3);
        assert_abs_diff_eq!(el.thermodynamic_factor(1.2, 300.0), 2.891, epsilon = 1e-3);
    }

    #[test]
    fn conductivity_vanishes_without_salt() {
        assert_eq!(Gen2Electrolyte.conductivity(0.0, 300.0), 0.0);
    }
}
