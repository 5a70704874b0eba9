use super::tabulated::{CubicSpline, OcvTable};
use super::{ActiveMaterial, arrhenius};
use crate::config::ConfigError;

/// LFP with tabulated equilibrium potential and hysteresis magnitude.
///
/// The table needs `V_avg` (mean of the charge and discharge branches) and
/// `M_hyst` columns. Both splines extrapolate past the data.
#[derive(Clone, Debug)]
pub struct LfpInterp {
    pub alpha_a: f64,
    pub alpha_c: f64,
    pub li_max: f64,
    eeq: CubicSpline,
    m_hyst: CubicSpline,
}

impl LfpInterp {
    pub fn new(alpha_a: f64, alpha_c: f64, li_max: f64, table: &OcvTable) -> Result<Self, ConfigError> {
        Ok(Self {
            alpha_a,
            alpha_c,
            li_max,
            eeq: table.spline("V_avg")?,
            m_hyst: table.spline("M_hyst")?,
        })
    }
}

impl ActiveMaterial for LfpInterp {
    fn diffusivity(&self, _x: f64, _temp: f64, _fluxdir: f64) -> f64 {
        4.014e-17
    }

    fn exchange_current(&self, x: f64, c_li: f64, temp: f64, _fluxdir: f64) -> f64 {
        let cs = self.li_max * x;
        0.27 * arrhenius(temp)
            * c_li.powf(self.alpha_a)
            * cs.powf(self.alpha_c)
            * (self.li_max - cs).powf(self.alpha_a)
    }

    fn equilibrium_potential(&self, x: f64, _temp: f64) -> f64 {
        self.eeq.eval(x)
    }

    fn hysteresis_magnitude(&self, x: f64) -> f64 {
        self.m_hyst.eval(x)
    }

    fn alpha_a(&self) -> f64 {
        self.alpha_a
    }

    fn alpha_c(&self) -> f64 {
        self.alpha_c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table() -> OcvTable {
        OcvTable::from_csv_str(
            "x,V_avg,M_hyst\n\
             0.05,3.60,0.030\n\
             0.20,3.45,0.020\n\
             0.50,3.42,0.015\n\
             0.80,3.40,0.020\n\
             0.95,3.20,0.030\n",
        )
        .unwrap()
    }

    #[test]
    fn splines_pass_through_the_table() {
        let lfp = LfpInterp::new(0.5, 0.5, 22.8, &table()).unwrap();
        assert_relative_eq!(lfp.equilibrium_potential(0.5, 300.0), 3.42, max_relative = 1e-12);
        assert_relative_eq!(lfp.hysteresis_magnitude(0.2), 0.02, max_relative = 1e-12);
        assert!(lfp.equilibrium_potential(0.99, 300.0).is_finite());
    }

    #[test]
    fn kinetics_follow_the_graphite_form_without_prefactor() {
        let lfp = LfpInterp::new(0.5, 0.5, 22.8, &table()).unwrap();
        assert_eq!(lfp.diffusivity(0.3, 350.0, 1.0), 4.014e-17);
        let expected = 0.27 * (1.2f64 * 22.8 * 0.4 * 22.8 * 0.6).sqrt();
        assert_relative_eq!(
            lfp.exchange_current(0.4, 1.2, 303.15, 0.0),
            expected,
            max_relative = 1e-12
        );
    }

    #[test]
    fn missing_columns_are_rejected() {
        let table = OcvTable::from_csv_str("x,V\n0.1,3.5\n0.4,3.4\n0.6,3.4\n0.9,3.2\n").unwrap();
        assert!(LfpInterp::new(0.5, 0.5, 22.8, &table).is_err());
    }
}
