//! Material property providers.
//!
//! The residual only talks to [`ActiveMaterial`] and [`ElectrolyteMaterial`].
//! Concrete chemistries are registered in [`ActiveMaterialKind`] and
//! [`ElectrolyteKind`] and resolved once, when a cell is built.
//!
//! The `*Slow` variants and LFP read their potentials from a CSV table
//! (see [`tabulated`]) named by the electrode's `ocv_table`.

pub mod gen2;
pub mod graphite;
pub mod lfp;
pub mod nmc532;
pub mod tabulated;

use std::fmt::Debug;
use std::sync::Arc;

use crate::config::ConfigError;

pub use gen2::Gen2Electrolyte;
pub use graphite::GraphiteFast;
pub use lfp::LfpInterp;
pub use nmc532::Nmc532Fast;
pub use tabulated::{CubicSpline, OcvTable, OutOfRange, TabulatedOcv};

/// Graphite kinetics with a tabulated potential.
pub type GraphiteSlow = TabulatedOcv<GraphiteFast>;
/// NMC532 kinetics with a tabulated potential.
pub type Nmc532Slow = TabulatedOcv<Nmc532Fast>;

/// Kinetic, transport and thermodynamic properties of an intercalation
/// material.
///
/// `fluxdir` is +1 while lithiating, -1 while delithiating and 0 at rest.
/// Materials without direction-dependent parameters ignore it.
pub trait ActiveMaterial: Debug + Send + Sync {
    /// Solid-phase diffusivity [m2/s] at intercalation fraction `x`.
    fn diffusivity(&self, x: f64, temp: f64, fluxdir: f64) -> f64;

    /// Exchange current density [A/m2].
    fn exchange_current(&self, x: f64, c_li: f64, temp: f64, fluxdir: f64) -> f64;

    /// Equilibrium potential [V] at surface fraction `x`.
    fn equilibrium_potential(&self, x: f64, temp: f64) -> f64;

    /// Hysteresis magnitude [V], scaled by the hysteresis state.
    fn hysteresis_magnitude(&self, x: f64) -> f64;

    fn alpha_a(&self) -> f64;

    fn alpha_c(&self) -> f64;
}

/// Transport properties of a binary electrolyte.
pub trait ElectrolyteMaterial: Debug + Send + Sync {
    /// Li+ diffusivity [m2/s].
    fn diffusivity(&self, c_li: f64, temp: f64) -> f64;

    /// Li+ transference number [-].
    fn transference(&self, c_li: f64, temp: f64) -> f64;

    /// Ionic conductivity [S/m].
    fn conductivity(&self, c_li: f64, temp: f64) -> f64;

    /// Thermodynamic factor [-].
    fn thermodynamic_factor(&self, c_li: f64, temp: f64) -> f64;
}

/// Registered electrode chemistries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActiveMaterialKind {
    GraphiteFast,
    /// Tabulated potential, invalid outside the table.
    GraphiteSlow,
    /// Tabulated potential, extrapolated outside the table.
    GraphiteSlowExtrap,
    Nmc532Fast,
    Nmc532Slow,
    Nmc532SlowExtrap,
    LfpInterp,
}

impl ActiveMaterialKind {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().as_str() {
            "graphite" | "graphitefast" => Ok(Self::GraphiteFast),
            "graphiteslow" => Ok(Self::GraphiteSlow),
            "graphiteslowextrap" => Ok(Self::GraphiteSlowExtrap),
            "nmc532" | "nmc532fast" => Ok(Self::Nmc532Fast),
            "nmc532slow" => Ok(Self::Nmc532Slow),
            "nmc532slowextrap" => Ok(Self::Nmc532SlowExtrap),
            "lfp" | "lfpinterp" => Ok(Self::LfpInterp),
            _ => Err(ConfigError::UnknownMaterial(name.to_string())),
        }
    }

    /// Whether building this material requires an OCV table.
    pub fn needs_table(self) -> bool {
        !matches!(self, Self::GraphiteFast | Self::Nmc532Fast)
    }

    pub fn build(
        self,
        alpha_a: f64,
        alpha_c: f64,
        li_max: f64,
        table: Option<&OcvTable>,
    ) -> Result<Arc<dyn ActiveMaterial>, ConfigError> {
        let graphite = || GraphiteFast::new(alpha_a, alpha_c, li_max);
        let nmc = || Nmc532Fast::new(alpha_a, alpha_c);
        let tabulated =
            || table.ok_or_else(|| ConfigError::Table(format!("{self:?} needs an ocv_table")));

        let material: Arc<dyn ActiveMaterial> = match self {
            Self::GraphiteFast => Arc::new(graphite()),
            Self::Nmc532Fast => Arc::new(nmc()),
            Self::GraphiteSlow => Arc::new(GraphiteSlow::new(graphite(), tabulated()?, OutOfRange::Invalid)?),
            Self::GraphiteSlowExtrap => {
                Arc::new(GraphiteSlow::new(graphite(), tabulated()?, OutOfRange::Extrapolate)?)
            }
            Self::Nmc532Slow => Arc::new(Nmc532Slow::new(nmc(), tabulated()?, OutOfRange::Invalid)?),
            Self::Nmc532SlowExtrap => {
                Arc::new(Nmc532Slow::new(nmc(), tabulated()?, OutOfRange::Extrapolate)?)
            }
            Self::LfpInterp => Arc::new(LfpInterp::new(alpha_a, alpha_c, li_max, tabulated()?)?),
        };
        Ok(material)
    }
}

/// Registered electrolytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElectrolyteKind {
    Gen2,
}

impl ElectrolyteKind {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().as_str() {
            "gen2" | "gen2electrolyte" => Ok(Self::Gen2),
            _ => Err(ConfigError::UnknownMaterial(name.to_string())),
        }
    }

    pub fn build(self) -> Arc<dyn ElectrolyteMaterial> {
        match self {
            Self::Gen2 => Arc::new(Gen2Electrolyte),
        }
    }
}

/// Arrhenius factor shared by the fast materials, referenced to 303.15 K
/// with a 30 MJ/kmol activation energy.
pub(crate) fn arrhenius(temp: f64) -> f64 {
    use crate::physics::constants::R;
    (-30e6 / R * (1.0 / temp - 1.0 / 303.15)).exp()
}

/// Horner evaluation, highest power first.
pub(crate) fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().fold(0.0, |acc, c| acc * x + c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_names() {
        assert_eq!(ActiveMaterialKind::from_name("Graphite").unwrap(), ActiveMaterialKind::GraphiteFast);
        assert_eq!(ActiveMaterialKind::from_name("NMC532Fast").unwrap(), ActiveMaterialKind::Nmc532Fast);
        assert_eq!(
            ActiveMaterialKind::from_name("GraphiteSlowExtrap").unwrap(),
            ActiveMaterialKind::GraphiteSlowExtrap
        );
        assert_eq!(ActiveMaterialKind::from_name("NMC532Slow").unwrap(), ActiveMaterialKind::Nmc532Slow);
        assert_eq!(ActiveMaterialKind::from_name("lfp").unwrap(), ActiveMaterialKind::LfpInterp);
        assert_eq!(ElectrolyteKind::from_name("Gen2Electrolyte").unwrap(), ElectrolyteKind::Gen2);
        assert!(ActiveMaterialKind::from_name("lco").is_err());
        assert!(ElectrolyteKind::from_name("water").is_err());
    }

    #[test]
    fn tabulated_kinds_need_a_table() {
        assert!(!ActiveMaterialKind::GraphiteFast.needs_table());
        assert!(ActiveMaterialKind::Nmc532SlowExtrap.needs_table());
        assert!(ActiveMaterialKind::GraphiteSlow.build(0.5, 0.5, 30.53, None).is_err());
        assert!(ActiveMaterialKind::GraphiteFast.build(0.5, 0.5, 30.53, None).is_ok());

        let table = OcvTable::from_csv_str("x,V
0.3,4.2
0.5,4.0
0.7,3.8
0.9,3.6
").unwrap();
        let nmc = ActiveMaterialKind::Nmc532Slow.build(0.5, 0.5, 49.6, Some(&table)).unwrap();
        assert!((nmc.equilibrium_potential(0.5, 300.0) - 4.0).abs() < 1e-12);
        assert!(nmc.equilibrium_potential(0.95, 300.0).is_nan());
        let nmc = ActiveMaterialKind::Nmc532SlowExtrap.build(0.5, 0.5, 49.6, Some(&table)).unwrap();
        assert!((nmc.equilibrium_potential(0.95, 300.0) - 3.55).abs() < 1e-12);
    }

    #[test]
    fn polyval_matches_direct_sum() {
        let c = [2.0, -1.0, 0.5];
        assert_eq!(polyval(&c, 3.0), 2.0 * 9.0 - 3.0 + 0.5);
        assert_eq!(arrhenius(303.15), 1.0);
    }
}
