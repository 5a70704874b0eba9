//! Cell configuration.
//!
//! Parameters are grouped per domain the same way they appear in a TOML
//! file:
//!
//! ```toml
//! [battery]
//! cap = 2.0
//! temp = 300.0
//! area = 0.1
//!
//! [anode]
//! nx = 10
//! nr = 10
//! thick = 85e-6
//! # ...
//! ```
//!
//! Sections that are left out fall back to the reference graphite/NMC532
//! cell. The `battery`, `separator`, `electrolyte` and `solver` tables may
//! also be partial, missing keys taking the reference values. Electrode
//! tables must list their geometry, loading and material; only Bruggeman
//! exponents, symmetry factors, degradation multipliers, `ocv_table` and
//! submodels may be left out.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::materials::{ActiveMaterialKind, ElectrolyteKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },
    #[error("unknown material `{0}`")]
    UnknownMaterial(String),
    #[error("invalid OCV table: {0}")]
    Table(String),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

fn one() -> f64 {
    1.0
}

fn half() -> f64 {
    0.5
}

fn bruggeman() -> f64 {
    1.5
}

fn gen2() -> String {
    "gen2".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatteryConfig {
    /// Nominal capacity [A*h].
    pub cap: f64,
    /// Temperature [K].
    pub temp: f64,
    /// Area normal to the current collectors [m2].
    pub area: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            cap: 2.5,
            temp: 300.0,
            area: 0.1,
        }
    }
}

/// Optional hysteresis submodel of an electrode.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HysteresisConfig {
    /// Transition rate, larger values move `h` between -1 and +1 faster.
    pub g_hyst: f64,
    /// Initial unitless hysteresis state in [-1, 1].
    pub hyst0: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ElectrodeConfig {
    pub nx: usize,
    pub nr: usize,
    /// Thickness [m].
    pub thick: f64,
    /// Representative particle radius [m].
    pub r_s: f64,
    /// Solid-phase volume fraction, active material plus binder [-].
    pub eps_s: f64,
    /// Electrolyte volume fraction [-].
    pub eps_el: f64,
    /// Carbon-binder volume fraction [-].
    pub eps_cbd: f64,
    #[serde(default = "bruggeman")]
    pub p_sol: f64,
    #[serde(default = "bruggeman")]
    pub p_liq: f64,
    #[serde(default = "half")]
    pub alpha_a: f64,
    #[serde(default = "half")]
    pub alpha_c: f64,
    /// Maximum solid-phase lithium concentration [kmol/m3].
    pub li_max: f64,
    /// Initial intercalation fraction [-].
    pub x_0: f64,
    #[serde(default = "one")]
    pub i0_deg: f64,
    #[serde(default = "one")]
    pub ds_deg: f64,
    pub material: String,
    /// CSV table for materials with tabulated potentials. Relative paths
    /// are resolved against the configuration file.
    #[serde(default)]
    pub ocv_table: Option<PathBuf>,
    #[serde(default)]
    pub hysteresis: Option<HysteresisConfig>,
}

impl ElectrodeConfig {
    pub fn reference_anode() -> Self {
        Self {
            nx: 10,
            nr: 10,
            thick: 85e-6,
            r_s: 4e-6,
            eps_s: 0.6,
            eps_el: 0.3,
            eps_cbd: 0.05,
            p_sol: 1.5,
            p_liq: 1.5,
            alpha_a: 0.5,
            alpha_c: 0.5,
            li_max: 30.53,
            x_0: 0.8,
            i0_deg: 1.0,
            ds_deg: 1.0,
            material: "graphite".to_string(),
            ocv_table: None,
            hysteresis: None,
        }
    }

    pub fn reference_cathode() -> Self {
        Self {
            nx: 10,
            nr: 10,
            thick: 70e-6,
            r_s: 1.8e-6,
            eps_s: 0.6,
            eps_el: 0.3,
            eps_cbd: 0.05,
            p_sol: 1.5,
            p_liq: 1.5,
            alpha_a: 0.5,
            alpha_c: 0.5,
            li_max: 49.6,
            x_0: 0.4,
            i0_deg: 1.0,
            ds_deg: 1.0,
            material: "nmc532".to_string(),
            ocv_table: None,
            hysteresis: None,
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let field = |f: &str| format!("{name}.{f}");
        if self.nx == 0 {
            return Err(ConfigError::invalid(field("nx"), "must be at least 1"));
        }
        if self.nr == 0 {
            return Err(ConfigError::invalid(field("nr"), "must be at least 1"));
        }
        positive(&field("thick"), self.thick)?;
        positive(&field("r_s"), self.r_s)?;
        positive(&field("li_max"), self.li_max)?;
        positive(&field("i0_deg"), self.i0_deg)?;
        positive(&field("ds_deg"), self.ds_deg)?;
        positive(&field("alpha_a"), self.alpha_a)?;
        positive(&field("alpha_c"), self.alpha_c)?;
        fraction(&field("eps_s"), self.eps_s)?;
        fraction(&field("eps_el"), self.eps_el)?;
        fraction(&field("x_0"), self.x_0)?;
        if !(self.eps_cbd >= 0.0 && self.eps_cbd < self.eps_s) {
            return Err(ConfigError::invalid(
                field("eps_cbd"),
                "must be non-negative and smaller than eps_s",
            ));
        }
        if 1.0 - self.eps_s - self.eps_el < 0.0 {
            return Err(ConfigError::invalid(field("eps_s"), "eps_s + eps_el > 1.0"));
        }
        let kind = ActiveMaterialKind::from_name(&self.material)?;
        if kind.needs_table() && self.ocv_table.is_none() {
            return Err(ConfigError::invalid(
                field("ocv_table"),
                format!("required by material `{}`", self.material),
            ));
        }
        if let Some(h) = &self.hysteresis {
            if !(h.g_hyst.is_finite() && h.g_hyst >= 0.0) {
                return Err(ConfigError::invalid(field("hysteresis.g_hyst"), "must be non-negative"));
            }
            if !(-1.0..=1.0).contains(&h.hyst0) {
                return Err(ConfigError::invalid(field("hysteresis.hyst0"), "must be in [-1, 1]"));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SeparatorConfig {
    pub nx: usize,
    pub thick: f64,
    pub eps_el: f64,
    #[serde(default = "bruggeman")]
    pub p_liq: f64,
}

impl Default for SeparatorConfig {
    fn default() -> Self {
        Self {
            nx: 10,
            thick: 25e-6,
            eps_el: 0.47,
            p_liq: 1.5,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ElectrolyteConfig {
    /// Initial Li+ concentration [kmol/m3].
    pub li_0: f64,
    #[serde(default = "one")]
    pub d_deg: f64,
    #[serde(default = "one")]
    pub t0_deg: f64,
    #[serde(default = "one")]
    pub kappa_deg: f64,
    #[serde(default = "one")]
    pub gamma_deg: f64,
    #[serde(default = "gen2")]
    pub material: String,
}

impl Default for ElectrolyteConfig {
    fn default() -> Self {
        Self {
            li_0: 1.2,
            d_deg: 1.0,
            t0_deg: 1.0,
            kappa_deg: 1.0,
            gamma_deg: 1.0,
            material: gen2(),
        }
    }
}

/// Linear solver requested from the integrator.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinearSolverChoice {
    Dense,
    #[default]
    Banded,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
    pub rtol: f64,
    pub atol: f64,
    /// Upper bound on the internal step [s], zero for no bound.
    pub max_step: f64,
    pub linear_solver: LinearSolverChoice,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-6,
            atol: 1e-9,
            max_step: 0.0,
            linear_solver: LinearSolverChoice::Banded,
        }
    }
}

/// Complete description of a cell, prior to building.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CellConfig {
    #[serde(default)]
    pub battery: BatteryConfig,
    #[serde(default = "ElectrodeConfig::reference_anode")]
    pub anode: ElectrodeConfig,
    #[serde(default)]
    pub separator: SeparatorConfig,
    #[serde(default = "ElectrodeConfig::reference_cathode")]
    pub cathode: ElectrodeConfig,
    #[serde(default)]
    pub electrolyte: ElectrolyteConfig,
    #[serde(default)]
    pub solver: SolverConfig,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            battery: BatteryConfig::default(),
            anode: ElectrodeConfig::reference_anode(),
            separator: SeparatorConfig::default(),
            cathode: ElectrodeConfig::reference_cathode(),
            electrolyte: ElectrolyteConfig::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl CellConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: CellConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(dir) = path.as_ref().parent() {
            for ed in [&mut config.anode, &mut config.cathode] {
                if let Some(table) = ed.ocv_table.as_mut().filter(|t| t.is_relative()) {
                    *table = dir.join(&*table);
                }
            }
        }
        Ok(config)
    }

    /// Set the macro and particle discretization of every domain at once.
    pub fn with_discretization(mut self, nx: usize, nr: usize) -> Self {
        self.anode.nx = nx;
        self.anode.nr = nr;
        self.separator.nx = nx;
        self.cathode.nx = nx;
        self.cathode.nr = nr;
        self
    }

    /// Range checks for every parameter. Runs before any mesh is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("battery.cap", self.battery.cap)?;
        positive("battery.temp", self.battery.temp)?;
        positive("battery.area", self.battery.area)?;

        self.anode.validate("anode")?;
        self.cathode.validate("cathode")?;

        if self.separator.nx == 0 {
            return Err(ConfigError::invalid("separator.nx", "must be at least 1"));
        }
        positive("separator.thick", self.separator.thick)?;
        fraction("separator.eps_el", self.separator.eps_el)?;

        positive("electrolyte.li_0", self.electrolyte.li_0)?;
        positive("electrolyte.d_deg", self.electrolyte.d_deg)?;
        positive("electrolyte.t0_deg", self.electrolyte.t0_deg)?;
        positive("electrolyte.kappa_deg", self.electrolyte.kappa_deg)?;
        positive("electrolyte.gamma_deg", self.electrolyte.gamma_deg)?;
        ElectrolyteKind::from_name(&self.electrolyte.material)?;

        positive("solver.rtol", self.solver.rtol)?;
        positive("solver.atol", self.solver.atol)?;
        if !(self.solver.max_step >= 0.0) {
            return Err(ConfigError::invalid("solver.max_step", "must be non-negative"));
        }
        Ok(())
    }
}

fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be positive, got {value}")))
    }
}

fn fraction(field: &str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be in (0, 1], got {value}")))
    }
}
