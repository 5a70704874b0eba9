use std::sync::Arc;

use crate::config::{BatteryConfig, ElectrodeConfig, ElectrolyteConfig, SeparatorConfig};
use crate::config::ConfigError;
use crate::discretization::generator::uniform_mesh;
use crate::discretization::mesh::Mesh;
use crate::discretization::pointer::{DomainKind, DomainPointers, VarDecl, VarKind};
use crate::materials::{
    ActiveMaterial, ActiveMaterialKind, ElectrolyteKind, ElectrolyteMaterial, OcvTable,
};

/// Intercalation fraction of the solid, per (x, r) node.
pub const XS: &str = "xs";
/// Solid-phase potential.
pub const PHI_S: &str = "phi_s";
/// Li+ concentration in the electrolyte.
pub const C_E: &str = "c_e";
/// Electrolyte potential.
pub const PHI_E: &str = "phi_e";
/// Unitless hysteresis state.
pub const HYST: &str = "hyst";

pub const ELECTRODE_VARS: [VarDecl; 4] = [
    VarDecl::new(XS, VarKind::MacroParticle),
    VarDecl::new(PHI_S, VarKind::Macro),
    VarDecl::new(C_E, VarKind::Macro),
    VarDecl::new(PHI_E, VarKind::Macro),
];

pub const ELECTRODE_HYST_VARS: [VarDecl; 5] = [
    VarDecl::new(XS, VarKind::MacroParticle),
    VarDecl::new(PHI_S, VarKind::Macro),
    VarDecl::new(C_E, VarKind::Macro),
    VarDecl::new(PHI_E, VarKind::Macro),
    VarDecl::new(HYST, VarKind::Macro),
];

pub const SEPARATOR_VARS: [VarDecl; 2] = [
    VarDecl::new(C_E, VarKind::Macro),
    VarDecl::new(PHI_E, VarKind::Macro),
];

#[derive(Clone, Debug)]
pub struct Battery {
    pub cap: f64,  // [A*h]
    pub temp: f64, // [K]
    pub area: f64, // [m2]
}

impl From<&BatteryConfig> for Battery {
    fn from(c: &BatteryConfig) -> Self {
        Self {
            cap: c.cap,
            temp: c.temp,
            area: c.area,
        }
    }
}

/// Electrolyte with its degradation multipliers folded into the property
/// getters.
#[derive(Clone, Debug)]
pub struct Electrolyte {
    pub li_0: f64,
    pub d_deg: f64,
    pub t0_deg: f64,
    pub kappa_deg: f64,
    pub gamma_deg: f64,
    pub material: Arc<dyn ElectrolyteMaterial>,
}

impl Electrolyte {
    pub fn from_config(c: &ElectrolyteConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            li_0: c.li_0,
            d_deg: c.d_deg,
            t0_deg: c.t0_deg,
            kappa_deg: c.kappa_deg,
            gamma_deg: c.gamma_deg,
            material: ElectrolyteKind::from_name(&c.material)?.build(),
        })
    }

    pub fn diffusivity(&self, c_li: f64, temp: f64) -> f64 {
        self.d_deg * self.material.diffusivity(c_li, temp)
    }

    pub fn transference(&self, c_li: f64, temp: f64) -> f64 {
        self.t0_deg * self.material.transference(c_li, temp)
    }

    pub fn conductivity(&self, c_li: f64, temp: f64) -> f64 {
        self.kappa_deg * self.material.conductivity(c_li, temp)
    }

    pub fn thermodynamic_factor(&self, c_li: f64, temp: f64) -> f64 {
        self.gamma_deg * self.material.thermodynamic_factor(c_li, temp)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hysteresis {
    pub g_hyst: f64,
    pub hyst0: f64,
}

/// Porous electrode with its meshes, pointers and derived quantities.
#[derive(Clone, Debug)]
pub struct Electrode {
    pub kind: DomainKind,
    pub thick: f64,
    pub r_s: f64,
    pub eps_s: f64,
    pub eps_el: f64,
    pub eps_cbd: f64,
    pub eps_void: f64,
    pub eps_am: f64,
    pub p_sol: f64,
    pub p_liq: f64,
    pub li_max: f64,
    pub x_0: f64,
    pub i0_deg: f64,
    pub ds_deg: f64,
    /// Bulk solid conductivity [S/m].
    pub sigma_s: f64,
    /// Specific active surface area [1/m].
    pub a_s: f64,
    pub material: Arc<dyn ActiveMaterial>,
    pub hysteresis: Option<Hysteresis>,
    pub x_mesh: Mesh,
    pub r_mesh: Mesh,
    /// Radial interface weights, see [`Mesh::interface_weights`].
    pub r_wt_m: Vec<f64>,
    pub r_wt_p: Vec<f64>,
    pub ptr: DomainPointers,
    /// Global indices of `xs`, x-major with the radial index contiguous.
    pub xs_idx: Vec<usize>,
    pub phis_idx: Vec<usize>,
    pub ce_idx: Vec<usize>,
    pub phie_idx: Vec<usize>,
    pub hyst_idx: Option<Vec<usize>>,
}

impl Electrode {
    /// Variables declared by an electrode with or without hysteresis.
    pub fn declarations(c: &ElectrodeConfig) -> &'static [VarDecl] {
        if c.hysteresis.is_some() {
            &ELECTRODE_HYST_VARS
        } else {
            &ELECTRODE_VARS
        }
    }

    /// `x_mesh` must already be shifted to the electrode's position in the
    /// cell and `ptr` must come from the cell-wide pointer map.
    pub fn new(
        kind: DomainKind,
        c: &ElectrodeConfig,
        x_mesh: Mesh,
        ptr: DomainPointers,
    ) -> Result<Self, ConfigError> {
        if x_mesh.len() != c.nx || ptr.nx != c.nx || ptr.nr != c.nr {
            return Err(ConfigError::invalid(
                format!("{}.nx", kind.name()),
                "mesh and pointer discretizations disagree",
            ));
        }
        let r_mesh = uniform_mesh(c.r_s, c.nr, 0.0)?;
        let (r_wt_m, r_wt_p) = r_mesh.interface_weights();
        let table = c.ocv_table.as_deref().map(OcvTable::from_file).transpose()?;
        let material = ActiveMaterialKind::from_name(&c.material)?.build(
            c.alpha_a,
            c.alpha_c,
            c.li_max,
            table.as_ref(),
        )?;

        let eps_am = c.eps_s - c.eps_cbd;
        let hysteresis = c.hysteresis.as_ref().map(|h| Hysteresis {
            g_hyst: h.g_hyst,
            hyst0: h.hyst0,
        });

        let hyst_idx = hysteresis.map(|_| ptr.indices(HYST));
        Ok(Self {
            kind,
            thick: c.thick,
            r_s: c.r_s,
            eps_s: c.eps_s,
            eps_el: c.eps_el,
            eps_cbd: c.eps_cbd,
            eps_void: 1.0 - c.eps_s - c.eps_el,
            eps_am,
            p_sol: c.p_sol,
            p_liq: c.p_liq,
            li_max: c.li_max,
            x_0: c.x_0,
            i0_deg: c.i0_deg,
            ds_deg: c.ds_deg,
            sigma_s: 10.0 * c.eps_s,
            a_s: 3.0 * eps_am / c.r_s,
            material,
            hysteresis,
            xs_idx: ptr.indices(XS),
            phis_idx: ptr.indices(PHI_S),
            ce_idx: ptr.indices(C_E),
            phie_idx: ptr.indices(PHI_E),
            hyst_idx,
            x_mesh,
            r_mesh,
            r_wt_m,
            r_wt_p,
            ptr,
        })
    }

    pub fn nx(&self) -> usize {
        self.x_mesh.len()
    }

    pub fn nr(&self) -> usize {
        self.r_mesh.len()
    }

    /// Effective solid conductivity with the Bruggeman correction.
    pub fn sigma_eff(&self) -> f64 {
        self.sigma_s * self.eps_s.powf(self.p_sol)
    }

    /// Index of `xs` at node `ix`, radial node `ir`.
    pub fn xs_at(&self, ix: usize, ir: usize) -> usize {
        self.xs_idx[ix * self.nr() + ir]
    }

    /// Index of the outermost radial `xs` at node `ix`.
    pub fn xs_surface(&self, ix: usize) -> usize {
        self.xs_at(ix, self.nr() - 1)
    }

    /// Equilibrium potential plus hysteresis at surface fraction `x_surf`.
    pub fn open_circuit(&self, x_surf: f64, hyst: f64, temp: f64) -> (f64, f64) {
        let eeq = self.material.equilibrium_potential(x_surf, temp);
        let h = if self.hysteresis.is_some() {
            self.material.hysteresis_magnitude(x_surf) * hyst
        } else {
            0.0
        };
        (eeq, h)
    }
}

#[derive(Clone, Debug)]
pub struct Separator {
    pub thick: f64,
    pub eps_el: f64,
    pub p_liq: f64,
    pub x_mesh: Mesh,
    pub ptr: DomainPointers,
    pub ce_idx: Vec<usize>,
    pub phie_idx: Vec<usize>,
}

impl Separator {
    pub fn new(c: &SeparatorConfig, x_mesh: Mesh, ptr: DomainPointers) -> Result<Self, ConfigError> {
        if x_mesh.len() != c.nx || ptr.nx != c.nx {
            return Err(ConfigError::invalid(
                "separator.nx",
                "mesh and pointer discretizations disagree",
            ));
        }
        Ok(Self {
            thick: c.thick,
            eps_el: c.eps_el,
            p_liq: c.p_liq,
            ce_idx: ptr.indices(C_E),
            phie_idx: ptr.indices(PHI_E),
            x_mesh,
            ptr,
        })
    }

    pub fn nx(&self) -> usize {
        self.x_mesh.len()
    }
}
