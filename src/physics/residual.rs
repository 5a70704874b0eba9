//! DAE residual of the P2D cell.
//!
//! Rows follow the pointer map. Differential rows carry their mass-matrix
//! term (`Li_max * xs'`, `eps_el * ce'`, `h'`); algebraic rows are pure
//! charge balances. The anode's first solid row pins the potential
//! reference, and in voltage or power mode the cathode's last solid row
//! becomes the control constraint.

use super::DaeModel;
use super::constants::{F, R};
use super::control::ControlMode;
use super::kinetics::{butler_volmer, overpotential, sign};
use crate::discretization::operators::{
    arithmetic_face, div_r, div_x, grad_r, grad_x, harmonic_face,
};
use crate::discretization::pointer::DomainKind;
use crate::models::p2d::{Electrode, P2dCell};
use crate::numerics::events::Quantity;
use crate::numerics::timing::record_residual;

/// Value written in place of any non-finite residual entry.
pub const INVALID_RESIDUAL: f64 = 1e30;

/// Cell-level quantities that limits and outputs are expressed in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observables {
    pub time_s: f64,
    pub current_a: f64,
    pub current_c: f64,
    pub voltage_v: f64,
    pub power_w: f64,
}

impl Observables {
    pub fn get(&self, quantity: Quantity) -> f64 {
        match quantity {
            Quantity::TimeS => self.time_s,
            Quantity::TimeMin => self.time_s / 60.0,
            Quantity::TimeH => self.time_s / 3600.0,
            Quantity::CurrentA => self.current_a,
            Quantity::CurrentC => self.current_c,
            Quantity::VoltageV => self.voltage_v,
            Quantity::PowerW => self.power_w,
        }
    }
}

/// Ancillary fields computed alongside the residual.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    /// Applied current density [A/m2], positive while charging.
    pub i_ext: f64,
    /// Divergence of the electrolyte current per control volume.
    pub div_i_an: Vec<f64>,
    pub div_i_sep: Vec<f64>,
    pub div_i_ca: Vec<f64>,
    /// Li+ production rate at the particle surfaces [kmol/m2/s].
    pub sdot_an: Vec<f64>,
    pub sdot_ca: Vec<f64>,
    /// Solid plus electrolyte current at the plus face of every control
    /// volume of the cell.
    pub sum_ip: Vec<f64>,
    /// Electrolyte current at every interface of the cell, ends included.
    pub i_el_x: Vec<f64>,
}

struct Reaction {
    sdot: Vec<f64>,
    fluxdir: Vec<f64>,
}

/// Intermediate fields of one evaluation.
struct Fields {
    i_ext: f64,
    an: Reaction,
    ca: Reaction,
    i_ed_an: Vec<f64>,
    i_ed_ca: Vec<f64>,
    i_el: Vec<f64>,
}

/// Residual, diagnostics and observables of a built cell under one control
/// mode.
#[derive(Clone, Debug)]
pub struct ResidualAssembler<'a> {
    cell: &'a P2dCell,
    mode: ControlMode,
    /// Time already elapsed before the current step [s].
    t_offset: f64,
}

impl<'a> ResidualAssembler<'a> {
    pub fn new(cell: &'a P2dCell, mode: ControlMode) -> Self {
        Self {
            cell,
            mode,
            t_offset: 0.0,
        }
    }

    pub fn with_offset(mut self, t_offset: f64) -> Self {
        self.t_offset = t_offset;
        self
    }

    pub fn cell(&self) -> &P2dCell {
        self.cell
    }

    pub fn mode(&self) -> &ControlMode {
        &self.mode
    }

    pub fn t_offset(&self) -> f64 {
        self.t_offset
    }

    /// Fill `res` with `M * yp - f(t, y)`.
    pub fn residual(&self, t: f64, y: &[f64], yp: &[f64], res: &mut [f64]) {
        record_residual(|| {
            self.assemble(t, y, yp, res);
        });
    }

    /// Ancillary fields at `(t, y, yp)`. The residual itself is discarded.
    pub fn diagnostics(&self, t: f64, y: &[f64], yp: &[f64]) -> Diagnostics {
        let cell = self.cell;
        let mut res = vec![0.0; cell.len()];
        let fields = self.assemble(t, y, yp, &mut res);

        let (n_an, n_sep) = (cell.anode.nx(), cell.separator.nx());
        let div_i: Vec<f64> = fields
            .i_el
            .windows(2)
            .enumerate()
            .map(|(k, w)| (w[1] - w[0]) / cell.x_mesh.width(k))
            .collect();

        let mut sum_ip = Vec::with_capacity(cell.x_mesh.len());
        sum_ip.extend(fields.i_ed_an[1..].iter().copied());
        sum_ip.extend(std::iter::repeat_n(0.0, n_sep));
        sum_ip.extend(fields.i_ed_ca[1..].iter().copied());
        for (s, i) in sum_ip.iter_mut().zip(&fields.i_el[1..]) {
            *s += i;
        }

        Diagnostics {
            i_ext: fields.i_ext,
            div_i_an: div_i[..n_an].to_vec(),
            div_i_sep: div_i[n_an..n_an + n_sep].to_vec(),
            div_i_ca: div_i[n_an + n_sep..].to_vec(),
            sdot_an: fields.an.sdot,
            sdot_ca: fields.ca.sdot,
            sum_ip,
            i_el_x: fields.i_el,
        }
    }

    /// Cell-level quantities at `(t, y)`.
    pub fn observables(&self, t: f64, y: &[f64], _yp: &[f64]) -> Observables {
        let battery = &self.cell.battery;
        let ca = &self.cell.cathode;
        let last = ca.nx() - 1;
        let sdot_last = match self.mode {
            ControlMode::Current { .. } => 0.0,
            _ => self.node_reaction(ca, last, y).0,
        };
        let current_a = self.external_current(t, y, sdot_last) * battery.area;
        let voltage_v = y[ca.phis_idx[last]];
        Observables {
            time_s: self.t_offset + t,
            current_a,
            current_c: current_a / battery.cap,
            voltage_v,
            power_w: current_a * voltage_v,
        }
    }

    /// Applied current density [A/m2].
    ///
    /// Prescribed by the profile in current mode. Otherwise recovered from
    /// the charge balance of the last cathode control volume, whose
    /// collector face carries `-i_ext`.
    fn external_current(&self, t: f64, y: &[f64], sdot_last: f64) -> f64 {
        let battery = &self.cell.battery;
        if let Some(i) = self.mode.current_density(t, battery.cap, battery.area) {
            return i;
        }
        let ca = &self.cell.cathode;
        let last = ca.nx() - 1;
        let mut i_ext = ca.a_s * F * sdot_last * ca.x_mesh.width(last);
        if last > 0 {
            let xc = &ca.x_mesh.centers;
            let grad = (y[ca.phis_idx[last]] - y[ca.phis_idx[last - 1]]) / (xc[last] - xc[last - 1]);
            i_ext += ca.sigma_eff() * grad;
        }
        i_ext
    }

    /// Production rate and flux direction at node `ix` of an electrode.
    fn node_reaction(&self, ed: &Electrode, ix: usize, y: &[f64]) -> (f64, f64) {
        let temp = self.cell.battery.temp;
        let x_surf = y[ed.xs_surface(ix)];
        let hyst = ed.hyst_idx.as_ref().map_or(0.0, |h| y[h[ix]]);
        let (eeq, h) = ed.open_circuit(x_surf, hyst, temp);
        let eta = overpotential(y[ed.phis_idx[ix]], y[ed.phie_idx[ix]], eeq, h);
        let fluxdir = -sign(eta);
        let i0 = ed.i0_deg * ed.material.exchange_current(x_surf, y[ed.ce_idx[ix]], temp, fluxdir);
        let sdot = butler_volmer(i0, eta, ed.material.alpha_a(), ed.material.alpha_c(), temp);
        (sdot, fluxdir)
    }

    fn reaction(&self, ed: &Electrode, y: &[f64]) -> Reaction {
        let (sdot, fluxdir) = (0..ed.nx()).map(|ix| self.node_reaction(ed, ix, y)).unzip();
        Reaction { sdot, fluxdir }
    }

    fn assemble(&self, t: f64, y: &[f64], yp: &[f64], res: &mut [f64]) -> Fields {
        let cell = self.cell;
        debug_assert_eq!(y.len(), cell.len());
        debug_assert_eq!(res.len(), cell.len());

        let an = self.reaction(&cell.anode, y);
        let ca = self.reaction(&cell.cathode, y);
        let sdot_last = ca.sdot.last().copied().unwrap_or(0.0);
        let i_ext = self.external_current(t, y, sdot_last);

        self.particle_rows(&cell.anode, &an, y, yp, res);
        self.particle_rows(&cell.cathode, &ca, y, yp, res);
        let i_ed_an = self.solid_rows(&cell.anode, &an, i_ext, y, res);
        let i_ed_ca = self.solid_rows(&cell.cathode, &ca, i_ext, y, res);
        self.hysteresis_rows(&cell.anode, &an, y, yp, res);
        self.hysteresis_rows(&cell.cathode, &ca, y, yp, res);

        let mut sdot_x = Vec::with_capacity(cell.x_mesh.len());
        sdot_x.extend_from_slice(&an.sdot);
        sdot_x.extend(std::iter::repeat_n(0.0, cell.separator.nx()));
        sdot_x.extend_from_slice(&ca.sdot);
        let i_el = self.electrolyte_rows(&sdot_x, y, yp, res);

        let reference = cell.anode.phis_idx[0];
        res[reference] = y[reference];

        let last = cell.cathode.phis_idx[cell.cathode.nx() - 1];
        match &self.mode {
            ControlMode::Current { .. } => {}
            ControlMode::Voltage(v) => res[last] = y[last] - v.value(t),
            ControlMode::Power(p) => {
                res[last] = i_ext * cell.battery.area * y[last] - p.value(t)
            }
        }

        for r in res.iter_mut() {
            if !r.is_finite() {
                *r = INVALID_RESIDUAL;
            }
        }

        Fields {
            i_ext,
            an,
            ca,
            i_ed_an,
            i_ed_ca,
            i_el,
        }
    }

    /// Spherical diffusion with the reaction as the surface flux.
    fn particle_rows(&self, ed: &Electrode, rx: &Reaction, y: &[f64], yp: &[f64], res: &mut [f64]) {
        let temp = self.cell.battery.temp;
        let nr = ed.nr();
        let r = &ed.r_mesh;
        let mut c = vec![0.0; nr];
        let mut ds = vec![0.0; nr];
        let mut flux = vec![0.0; nr + 1];

        for ix in 0..ed.nx() {
            for ir in 0..nr {
                let xs = y[ed.xs_at(ix, ir)];
                c[ir] = ed.li_max * xs;
                ds[ir] = ed.ds_deg * ed.material.diffusivity(xs, temp, rx.fluxdir[ix]);
            }
            for (k, g) in grad_r(&r.centers, &c).iter().enumerate() {
                flux[k + 1] = harmonic_face(ed.r_wt_m[k], ds[k], ed.r_wt_p[k], ds[k + 1]) * g;
            }
            flux[nr] = -rx.sdot[ix];

            let div = div_r(&r.minus, &r.plus, &flux);
            for (ir, d) in div.iter().enumerate() {
                let k = ed.xs_at(ix, ir);
                res[k] = ed.li_max * yp[k] - d;
            }
        }
    }

    /// Solid charge balance. Returns the solid current at every face.
    fn solid_rows(
        &self,
        ed: &Electrode,
        rx: &Reaction,
        i_ext: f64,
        y: &[f64],
        res: &mut [f64],
    ) -> Vec<f64> {
        let nx = ed.nx();
        let phis: Vec<f64> = ed.phis_idx.iter().map(|&k| y[k]).collect();
        let sigma = ed.sigma_eff();

        let mut i_ed = vec![0.0; nx + 1];
        for (k, g) in grad_x(&ed.x_mesh.centers, &phis).iter().enumerate() {
            i_ed[k + 1] = -sigma * g;
        }
        match ed.kind {
            DomainKind::Cathode => i_ed[nx] = -i_ext,
            _ => i_ed[0] = -i_ext,
        }

        let div = div_x(&ed.x_mesh.minus, &ed.x_mesh.plus, &i_ed);
        for (k, d) in div.iter().enumerate() {
            res[ed.phis_idx[k]] = d + ed.a_s * F * rx.sdot[k];
        }
        i_ed
    }

    fn hysteresis_rows(&self, ed: &Electrode, rx: &Reaction, y: &[f64], yp: &[f64], res: &mut [f64]) {
        let (Some(h), Some(idx)) = (&ed.hysteresis, &ed.hyst_idx) else {
            return;
        };
        let cap = self.cell.battery.cap;
        for (ix, &k) in idx.iter().enumerate() {
            let sdot = rx.sdot[ix];
            let rate = (sdot * F * h.g_hyst / 3600.0 / cap).abs();
            res[k] = yp[k] - rate * (sign(sdot) - y[k]);
        }
    }

    /// Electrolyte mass and charge balances across the whole cell. Returns
    /// the electrolyte current at every face.
    fn electrolyte_rows(&self, sdot_x: &[f64], y: &[f64], yp: &[f64], res: &mut [f64]) -> Vec<f64> {
        let cell = self.cell;
        let el = &cell.electrolyte;
        let temp = cell.battery.temp;
        let x = &cell.x_mesh;
        let n = cell.ce_idx.len();

        let ce: Vec<f64> = cell.ce_idx.iter().map(|&k| y[k]).collect();
        let phie: Vec<f64> = cell.phie_idx.iter().map(|&k| y[k]).collect();

        let mut d_eff = Vec::with_capacity(n);
        let mut kappa_eff = Vec::with_capacity(n);
        let mut t0 = Vec::with_capacity(n);
        let mut gamma = Vec::with_capacity(n);
        for (k, &c) in ce.iter().enumerate() {
            d_eff.push(el.diffusivity(c, temp) * cell.brug_x[k]);
            kappa_eff.push(el.conductivity(c, temp) * cell.brug_x[k]);
            t0.push(el.transference(c, temp));
            gamma.push(el.thermodynamic_factor(c, temp));
        }

        // zero flux through both current collectors
        let mut n_flux = vec![0.0; n + 1];
        let mut i_el = vec![0.0; n + 1];
        let mut t0_f = vec![0.0; n + 1];
        t0_f[0] = t0[0];
        t0_f[n] = t0[n - 1];

        let rt_f = R * temp / F;
        for k in 0..n - 1 {
            let dxc = x.centers[k + 1] - x.centers[k];
            let (wm, wp) = (cell.wt_m[k], cell.wt_p[k]);
            let d_f = harmonic_face(wm, d_eff[k], wp, d_eff[k + 1]);
            let kappa_f = harmonic_face(wm, kappa_eff[k], wp, kappa_eff[k + 1]);
            let t0_face = arithmetic_face(wm, t0[k], wp, t0[k + 1]);
            let gamma_f = arithmetic_face(wm, gamma[k], wp, gamma[k + 1]);

            n_flux[k + 1] = d_f * (ce[k + 1] - ce[k]) / dxc;
            i_el[k + 1] = -kappa_f * (phie[k + 1] - phie[k]) / dxc
                - 2.0 * kappa_f * rt_f * (1.0 + gamma_f) * (t0_face - 1.0)
                    * (ce[k + 1].ln() - ce[k].ln())
                    / dxc;
            t0_f[k + 1] = t0_face;
        }

        for k in 0..n {
            let dx = x.width(k);
            let a_sdot = cell.a_s_x[k] * sdot_x[k];
            let migration = (i_el[k + 1] * t0_f[k + 1] - i_el[k] * t0_f[k]) / F;
            let ic = cell.ce_idx[k];
            res[ic] = cell.eps_el_x[k] * yp[ic] - (n_flux[k + 1] - n_flux[k] - migration) / dx - a_sdot;
            res[cell.phie_idx[k]] = (i_el[k + 1] - i_el[k]) / dx - F * a_sdot;
        }
        i_el
    }
}

impl DaeModel for ResidualAssembler<'_> {
    fn len(&self) -> usize {
        self.cell.len()
    }

    fn residual(&self, t: f64, y: &[f64], yp: &[f64], res: &mut [f64]) {
        ResidualAssembler::residual(self, t, y, yp, res);
    }
}
